//! In-memory collaborators and a mock HTTP backend for tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::logs::{LogError, LogSink};
use crate::monitoring::checker::Prober;
use crate::monitoring::types::{Check, CheckMethod, CheckState, ProbeOutcome, Protocol};
use crate::notify::{Notifier, NotifyError};
use crate::storage::{Category, RecordStore, StoreError};

/// Raw record for a never-evaluated `GET https://example.com/health` check
pub fn test_record(id: &str) -> Value {
    json!({
        "id": id,
        "userPhone": "5551234567",
        "protocol": "https",
        "url": "example.com/health",
        "method": "get",
        "successCodes": [200],
        "timeoutSeconds": 2,
        "state": "down"
    })
}

/// The validated form of [`test_record`]
pub fn test_check(id: &str) -> Check {
    Check {
        id: id.to_string(),
        user_phone: "5551234567".to_string(),
        protocol: Protocol::Https,
        url: "example.com/health".to_string(),
        method: CheckMethod::Get,
        success_codes: vec![json!(200)],
        timeout_seconds: 2,
        state: CheckState::Down,
        last_checked: None,
        extra: Map::new(),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(Category, String), Value>>,
    fail_updates: AtomicBool,
    fail_lists: AtomicBool,
}

impl MemoryStore {
    pub fn insert(&self, category: Category, id: &str, record: Value) {
        self.records.lock().unwrap().insert((category, id.to_string()), record);
    }

    pub fn get(&self, category: Category, id: &str) -> Option<Value> {
        self.records.lock().unwrap().get(&(category, id.to_string())).cloned()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, category: Category) -> Result<Vec<String>, StoreError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("list failed")));
        }
        let mut ids: Vec<String> = self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, category: Category, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get(category, id))
    }

    async fn update(&self, category: Category, id: &str, record: &Value) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&(category, id.to_string())) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound { category, id: id.to_string() }),
        }
    }

    async fn create(&self, category: Category, id: &str, record: &Value) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let key = (category, id.to_string());
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists { category, id: id.to_string() });
        }
        records.insert(key, record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLogSink {
    live: Mutex<HashMap<String, Vec<String>>>,
    archives: Mutex<HashMap<String, String>>,
    fail_compress: AtomicBool,
}

impl MemoryLogSink {
    pub fn lines(&self, log_id: &str) -> Vec<String> {
        self.live.lock().unwrap().get(log_id).cloned().unwrap_or_default()
    }

    pub fn fail_compress(&self, fail: bool) {
        self.fail_compress.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogError> {
        self.live.lock().unwrap().entry(log_id.to_string()).or_default().push(line.to_string());
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogError> {
        let mut ids: Vec<String> = self.live.lock().unwrap().keys().cloned().collect();
        if include_archived {
            ids.extend(self.archives.lock().unwrap().keys().cloned());
        }
        ids.sort();
        Ok(ids)
    }

    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogError> {
        if self.fail_compress.load(Ordering::SeqCst) {
            return Err(LogError::Io(std::io::Error::other("compression failed")));
        }
        let content = self
            .live
            .lock()
            .unwrap()
            .get(log_id)
            .map(|lines| lines.iter().map(|line| format!("{line}\n")).collect::<String>())
            .ok_or_else(|| LogError::NotFound(log_id.to_string()))?;
        self.archives.lock().unwrap().insert(archive_id.to_string(), content);
        Ok(())
    }

    async fn decompress(&self, archive_id: &str) -> Result<String, LogError> {
        self.archives
            .lock()
            .unwrap()
            .get(archive_id)
            .cloned()
            .ok_or_else(|| LogError::NotFound(archive_id.to_string()))
    }

    async fn truncate(&self, log_id: &str) -> Result<(), LogError> {
        match self.live.lock().unwrap().get_mut(log_id) {
            Some(lines) => {
                lines.clear();
                Ok(())
            }
            None => Err(LogError::NotFound(log_id.to_string())),
        }
    }

    async fn compact(&self, log_id: &str, archive_id: &str) -> Result<(), LogError> {
        if self.fail_compress.load(Ordering::SeqCst) {
            return Err(LogError::Io(std::io::Error::other("compression failed")));
        }
        let mut live = self.live.lock().unwrap();
        let lines = live.get_mut(log_id).ok_or_else(|| LogError::NotFound(log_id.to_string()))?;
        let content = lines.drain(..).map(|line| format!("{line}\n")).collect::<String>();
        self.archives.lock().unwrap().insert(archive_id.to_string(), content);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    fail_sends: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user_phone: &str, message: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected { status: 500, body: "unavailable".into() });
        }
        self.sent.lock().unwrap().push((user_phone.to_string(), message.to_string()));
        Ok(())
    }
}

/// Prober returning preset outcomes per check id, optionally after a delay
#[derive(Default)]
pub struct ScriptedProber {
    outcomes: Mutex<HashMap<String, (ProbeOutcome, Duration)>>,
    probed: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn respond(&self, id: &str, outcome: ProbeOutcome) {
        self.respond_after(id, outcome, Duration::ZERO);
    }

    pub fn respond_after(&self, id: &str, outcome: ProbeOutcome, delay: Duration) {
        self.outcomes.lock().unwrap().insert(id.to_string(), (outcome, delay));
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, check: &Check) -> ProbeOutcome {
        self.probed.lock().unwrap().push(check.id.clone());
        let scripted = self.outcomes.lock().unwrap().get(&check.id).cloned();
        match scripted {
            Some((outcome, delay)) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            None => ProbeOutcome::network_error("no scripted outcome"),
        }
    }
}

/// Local HTTP/1.1 server answering every request with a fixed status, or
/// accepting connections and never answering
pub struct MockBackend {
    addr: SocketAddr,
    status: Arc<AtomicU16>,
    requests: Arc<tokio::sync::Mutex<Vec<String>>>,
}

impl MockBackend {
    pub async fn responding(status: u16) -> Self {
        Self::spawn(Some(status)).await
    }

    pub async fn hanging() -> Self {
        Self::spawn(None).await
    }

    /// An address nothing is listening on
    pub async fn unused_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub async fn last_request(&self) -> Option<String> {
        self.requests.lock().await.last().cloned()
    }

    pub async fn last_request_line(&self) -> Option<String> {
        self.last_request().await.and_then(|request| request.lines().next().map(str::to_string))
    }

    async fn spawn(status: Option<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let respond = status.is_some();
        let status = Arc::new(AtomicU16::new(status.unwrap_or(0)));
        let requests = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let task_status = Arc::clone(&status);
        let task_requests = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let status = Arc::clone(&task_status);
                let requests = Arc::clone(&task_requests);

                tokio::spawn(async move {
                    if !respond {
                        // Hold the connection open without ever answering
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        return;
                    }

                    let request = read_request(&mut socket).await;
                    requests.lock().await.push(request);

                    let status = status.load(Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 {status} Mock\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, status, requests }
    }
}

/// Read one request: headers, then `Content-Length` bytes of body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let Ok(n) = socket.read(&mut buf).await else { break };
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}
