//! Test doubles: an in-memory `GenerationApi` for the submission step and
//! polling loop, and a localhost HTTP stub for the transport.

use async_trait::async_trait;
use clawdvine_types::{GenerationRequest, TaskSnapshot, TaskStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::api::{CreateOutcome, GenerationApi};
use crate::error::GenerateError;

pub fn snapshot(status: &str) -> TaskSnapshot {
    TaskSnapshot::with_status(TaskStatus::from(status.to_string()))
}

/// Answers `create` with a fixed outcome and `status` from a script.
///
/// Once the script runs dry, `status` fails like a dropped connection.
pub struct ScriptedApi {
    create: CreateOutcome,
    script: Mutex<VecDeque<TaskSnapshot>>,
    created: Mutex<Vec<GenerationRequest>>,
    polled: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new(create: CreateOutcome, script: Vec<TaskSnapshot>) -> Self {
        Self {
            create,
            script: Mutex::new(script.into()),
            created: Mutex::new(Vec::new()),
            polled: Mutex::new(Vec::new()),
        }
    }

    /// `202` with the given task id
    pub fn accepting(task_id: &str, script: Vec<TaskSnapshot>) -> Self {
        Self::new(
            CreateOutcome {
                status: 202,
                body: serde_json::json!({ "taskId": task_id }).to_string(),
            },
            script,
        )
    }

    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn created_requests(&self) -> Vec<GenerationRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.polled.lock().unwrap().len()
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationApi for ScriptedApi {
    async fn create(&self, request: &GenerationRequest) -> Result<CreateOutcome, GenerateError> {
        self.created.lock().unwrap().push(request.clone());
        Ok(self.create.clone())
    }

    async fn status(&self, task_id: &str) -> Result<TaskSnapshot, GenerateError> {
        self.polled.lock().unwrap().push(task_id.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerateError::Http("connection reset".to_string()))
    }
}

/// A request captured by [`HttpStub`]; header names are lowercased
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// One canned HTTP answer
pub struct StubReply {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl StubReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self { status, headers: Vec::new(), body: body.to_string() }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self { status, headers: Vec::new(), body: body.to_string() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Minimal HTTP/1.1 server on localhost answering each connection with the
/// next scripted reply, then closing it.
pub struct HttpStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl HttpStub {
    pub async fn start(replies: Vec<StubReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            for reply in replies {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let mut stream = BufReader::new(stream);
                let request = read_request(&mut stream).await;
                recorded.lock().unwrap().push(request);
                let _ = stream.get_mut().write_all(render_reply(&reply).as_bytes()).await;
                let _ = stream.get_mut().shutdown().await;
            }
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut BufReader<TcpStream>) -> RecordedRequest {
    let mut request_line = String::new();
    stream.read_line(&mut request_line).await.unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        stream.read_line(&mut line).await.unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await.unwrap();

    RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8(body).unwrap(),
    }
}

fn render_reply(reply: &StubReply) -> String {
    let mut out = format!(
        "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out.push_str(&reply.body);
    out
}
