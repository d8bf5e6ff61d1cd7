//! Minimal HTTP/1.1 stub server for exercising the REST clients in tests.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A request received by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  /// Path plus query string.
  pub target: String,
  pub headers: Vec<(String, String)>,
  pub body: String,
}

impl RecordedRequest {
  pub fn path(&self) -> &str {
    self.target.split('?').next().unwrap_or("")
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

pub struct StubResponse {
  pub status: u16,
  pub body: String,
  pub headers: Vec<(String, String)>,
}

impl StubResponse {
  pub fn json(status: u16, body: impl Into<String>) -> Self {
    Self {
      status,
      body: body.into(),
      headers: Vec::new(),
    }
  }

  pub fn empty(status: u16) -> Self {
    Self::json(status, "")
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }
}

type Handler = dyn Fn(&RecordedRequest) -> StubResponse + Send + Sync;

pub struct StubServer {
  pub base_url: String,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
  task: JoinHandle<()>,
}

impl StubServer {
  pub async fn start<F>(handler: F) -> Self
  where
    F: Fn(&RecordedRequest) -> StubResponse + Send + Sync + 'static,
  {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let handler: Arc<Handler> = Arc::new(handler);

    let recorded = requests.clone();
    let task = tokio::spawn(async move {
      while let Ok((stream, _)) = listener.accept().await {
        let recorded = recorded.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
          serve(stream, recorded, handler).await;
        });
      }
    });

    Self {
      base_url: format!("http://{}", addr),
      requests,
      task,
    }
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().clone()
  }
}

impl Drop for StubServer {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn serve(
  mut stream: TcpStream,
  recorded: Arc<Mutex<Vec<RecordedRequest>>>,
  handler: Arc<Handler>,
) {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 4096];
  let head_end = loop {
    if let Some(pos) = find_head_end(&buf) {
      break pos;
    }
    match stream.read(&mut chunk).await {
      Ok(0) | Err(_) => return,
      Ok(n) => buf.extend_from_slice(&chunk[..n]),
    }
  };

  let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
  let mut lines = head.split("\r\n");
  let mut request_line = lines.next().unwrap_or("").split_whitespace();
  let method = request_line.next().unwrap_or("").to_string();
  let target = request_line.next().unwrap_or("").to_string();
  let headers: Vec<(String, String)> = lines
    .filter_map(|line| line.split_once(':'))
    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
    .collect();

  let content_length = headers
    .iter()
    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
    .and_then(|(_, v)| v.parse::<usize>().ok())
    .unwrap_or(0);
  let mut body = buf[head_end + 4..].to_vec();
  while body.len() < content_length {
    match stream.read(&mut chunk).await {
      Ok(0) | Err(_) => break,
      Ok(n) => body.extend_from_slice(&chunk[..n]),
    }
  }

  let request = RecordedRequest {
    method,
    target,
    headers,
    body: String::from_utf8_lossy(&body).to_string(),
  };
  let response = handler(&request);
  recorded.lock().push(request);

  let mut out = format!(
    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
    response.status,
    response.body.len()
  );
  for (name, value) in &response.headers {
    out.push_str(&format!("{}: {}\r\n", name, value));
  }
  out.push_str("\r\n");
  out.push_str(&response.body);

  let _ = stream.write_all(out.as_bytes()).await;
  let _ = stream.shutdown().await;
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
  buf.windows(4).position(|w| w == b"\r\n\r\n")
}
