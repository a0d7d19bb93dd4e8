//! Fakes and a throwaway HTTP server shared by the unit tests.

use crate::api::TextGenerator;
use crate::error::GenerationError;
use crate::models::{ChatMessage, SearchResult};
use crate::search::SearchProvider;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    /// Content of the last message of the request.
    pub prompt: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub at: Instant,
}

/// A [`TextGenerator`] answering from a script.
///
/// Queued responses are consumed first, then the first rule whose needle
/// occurs in the prompt, then the default.
pub(crate) struct ScriptedGenerator {
    queued: Mutex<VecDeque<Result<String, GenerationError>>>,
    rules: Vec<(String, Result<String, GenerationError>)>,
    default: Result<String, GenerationError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self::with_default(Ok(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_default(Err(transport_error()))
    }

    fn with_default(default: Result<String, GenerationError>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            default,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rule(mut self, needle: &str, response: Result<String, GenerationError>) -> Self {
        self.rules.push((needle.to_string(), response));
        self
    }

    pub fn queue(self, responses: Vec<Result<String, GenerationError>>) -> Self {
        self.queued.lock().unwrap().extend(responses);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }
}

impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, GenerationError> {
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.clone(),
            max_tokens,
            timeout,
            at: Instant::now(),
        });
        // Yield so concurrent callers genuinely interleave.
        tokio::task::yield_now().await;

        if let Some(next) = self.queued.lock().unwrap().pop_front() {
            return next;
        }
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

pub(crate) fn transport_error() -> GenerationError {
    GenerationError::Transport("connection reset".to_string())
}

/// A [`SearchProvider`] returning the same hits for every query.
pub(crate) struct FixedSearch {
    results: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
}

impl FixedSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl SearchProvider for FixedSearch {
    async fn search(&self, query: &str, max_results: u32) -> Vec<SearchResult> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect()
    }
}

pub(crate) fn search_hit(title: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        snippet: format!("Snippet about {title}"),
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve exactly one HTTP response on a random local port.
///
/// Returns the base URL (`http://127.0.0.1:PORT`) and a receiver yielding the
/// raw request once it has been answered.
pub(crate) async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(request);
    });
    (format!("http://{addr}"), rx)
}
