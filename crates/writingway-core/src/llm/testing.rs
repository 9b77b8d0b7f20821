//! Test doubles for the transport layer
//!
//! Lets provider, registry, aggregator and worker tests run without a
//! network while still counting every request that would have gone out.

use super::transport::{HttpRequest, HttpResponse, HttpTransport, LineReader, TransportFactory};
use crate::error::{extract_error_message, LlmError, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Canned answer to one request
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json { status: u16, body: Value },
    Lines { lines: Vec<String>, delay: Duration },
    Error(LlmError),
}

impl Reply {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Reply::Json { status, body }
    }

    pub(crate) fn lines(lines: Vec<String>) -> Self {
        Reply::Lines {
            lines,
            delay: Duration::ZERO,
        }
    }

    /// Stream reply that waits `delay` before each line
    pub(crate) fn slow_lines(lines: Vec<String>, delay: Duration) -> Self {
        Reply::Lines { lines, delay }
    }

    pub(crate) fn error(err: LlmError) -> Self {
        Reply::Error(err)
    }
}

type Handler = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

/// Transport answering from a handler and counting requests
pub(crate) struct MockTransport {
    handler: Handler,
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answer 200 with `body`
    pub(crate) fn ok_json(body: Value) -> Arc<Self> {
        Self::new(move |_| Reply::json(200, body.clone()))
    }

    /// Answer with `replies` in order; connection errors once exhausted
    pub(crate) fn sequence(replies: Vec<Reply>) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |_| {
            queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Reply::error(LlmError::Connection("no reply queued".into())))
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    fn answer(&self, request: &HttpRequest) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        (self.handler)(request)
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        match self.answer(request) {
            Reply::Json { status, body } => Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
            Reply::Lines { lines, .. } => Ok(HttpResponse {
                status: 200,
                body: lines.join("\n"),
            }),
            Reply::Error(err) => Err(err),
        }
    }

    fn send_streaming(&self, request: &HttpRequest) -> Result<LineReader> {
        match self.answer(request) {
            Reply::Json { status, body } if !(200..300).contains(&status) => Err(LlmError::Api {
                status,
                message: extract_error_message(&body.to_string()),
            }),
            Reply::Json { body, .. } => Ok(Box::new(BufReader::new(DelayedLines::new(
                vec![body.to_string()],
                Duration::ZERO,
            )))),
            Reply::Lines { lines, delay } => {
                Ok(Box::new(BufReader::new(DelayedLines::new(lines, delay))))
            }
            Reply::Error(err) => Err(err),
        }
    }
}

/// Factory handing out one shared mock transport
pub(crate) struct MockTransportFactory {
    transport: Arc<MockTransport>,
    builds: AtomicUsize,
}

impl MockTransportFactory {
    pub(crate) fn new(transport: Arc<MockTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            builds: AtomicUsize::new(0),
        })
    }

    /// Number of clients constructed through this factory
    pub(crate) fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl TransportFactory for MockTransportFactory {
    fn build(&self, _timeout: Duration) -> Arc<dyn HttpTransport> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.transport.clone()
    }
}

/// Body that releases one line per read, sleeping before each
struct DelayedLines {
    lines: VecDeque<String>,
    pending: Vec<u8>,
    delay: Duration,
}

impl DelayedLines {
    fn new(lines: Vec<String>, delay: Duration) -> Self {
        Self {
            lines: lines.into(),
            pending: Vec::new(),
            delay,
        }
    }
}

impl Read for DelayedLines {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pending.is_empty() {
            let Some(line) = self.lines.pop_front() else {
                return Ok(0);
            };
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.pending = format!("{}\n", line).into_bytes();
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// OpenAI-style SSE line carrying one text delta
pub(crate) fn sse_chunk(text: &str) -> String {
    format!(
        "data: {}",
        json!({"choices": [{"delta": {"content": text}, "finish_reason": null}]})
    )
}

/// OpenAI-style SSE stream of `chunks` followed by `[DONE]`
pub(crate) fn sse_stream(chunks: &[&str]) -> Vec<String> {
    chunks
        .iter()
        .map(|chunk| sse_chunk(chunk))
        .chain(std::iter::once("data: [DONE]".to_string()))
        .collect()
}
