//! Background streaming worker
//!
//! Runs one streaming prompt on a dedicated thread and relays fragments to
//! the caller as [`WorkerEvent`]s over a crossbeam channel, so an event loop
//! never blocks on network reads.

use super::aggregator::LlmAggregator;
use super::message::ChatMessage;
use super::provider::Overrides;
use super::stream::CancelHandle;
use crate::error::{LlmError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Data event sent in place of an authentication failure
pub const AUTH_ERROR_MESSAGE: &str = "Authentication Error: Invalid API key or JWT token";

const AUTH_MARKERS: [&str; 4] = [
    "invalid jwt",
    "token-invalid",
    "authentication error",
    "signed-out",
];

const TOKEN_LIMIT_MARKERS: [&str; 4] = [
    "too many tokens",
    "exceeds token limit",
    "max tokens",
    "context length",
];

/// Events emitted by a [`StreamingWorker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A text fragment, or a human-readable error message
    Data(String),
    /// The request exceeded the model's token limit
    TokenLimitExceeded(String),
    /// Always the last event, whether or not an error preceded it
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
    Finished,
}

/// Classification of an in-band error reported as stream content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InBandError {
    Authentication,
    TokenLimit,
}

/// Look for an auth or token-limit failure embedded in a chunk's text.
pub fn sniff_in_band_error(text: &str) -> Option<InBandError> {
    let lower = text.to_lowercase();
    if AUTH_MARKERS.iter().any(|marker| lower.contains(marker)) {
        Some(InBandError::Authentication)
    } else if TOKEN_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        Some(InBandError::TokenLimit)
    } else {
        None
    }
}

/// Map a stream error to the event the caller sees.
///
/// Only typed failures are classified; the text markers apply to the first
/// chunk of content, never to error messages.
fn error_event(err: &LlmError) -> WorkerEvent {
    if err.is_auth_failure() {
        WorkerEvent::Data(AUTH_ERROR_MESSAGE.to_string())
    } else if err.is_token_limit() {
        WorkerEvent::TokenLimitExceeded(err.to_string())
    } else {
        WorkerEvent::Data(format!("Error: {}", err))
    }
}

/// Everything the worker thread needs, moved onto it at start
struct Job {
    aggregator: Arc<LlmAggregator>,
    prompt: String,
    overrides: Overrides,
    history: Option<Vec<ChatMessage>>,
    keep_running: Arc<AtomicBool>,
    cancel: Arc<Mutex<Option<CancelHandle>>>,
    state: Arc<Mutex<WorkerState>>,
    events: Sender<WorkerEvent>,
}

impl Job {
    fn run(self) {
        self.relay();

        {
            let mut state = self.state.lock();
            if *state == WorkerState::Running {
                *state = WorkerState::Finished;
            }
        }
        let _ = self.events.send(WorkerEvent::Finished);
        debug!("Worker thread exiting");
    }

    fn relay(&self) {
        let stream = match self.aggregator.stream_prompt(
            &self.prompt,
            &self.overrides,
            self.history.as_deref(),
        ) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "Stream setup failed");
                let _ = self.events.send(error_event(&err));
                return;
            }
        };

        let cancel = stream.cancel_handle();
        *self.cancel.lock() = Some(cancel.clone());
        if !self.keep_running.load(Ordering::SeqCst) {
            // stop() ran before the handle was published
            cancel.cancel();
        }

        let mut first = true;
        for item in stream {
            if !self.keep_running.load(Ordering::SeqCst) {
                break;
            }
            match item {
                Ok(chunk) => {
                    if first {
                        first = false;
                        match sniff_in_band_error(&chunk) {
                            Some(InBandError::Authentication) => {
                                warn!("Authentication failure reported in stream");
                                let event = WorkerEvent::Data(AUTH_ERROR_MESSAGE.to_string());
                                let _ = self.events.send(event);
                                break;
                            }
                            Some(InBandError::TokenLimit) => {
                                warn!("Token limit exceeded");
                                let event = WorkerEvent::TokenLimitExceeded(chunk);
                                let _ = self.events.send(event);
                                break;
                            }
                            None => {}
                        }
                    }
                    if self.events.send(WorkerEvent::Data(chunk)).is_err() {
                        // Receiver gone; nobody is listening
                        cancel.cancel();
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Stream failed");
                    let _ = self.events.send(error_event(&err));
                    break;
                }
            }
        }
    }
}

/// Runs one streaming prompt on a background thread.
///
/// `start` and `stop` take `&self`, so a worker shared through an `Arc` can
/// be stopped from a thread other than the one that started it.
pub struct StreamingWorker {
    aggregator: Arc<LlmAggregator>,
    prompt: String,
    overrides: Overrides,
    history: Option<Vec<ChatMessage>>,
    keep_running: Arc<AtomicBool>,
    cancel: Arc<Mutex<Option<CancelHandle>>>,
    state: Arc<Mutex<WorkerState>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl StreamingWorker {
    pub fn new(
        aggregator: Arc<LlmAggregator>,
        prompt: impl Into<String>,
        overrides: Overrides,
        history: Option<Vec<ChatMessage>>,
    ) -> Self {
        Self {
            aggregator,
            prompt: prompt.into(),
            overrides,
            history,
            keep_running: Arc::new(AtomicBool::new(true)),
            cancel: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(WorkerState::Idle)),
            handle: Mutex::new(None),
        }
    }

    /// Launch the worker thread. Events arrive on the returned receiver,
    /// ending with [`WorkerEvent::Finished`].
    pub fn start(&self) -> Result<Receiver<WorkerEvent>> {
        {
            let mut state = self.state.lock();
            if *state != WorkerState::Idle {
                return Err(LlmError::Stream("worker already started".into()));
            }
            *state = WorkerState::Running;
        }

        let (tx, rx) = unbounded();
        let job = Job {
            aggregator: Arc::clone(&self.aggregator),
            prompt: self.prompt.clone(),
            overrides: self.overrides.clone(),
            history: self.history.clone(),
            keep_running: Arc::clone(&self.keep_running),
            cancel: Arc::clone(&self.cancel),
            state: Arc::clone(&self.state),
            events: tx,
        };

        let handle = thread::Builder::new()
            .name("llm-worker".into())
            .spawn(move || job.run())
            .map_err(|e| {
                *self.state.lock() = WorkerState::Idle;
                LlmError::Stream(format!("failed to spawn worker thread: {}", e))
            })?;

        debug!("Worker started");
        *self.handle.lock() = Some(handle);
        Ok(rx)
    }

    /// Signal cancellation and block until the worker thread has exited.
    ///
    /// Safe to call from any thread, and more than once.
    pub fn stop(&self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(cancel) = self.cancel.lock().as_ref() {
            cancel.cancel();
        }
        {
            let mut state = self.state.lock();
            if *state == WorkerState::Running {
                *state = WorkerState::Stopped;
            }
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Worker thread panicked");
            }
            debug!("Worker stopped");
        }
    }

    /// Whether the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }
}

impl Drop for StreamingWorker {
    fn drop(&mut self) {
        if self.handle.get_mut().is_some() {
            self.stop();
        }
    }
}
