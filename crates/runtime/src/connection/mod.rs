//! CDP connection layer
//!
//! Correlates commands with responses and fans out events on top of the
//! transport. It handles:
//! - Generating sequential command IDs
//! - Routing commands to flattened target sessions (`sessionId`)
//! - Failing pending commands when the socket goes away
//! - Broadcasting events to every subscriber
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::send`] with method, params and an optional session
//! 2. Connection registers a oneshot callback under a fresh ID
//! 3. The request is queued for the writer task
//! 4. The dispatch loop receives the response and completes the callback
//! 5. Caller receives the result, or an error if the deadline passed first

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use webcast_protocol::{DEFAULT_TIMEOUT_MS, ErrorPayload, Event, Message, Request};

use crate::error::{Error, Result};
use crate::transport::{self, Transport, TransportParts, TransportReceiver};

/// Events buffered per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 1024;

struct Pending {
	method: String,
	tx: oneshot::Sender<Result<Value>>,
}

/// Pending command callbacks keyed by command ID.
type CallbackMap = Arc<Mutex<HashMap<u64, Pending>>>;

/// Removes the callback of a command whose future was dropped before completion.
struct CancelGuard {
	id: u64,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u64, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned callback");
		}
	}
}

/// Future returned by [`Connection::send`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Halves taken by [`Connection::run`].
struct RunParts {
	sender: Box<dyn Transport>,
	receiver: Box<dyn TransportReceiver>,
	message_rx: mpsc::UnboundedReceiver<Value>,
	outbound_rx: mpsc::UnboundedReceiver<Value>,
}

/// CDP connection to a browser.
///
/// One connection carries the browser session and every flattened target
/// session; commands for a page pass that page's `sessionId`.
pub struct Connection {
	last_id: AtomicU64,
	callbacks: CallbackMap,
	outbound_tx: mpsc::UnboundedSender<Value>,
	events: broadcast::Sender<Event>,
	closed: AtomicBool,
	command_timeout: Duration,
	parts: Mutex<Option<RunParts>>,
}

impl Connection {
	/// Create a new Connection with the given transport.
	///
	/// Nothing is read or written until [`Connection::run`] is polled.
	pub fn new(parts: TransportParts) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (events, _) = broadcast::channel(EVENT_CAPACITY);

		Self {
			last_id: AtomicU64::new(1),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			events,
			closed: AtomicBool::new(false),
			command_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
			parts: Mutex::new(Some(RunParts {
				sender,
				receiver,
				message_rx,
				outbound_rx,
			})),
		}
	}

	/// Overrides the per-command deadline (default 30 s).
	pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
		self.command_timeout = timeout;
		self
	}

	/// Wraps the connection in an `Arc` and spawns its dispatch loop.
	pub fn spawn(self) -> Arc<Self> {
		let connection = Arc::new(self);
		let runner = Arc::clone(&connection);
		tokio::spawn(async move { runner.run().await });
		connection
	}

	/// Connects to a DevTools WebSocket URL and starts the dispatch loop.
	pub async fn connect(url: &str) -> Result<Arc<Self>> {
		let parts = transport::connect(url).await?;
		Ok(Self::new(parts).spawn())
	}

	/// Like [`Connection::connect`] over an already-open byte stream.
	pub async fn connect_stream<S>(stream: S, url: &str) -> Result<Arc<Self>>
	where
		S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
	{
		let parts = transport::handshake(stream, url).await?;
		Ok(Self::new(parts).spawn())
	}

	/// Subscribes to every event received from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.events.subscribe()
	}

	/// True once the transport has ended.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Sends a command and awaits its result with the default deadline.
	pub async fn send(&self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value> {
		self.send_with_timeout(method, params, session_id, self.command_timeout)
			.await
	}

	/// Sends a command and awaits its result.
	///
	/// # Errors
	///
	/// - [`Error::Remote`] if the browser rejected the command
	/// - [`Error::Timeout`] if no response arrived within `timeout`
	/// - [`Error::ChannelClosed`] if the connection ended first
	pub async fn send_with_timeout(
		&self,
		method: &str,
		params: Value,
		session_id: Option<&str>,
		timeout: Duration,
	) -> Result<Value> {
		if self.is_closed() {
			return Err(Error::ChannelClosed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		tracing::debug!(id, method, ?session_id, "Sending command");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(
			id,
			Pending {
				method: method.to_string(),
				tx,
			},
		);
		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		// the dispatch loop may have drained callbacks between the check above and the insert
		if self.is_closed() {
			return Err(Error::ChannelClosed);
		}

		let request = Request {
			id,
			method: method.to_string(),
			params,
			session_id: session_id.map(str::to_string),
		};
		if self.outbound_tx.send(serde_json::to_value(&request)?).is_err() {
			tracing::error!("Failed to queue command: outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		match tokio::time::timeout(timeout, ResponseFuture { rx, guard }).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout(format!("{} did not respond within {}ms", method, timeout.as_millis()))),
		}
	}

	/// Run the message dispatch loop
	///
	/// Returns when the transport ends. Every command still waiting at that
	/// point fails with [`Error::ChannelClosed`].
	pub async fn run(self: &Arc<Self>) {
		let parts = self.parts.lock().take();
		let Some(RunParts {
			mut sender,
			receiver,
			mut message_rx,
			mut outbound_rx,
		}) = parts
		else {
			tracing::warn!("Connection::run called twice");
			return;
		};

		let reader_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::debug!("Transport read error: {}", e);
			}
		});

		let writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::error!("Transport write error: {}", e);
					break;
				}
			}
			let _ = sender.close().await;
		});

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(message_value) {
				Ok(message) => {
					if let Err(e) = self.dispatch_internal(message) {
						tracing::warn!("Error dispatching message: {}", e);
					}
				}
				Err(e) => {
					tracing::error!("Failed to parse message: {}", e);
				}
			}
		}

		self.closed.store(true, Ordering::SeqCst);
		let orphaned = std::mem::take(&mut *self.callbacks.lock());
		if !orphaned.is_empty() {
			tracing::debug!(count = orphaned.len(), "Failing pending commands: connection closed");
		}
		drop(orphaned);

		let _ = reader_handle.await;
		writer_handle.abort();
	}

	/// Dispatch an incoming message (test-only public version)
	#[cfg(test)]
	pub(crate) fn dispatch(&self, message: Message) -> Result<()> {
		self.dispatch_internal(message)
	}

	fn dispatch_internal(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => {
				let pending = self.callbacks.lock().remove(&response.id).ok_or_else(|| {
					Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id))
				})?;

				let result = match response.error {
					Some(error) => Err(parse_protocol_error(pending.method, error)),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = pending.tx.send(result);
				Ok(())
			}
			Message::Event(event) => {
				tracing::trace!(method = %event.method, session_id = ?event.session_id, "Event");
				// no subscribers is fine
				let _ = self.events.send(event);
				Ok(())
			}
			Message::Unknown(value) => {
				tracing::debug!("Unknown message type (ignored): {}", value);
				Ok(())
			}
		}
	}
}

/// Converts a CDP [`ErrorPayload`] into [`Error::Remote`].
fn parse_protocol_error(method: String, error: ErrorPayload) -> Error {
	Error::Remote {
		method,
		code: error.code,
		message: error.message,
		data: error.data,
	}
}
