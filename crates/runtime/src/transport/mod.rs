//! WebSocket transport for the DevTools protocol
//!
//! Chromium exposes CDP as JSON text frames over a WebSocket. The transport
//! is split in two halves so the connection can write from one task while a
//! reader task forwards parsed frames into an mpsc channel:
//!
//! - [`Transport`]: sends one JSON value per text frame
//! - [`TransportReceiver`]: reads frames until the socket closes
//!
//! Any `AsyncRead + AsyncWrite` stream works, which lets tests run the
//! protocol over `tokio::io::duplex`.

use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

/// CDP frames (screencast JPEGs in particular) exceed tungstenite's defaults.
const MAX_MESSAGE_SIZE: usize = 256 << 20;

/// Outbound half of a transport.
pub trait Transport: Send {
	/// Serializes `message` and writes it as a single text frame.
	fn send(&mut self, message: Value) -> BoxFuture<'_, Result<()>>;

	/// Sends a close frame.
	fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Inbound half of a transport.
pub trait TransportReceiver: Send {
	/// Reads frames until the peer closes, forwarding each JSON value.
	///
	/// Returns `Ok(())` on a clean close and when the consumer went away.
	fn run(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

/// Both halves plus the channel the receiver feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

struct WebSocketSender<S> {
	sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

struct WebSocketReceiver<S> {
	stream: SplitStream<WebSocketStream<S>>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<S> Transport for WebSocketSender<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn send(&mut self, message: Value) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink
				.send(WsMessage::Text(text))
				.await
				.map_err(|e| Error::TransportError(format!("Failed to write frame: {}", e)))
		})
	}

	fn close(&mut self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			self.sink
				.close()
				.await
				.map_err(|e| Error::TransportError(format!("Failed to close socket: {}", e)))
		})
	}
}

impl<S> TransportReceiver for WebSocketReceiver<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		let WebSocketReceiver { mut stream, message_tx } = *self;
		Box::pin(async move {
			while let Some(frame) = stream.next().await {
				let frame = frame.map_err(|e| Error::TransportError(format!("Failed to read frame: {}", e)))?;
				let text = match frame {
					WsMessage::Text(text) => text,
					WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
						Ok(text) => text,
						Err(_) => {
							tracing::debug!("Skipping non-UTF-8 binary frame");
							continue;
						}
					},
					WsMessage::Close(frame) => {
						tracing::debug!(?frame, "DevTools socket closed by peer");
						break;
					}
					_ => continue,
				};

				let value: Value = match serde_json::from_str(&text) {
					Ok(value) => value,
					Err(e) => {
						tracing::warn!(error = %e, "Dropping frame that is not JSON");
						continue;
					}
				};

				if message_tx.send(value).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}

/// Splits an established WebSocket into transport parts.
pub fn from_websocket<S>(socket: WebSocketStream<S>) -> TransportParts
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	let (sink, stream) = socket.split();
	let (message_tx, message_rx) = mpsc::unbounded_channel();
	TransportParts {
		sender: Box::new(WebSocketSender { sink }),
		receiver: Box::new(WebSocketReceiver { stream, message_tx }),
		message_rx,
	}
}

fn websocket_config() -> WebSocketConfig {
	let mut config = WebSocketConfig::default();
	config.max_message_size = Some(MAX_MESSAGE_SIZE);
	config.max_frame_size = Some(MAX_MESSAGE_SIZE);
	config
}

/// Opens a WebSocket to a DevTools endpoint such as
/// `ws://127.0.0.1:9222/devtools/browser/<id>`.
pub async fn connect(url: &str) -> Result<TransportParts> {
	let (socket, _) = tokio_tungstenite::connect_async_with_config(url, Some(websocket_config()), false)
		.await
		.map_err(|e| Error::ConnectionFailed {
			url: url.to_string(),
			reason: e.to_string(),
		})?;
	tracing::debug!(url, "DevTools socket connected");
	Ok(from_websocket(socket))
}

/// Performs the client handshake over an existing byte stream.
pub async fn handshake<S>(stream: S, url: &str) -> Result<TransportParts>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	let (socket, _) = tokio_tungstenite::client_async_with_config(url, stream, Some(websocket_config()))
		.await
		.map_err(|e| Error::ConnectionFailed {
			url: url.to_string(),
			reason: e.to_string(),
		})?;
	Ok(from_websocket(socket))
}
