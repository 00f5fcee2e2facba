//! Error types for the webcast runtime.

use thiserror::Error;

/// Result type alias for runtime and driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum Error {
	/// No Chromium-family executable could be located.
	#[error("Browser executable not found. Install Chrome or Chromium, or set WEBCAST_CHROME_PATH.")]
	BrowserNotFound,

	/// Failed to launch the browser process.
	#[error("Failed to launch browser: {0}")]
	LaunchFailed(String),

	/// Failed to establish the DevTools connection.
	#[error("Failed to connect to DevTools at {url}: {reason}")]
	ConnectionFailed { url: String, reason: String },

	/// Transport-level error (WebSocket framing, socket I/O).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Protocol-level error (unexpected message shape, missing fields).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Error returned by the browser for a command.
	#[error("{method} failed ({code}): {message}")]
	Remote {
		/// Method that failed
		method: String,
		/// JSON-RPC error code
		code: i64,
		/// Human-readable error message
		message: String,
		/// Extra detail supplied by the browser (if any)
		data: Option<String>,
	},

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// A command or internal wait ran out of time.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// No element matched the selector.
	#[error("element not found: {0}")]
	ElementNotFound(String),

	/// The element exists but has no render box.
	#[error("element not visible: {0}")]
	ElementNotVisible(String),

	/// A selector did not appear before the deadline.
	#[error("timeout of {timeout_ms}ms exceeded waiting for selector '{selector}'")]
	TimeoutExceeded { selector: String, timeout_ms: u64 },

	/// Navigation was rejected by the browser.
	#[error("navigation to '{url}' failed: {reason}")]
	NavigationFailed { url: String, reason: String },

	/// Page-side JavaScript threw.
	#[error("JavaScript exception: {0}")]
	JsException(String),

	/// Screen recorder failure (encoder spawn, pipe, exit status).
	#[error("Recorder error: {0}")]
	Recorder(String),

	/// The session was already closed.
	#[error("Session closed: cannot {0} after close()")]
	SessionClosed(&'static str),

	/// Connection dropped while a request was pending.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Invalid argument provided to a method.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}

impl Error {
	/// Returns true if this is a timeout of any kind.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_) | Error::TimeoutExceeded { .. })
	}

	/// Returns true if the error means "no such element".
	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::ElementNotFound(_))
	}

	/// Returns true if the browser side of the session is gone.
	pub fn is_disconnected(&self) -> bool {
		matches!(self, Error::ChannelClosed | Error::SessionClosed(_))
	}

	/// Returns the browser error code if this is a [`Error::Remote`].
	pub fn remote_code(&self) -> Option<i64> {
		match self {
			Error::Remote { code, .. } => Some(*code),
			_ => None,
		}
	}
}
