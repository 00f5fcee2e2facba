//! CDP JSON-RPC message envelopes.
//!
//! Every frame on the DevTools WebSocket is one of three shapes:
//!
//! - a **request** sent by us: `{ id, method, params, sessionId? }`
//! - a **response** to a request: `{ id, result? | error?, sessionId? }`
//! - an **event** pushed by the browser: `{ method, params, sessionId? }`
//!
//! `sessionId` is present when talking to a target attached in flattened
//! mode (`Target.attachToTarget { flatten: true }`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing CDP command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	/// Unique request ID for correlating responses.
	pub id: u64,
	/// Fully qualified method name, e.g. `Page.navigate`.
	pub method: String,
	/// Method parameters as a JSON object.
	pub params: Value,
	/// Target session the command is routed to (flattened mode).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Response to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	/// Request ID this response correlates to.
	pub id: u64,
	/// Success result (mutually exclusive with `error`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with `result`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Error object carried by a failed [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// JSON-RPC error code (e.g. `-32000` for generic server errors).
	pub code: i64,
	/// Human-readable message.
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}

/// Event pushed by the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	/// Event name, e.g. `Network.requestWillBeSent`.
	pub method: String,
	#[serde(default)]
	pub params: Value,
	/// Target session that emitted the event, absent for browser-level events.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

impl Event {
	/// Returns true if the event belongs to the given session.
	pub fn is_for(&self, session_id: Option<&str>) -> bool {
		self.session_id.as_deref() == session_id
	}
}

/// Discriminated union of incoming messages.
///
/// Order matters: a frame with an `id` is a response, anything with a
/// `method` and no `id` is an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Response message (has `id` field)
	Response(Response),
	/// Event message (no `id` field)
	Event(Event),
	/// Unknown message type (forward-compatible catch-all)
	Unknown(Value),
}
