//! Launched browser and its page targets.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use webcast_protocol::LaunchOptions;
use webcast_runtime::{BrowserProcess, Connection, Error, Result};

use crate::page::Page;

/// Deadline for the `Browser.close` courtesy command.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A Chromium instance driven over one DevTools connection.
pub struct Browser {
	process: Option<BrowserProcess>,
	connection: Arc<Connection>,
}

impl Browser {
	/// Launches a browser and connects to its DevTools endpoint.
	///
	/// # Errors
	///
	/// Propagates [`Error::BrowserNotFound`], [`Error::LaunchFailed`] and
	/// [`Error::ConnectionFailed`].
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let process = BrowserProcess::launch(options).await?;
		let connection = match Connection::connect(process.ws_url()).await {
			Ok(connection) => connection,
			Err(e) => {
				if let Err(shutdown) = process.shutdown().await {
					tracing::debug!(error = %shutdown, "Shutdown after failed connect");
				}
				return Err(e);
			}
		};

		Ok(Self {
			process: Some(process),
			connection,
		})
	}

	/// Wraps an existing connection that this value does not own a process for.
	pub fn from_connection(connection: Arc<Connection>) -> Self {
		Self {
			process: None,
			connection,
		}
	}

	pub fn connection(&self) -> &Arc<Connection> {
		&self.connection
	}

	/// Opens a blank tab and attaches to it in flattened mode.
	pub async fn new_page(&self) -> Result<Page> {
		let created = self
			.connection
			.send("Target.createTarget", serde_json::json!({ "url": "about:blank" }), None)
			.await?;
		let target_id = created
			.get("targetId")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::ProtocolError("Target.createTarget returned no targetId".into()))?
			.to_string();

		let attached = self
			.connection
			.send(
				"Target.attachToTarget",
				serde_json::json!({ "targetId": target_id, "flatten": true }),
				None,
			)
			.await?;
		let session_id = attached
			.get("sessionId")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::ProtocolError("Target.attachToTarget returned no sessionId".into()))?
			.to_string();

		Page::attach(Arc::clone(&self.connection), target_id, session_id).await
	}

	/// Asks the browser to exit, then shuts the process down.
	pub async fn close(mut self) -> Result<()> {
		if !self.connection.is_closed() {
			if let Err(e) = self
				.connection
				.send_with_timeout("Browser.close", serde_json::json!({}), None, CLOSE_TIMEOUT)
				.await
			{
				// the socket usually drops before the reply
				if e.is_disconnected() {
					tracing::debug!(error = %e, "Browser.close");
				} else {
					tracing::warn!(target: "webcast", error = %e, "Browser.close failed, shutting the process down");
				}
			}
		}

		match self.process.take() {
			Some(process) => process.shutdown().await,
			None => Ok(()),
		}
	}

	/// Kills the process without waiting.
	pub fn kill(&mut self) {
		if let Some(process) = self.process.as_mut() {
			process.start_kill();
		}
	}
}
