//! [`Page`] bound to one attached browser tab.

mod dom;
mod emulation;
mod eval;
mod input;
mod network_idle;
mod console;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use webcast_protocol::{DEFAULT_TIMEOUT_MS, Event};
use webcast_runtime::{Connection, Error, Result};

pub use dom::NodeId;
pub use input::key_events;
pub use network_idle::NetworkIdle;
pub use console::{ConsoleLocation, ConsoleMessage, ConsoleMessageKind, ConsoleSubscription};

/// Console messages buffered per subscriber.
const CONSOLE_CAPACITY: usize = 256;

/// A browser tab attached in flattened mode.
///
/// Cheap to clone; clones share the session, the console channel and the
/// network tracker.
#[derive(Clone)]
pub struct Page {
	inner: Arc<PageInner>,
}

struct PageInner {
	connection: Arc<Connection>,
	target_id: String,
	session_id: String,
	console_tx: broadcast::Sender<ConsoleMessage>,
	network: NetworkIdle,
	pump: JoinHandle<()>,
}

impl Drop for PageInner {
	fn drop(&mut self) {
		self.pump.abort();
	}
}

impl Page {
	/// Binds to an attached target session and enables the domains the
	/// driver relies on.
	pub async fn attach(connection: Arc<Connection>, target_id: String, session_id: String) -> Result<Self> {
		let (console_tx, _) = broadcast::channel(CONSOLE_CAPACITY);
		let network = NetworkIdle::new();

		let pump = tokio::spawn(pump_events(
			connection.subscribe(),
			session_id.clone(),
			network.clone(),
			console_tx.clone(),
		));

		let page = Self {
			inner: Arc::new(PageInner {
				connection,
				target_id,
				session_id,
				console_tx,
				network,
				pump,
			}),
		};

		for domain in ["Page", "DOM", "Runtime", "Network"] {
			page.command(&format!("{domain}.enable"), serde_json::json!({})).await?;
		}

		tracing::debug!(target_id = %page.inner.target_id, session_id = %page.inner.session_id, "Page attached");
		Ok(page)
	}

	pub fn target_id(&self) -> &str {
		&self.inner.target_id
	}

	pub fn session_id(&self) -> &str {
		&self.inner.session_id
	}

	pub fn connection(&self) -> &Arc<Connection> {
		&self.inner.connection
	}

	/// In-flight request tracker fed by this page's `Network.*` events.
	pub fn network(&self) -> &NetworkIdle {
		&self.inner.network
	}

	/// Sends a command to this page's session.
	pub async fn command(&self, method: &str, params: Value) -> Result<Value> {
		self.inner
			.connection
			.send(method, params, Some(&self.inner.session_id))
			.await
	}

	/// Subscribes to raw protocol events of this page.
	pub fn events(&self) -> PageEvents {
		PageEvents {
			rx: self.inner.connection.subscribe(),
			session_id: self.inner.session_id.clone(),
		}
	}

	/// Navigates and waits for the `load` event.
	///
	/// # Errors
	///
	/// Returns [`Error::NavigationFailed`] when the browser reports a network
	/// error for the document and [`Error::Timeout`] if `load` does not fire
	/// within the default timeout.
	pub async fn goto(&self, url: &str) -> Result<()> {
		let mut events = self.events();
		let result = self.command("Page.navigate", serde_json::json!({ "url": url })).await?;

		if let Some(reason) = result.get("errorText").and_then(Value::as_str).filter(|s| !s.is_empty()) {
			return Err(Error::NavigationFailed {
				url: url.to_string(),
				reason: reason.to_string(),
			});
		}

		// same-document navigations have no loader and fire no load event
		if result.get("loaderId").is_none() {
			return Ok(());
		}

		events
			.wait_for("Page.loadEventFired", Duration::from_millis(DEFAULT_TIMEOUT_MS))
			.await
			.map_err(|e| match e {
				Error::Timeout(_) => Error::Timeout(format!("load event for {url}")),
				other => other,
			})?;
		tracing::debug!(url, "Page loaded");
		Ok(())
	}

	/// Waits until no request has been in flight for 500 ms, bounded by the
	/// default timeout.
	pub async fn wait_for_network_idle(&self) -> Result<()> {
		self.inner
			.network
			.wait_for_idle(
				Duration::from_millis(webcast_protocol::NETWORK_IDLE_MS),
				Duration::from_millis(DEFAULT_TIMEOUT_MS),
			)
			.await
	}
}

/// Event stream filtered to one page session.
pub struct PageEvents {
	rx: broadcast::Receiver<Event>,
	session_id: String,
}

impl PageEvents {
	/// Next event of this session, or `None` once the connection is gone.
	pub async fn next(&mut self) -> Option<Event> {
		loop {
			match self.rx.recv().await {
				Ok(event) if event.is_for(Some(&self.session_id)) => return Some(event),
				Ok(_) => continue,
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "Page event receiver lagged");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Waits for the first event named `method`.
	pub async fn wait_for(&mut self, method: &str, timeout: Duration) -> Result<Event> {
		tokio::time::timeout(timeout, async {
			while let Some(event) = self.next().await {
				if event.method == method {
					return Ok(event);
				}
			}
			Err(Error::ChannelClosed)
		})
		.await
		.map_err(|_| Error::Timeout(format!("waiting for {method}")))?
	}
}

async fn pump_events(
	mut events: broadcast::Receiver<Event>,
	session_id: String,
	network: NetworkIdle,
	console_tx: broadcast::Sender<ConsoleMessage>,
) {
	loop {
		let event = match events.recv().await {
			Ok(event) => event,
			Err(broadcast::error::RecvError::Lagged(n)) => {
				tracing::warn!(dropped = n, "Page event pump lagged");
				continue;
			}
			Err(broadcast::error::RecvError::Closed) => break,
		};
		if !event.is_for(Some(&session_id)) {
			continue;
		}

		if event.method.starts_with("Network.") {
			network.on_event(&event.method, &event.params);
		} else if event.method == "Runtime.consoleAPICalled" {
			let _ = console_tx.send(ConsoleMessage::from_params(&event.params));
		}
	}
}
