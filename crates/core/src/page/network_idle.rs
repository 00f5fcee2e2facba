//! Network idle tracking.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;
use webcast_runtime::{Error, Result};

/// Counts in-flight requests of a page from its `Network.*` events.
#[derive(Clone)]
pub struct NetworkIdle {
	state: Arc<Mutex<State>>,
	changed: Arc<Notify>,
}

struct State {
	inflight: HashSet<String>,
	last_activity: Instant,
}

impl Default for NetworkIdle {
	fn default() -> Self {
		Self::new()
	}
}

impl NetworkIdle {
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(State {
				inflight: HashSet::new(),
				last_activity: Instant::now(),
			})),
			changed: Arc::new(Notify::new()),
		}
	}

	/// Number of requests started and not yet finished or failed.
	pub fn inflight(&self) -> usize {
		self.state.lock().inflight.len()
	}

	/// Feeds one `Network.*` event.
	pub fn on_event(&self, method: &str, params: &Value) {
		let Some(request_id) = params.get("requestId").and_then(Value::as_str) else {
			return;
		};

		let mut state = self.state.lock();
		match method {
			"Network.requestWillBeSent" => {
				state.inflight.insert(request_id.to_string());
			}
			"Network.loadingFinished" | "Network.loadingFailed" => {
				state.inflight.remove(request_id);
			}
			_ => return,
		}
		state.last_activity = Instant::now();
		tracing::trace!(method, request_id, inflight = state.inflight.len(), "Network activity");
		drop(state);
		self.changed.notify_waiters();
	}

	/// Resolves once nothing has been in flight for `quiet`.
	///
	/// The quiet window starts no earlier than the call itself, so a page
	/// that was already idle still waits `quiet` once.
	///
	/// # Errors
	///
	/// Returns [`Error::Timeout`] if the page does not settle within `timeout`.
	pub async fn wait_for_idle(&self, quiet: Duration, timeout: Duration) -> Result<()> {
		let started = Instant::now();
		let deadline = started + timeout;

		loop {
			let notified = self.changed.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			let now = Instant::now();
			let idle_at = {
				let state = self.state.lock();
				state
					.inflight
					.is_empty()
					.then(|| state.last_activity.max(started) + quiet)
			};

			if let Some(idle_at) = idle_at {
				if now >= idle_at {
					return Ok(());
				}
			}
			if now >= deadline {
				return Err(Error::Timeout(format!(
					"network idle ({} requests still in flight after {}ms)",
					self.inflight(),
					timeout.as_millis()
				)));
			}

			let wake_at = idle_at.map_or(deadline, |t| t.min(deadline));
			tokio::select! {
				_ = &mut notified => {}
				_ = tokio::time::sleep_until(wake_at) => {}
			}
		}
	}
}
