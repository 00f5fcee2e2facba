//! Page console output, parsed from `Runtime.consoleAPICalled`.

use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use super::Page;

/// One `console.*` call made by the page.
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
	kind: ConsoleMessageKind,
	text: String,
	location: Option<ConsoleLocation>,
}

/// Where in the page's scripts a message was logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLocation {
	pub url: String,
	/// 0-indexed.
	pub line_number: u32,
	pub column_number: u32,
}

/// Console call types, collapsed to the levels a log cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMessageKind {
	Log,
	Debug,
	Info,
	Warning,
	Error,
	/// `console.assert` with a falsy condition.
	Assert,
	/// `console.trace`.
	Trace,
	/// `dir`, `table`, `count` and the other structured calls.
	Other,
}

impl ConsoleMessageKind {
	fn parse(kind: &str) -> Self {
		match kind {
			"log" => Self::Log,
			"debug" => Self::Debug,
			"info" => Self::Info,
			"warning" => Self::Warning,
			"error" => Self::Error,
			"assert" => Self::Assert,
			"trace" => Self::Trace,
			_ => Self::Other,
		}
	}

	fn label(self) -> &'static str {
		match self {
			Self::Log => "log",
			Self::Debug => "debug",
			Self::Info => "info",
			Self::Warning => "warning",
			Self::Error => "error",
			Self::Assert => "assert",
			Self::Trace => "trace",
			Self::Other => "other",
		}
	}
}

impl std::fmt::Display for ConsoleMessageKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label())
	}
}

impl ConsoleMessage {
	pub fn from_params(params: &Value) -> Self {
		let kind = ConsoleMessageKind::parse(params.get("type").and_then(Value::as_str).unwrap_or("log"));
		let text = params
			.get("args")
			.and_then(Value::as_array)
			.map(|args| args.iter().map(argument_text).collect::<Vec<_>>().join(" "))
			.unwrap_or_default();
		let location = params.pointer("/stackTrace/callFrames/0").map(|frame| {
			let number = |key: &str| frame.get(key).and_then(Value::as_u64).unwrap_or(0) as u32;
			ConsoleLocation {
				url: frame.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
				line_number: number("lineNumber"),
				column_number: number("columnNumber"),
			}
		});

		Self { kind, text, location }
	}

	pub fn kind(&self) -> ConsoleMessageKind {
		self.kind
	}

	/// Arguments rendered and joined with spaces.
	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn location(&self) -> Option<&ConsoleLocation> {
		self.location.as_ref()
	}

	/// Emits the message under the `webcast::console` target at a level
	/// matching its kind.
	pub fn forward_to_tracing(&self) {
		let url = self.location.as_ref().map_or("", |l| l.url.as_str());
		let kind = self.kind;
		match kind {
			ConsoleMessageKind::Error | ConsoleMessageKind::Assert => {
				tracing::error!(target: "webcast::console", %kind, url, "{}", self.text)
			}
			ConsoleMessageKind::Warning => tracing::warn!(target: "webcast::console", %kind, url, "{}", self.text),
			ConsoleMessageKind::Debug | ConsoleMessageKind::Trace => {
				tracing::debug!(target: "webcast::console", %kind, url, "{}", self.text)
			}
			_ => tracing::info!(target: "webcast::console", %kind, url, "{}", self.text),
		}
	}
}

/// Text for one `Runtime.RemoteObject` argument: primitives by value,
/// objects by their description.
fn argument_text(arg: &Value) -> String {
	match arg.get("value") {
		Some(Value::String(s)) => s.clone(),
		Some(value) => value.to_string(),
		None => ["unserializableValue", "description", "type"]
			.iter()
			.find_map(|key| arg.get(*key).and_then(Value::as_str))
			.unwrap_or("undefined")
			.to_string(),
	}
}

/// Stops the task started by [`Page::on_console`] when dropped.
pub struct ConsoleSubscription {
	cancel: Option<oneshot::Sender<()>>,
}

impl Drop for ConsoleSubscription {
	fn drop(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			let _ = cancel.send(());
		}
	}
}

impl Page {
	pub fn console_messages(&self) -> broadcast::Receiver<ConsoleMessage> {
		self.inner.console_tx.subscribe()
	}

	/// Calls `handler` for every console message until the returned
	/// subscription is dropped or the page goes away.
	pub fn on_console<F>(&self, handler: F) -> ConsoleSubscription
	where
		F: Fn(ConsoleMessage) + Send + Sync + 'static,
	{
		let mut rx = self.console_messages();
		let (cancel, mut cancelled) = oneshot::channel::<()>();

		tokio::spawn(async move {
			loop {
				tokio::select! {
					received = rx.recv() => match received {
						Ok(msg) => handler(msg),
						Err(broadcast::error::RecvError::Lagged(n)) => {
							tracing::debug!(target: "webcast::console", skipped = n, "Console forwarding fell behind");
						}
						Err(broadcast::error::RecvError::Closed) => break,
					},
					_ = &mut cancelled => break,
				}
			}
		});

		ConsoleSubscription { cancel: Some(cancel) }
	}
}
