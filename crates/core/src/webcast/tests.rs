use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{DuplexStream, duplex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use webcast_runtime::Connection;

use super::*;

const URL: &str = "ws://127.0.0.1:9222/devtools/browser/fake";

/// What the fake browser answers to one command.
struct Reply {
	result: std::result::Result<Value, (i64, String)>,
	events: Vec<(String, Value)>,
}

impl Reply {
	fn ok(result: Value) -> Self {
		Self {
			result: Ok(result),
			events: Vec::new(),
		}
	}

	fn err(code: i64, message: &str) -> Self {
		Self {
			result: Err((code, message.to_string())),
			events: Vec::new(),
		}
	}

	fn with_event(mut self, method: &str, params: Value) -> Self {
		self.events.push((method.to_string(), params));
		self
	}
}

type Handler = Arc<dyn Fn(&str, &Value) -> Option<Reply> + Send + Sync>;
type Log = Arc<Mutex<Vec<(String, Value)>>>;

fn default_reply(method: &str, params: &Value) -> Reply {
	match method {
		"Target.createTarget" => Reply::ok(json!({ "targetId": "T1" })),
		"Target.attachToTarget" => Reply::ok(json!({ "sessionId": "S1" })),
		"Page.navigate" => Reply::ok(json!({ "frameId": "F1", "loaderId": "L1" }))
			.with_event("Page.loadEventFired", json!({ "timestamp": 1.0 })),
		"DOM.getDocument" => Reply::ok(json!({ "root": { "nodeId": 1 } })),
		"DOM.querySelector" if params["selector"] == "body" => Reply::ok(json!({ "nodeId": 2 })),
		"DOM.querySelector" => Reply::ok(json!({ "nodeId": 0 })),
		"Runtime.evaluate" => Reply::ok(json!({ "result": { "type": "boolean", "value": true } })),
		_ => Reply::ok(json!({})),
	}
}

async fn serve(stream: DuplexStream, handler: Handler, log: Log) {
	let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
		return;
	};
	while let Some(Ok(frame)) = ws.next().await {
		let WsMessage::Text(text) = frame else { continue };
		let request: Value = serde_json::from_str(&text).unwrap();
		let method = request["method"].as_str().unwrap().to_string();
		let params = request.get("params").cloned().unwrap_or(Value::Null);
		let session = request.get("sessionId").cloned();
		log.lock().push((method.clone(), params.clone()));

		let reply = handler(&method, &params).unwrap_or_else(|| default_reply(&method, &params));
		let mut response = match reply.result {
			Ok(result) => json!({ "id": request["id"], "result": result }),
			Err((code, message)) => json!({ "id": request["id"], "error": { "code": code, "message": message } }),
		};
		if let Some(session) = &session {
			response["sessionId"] = session.clone();
		}
		if ws.send(WsMessage::Text(response.to_string())).await.is_err() {
			return;
		}

		for (method, params) in reply.events {
			let mut event = json!({ "method": method, "params": params });
			if let Some(session) = &session {
				event["sessionId"] = session.clone();
			}
			if ws.send(WsMessage::Text(event.to_string())).await.is_err() {
				return;
			}
		}
	}
}

/// A started session talking to an in-process fake browser.
async fn fake_session_with<F>(options: WebCastOptions, handler: F) -> (WebCast, Log)
where
	F: Fn(&str, &Value) -> Option<Reply> + Send + Sync + 'static,
{
	let (client_io, server_io) = duplex(1024 * 1024);
	let log: Log = Arc::default();
	tokio::spawn(serve(server_io, Arc::new(handler), Arc::clone(&log)));

	let connection = Connection::connect_stream(client_io, URL).await.unwrap();
	let mut cast = WebCast::new(options);
	cast.start_with(Browser::from_connection(connection)).await.unwrap();
	(cast, log)
}

async fn fake_session<F>(handler: F) -> (WebCast, Log)
where
	F: Fn(&str, &Value) -> Option<Reply> + Send + Sync + 'static,
{
	fake_session_with(WebCastOptions::default(), handler).await
}

fn methods(log: &Log) -> Vec<String> {
	log.lock().iter().map(|(m, _)| m.clone()).collect()
}

fn calls(log: &Log, method: &str) -> Vec<Value> {
	log.lock()
		.iter()
		.filter(|(m, _)| m == method)
		.map(|(_, p)| p.clone())
		.collect()
}

/// Answers `DOM.querySelector` for `#found` with node 7 and `DOM.getBoxModel`
/// with a 100x40 box at (10, 20).
fn one_element(method: &str, params: &Value) -> Option<Reply> {
	match method {
		"DOM.querySelector" if params["selector"] == "#found" => Some(Reply::ok(json!({ "nodeId": 7 }))),
		"DOM.getBoxModel" => Some(Reply::ok(json!({
			"model": {
				"border": [10.0, 20.0, 110.0, 20.0, 110.0, 60.5, 10.0, 60.5],
				"width": 100,
				"height": 40
			}
		}))),
		_ => None,
	}
}

#[tokio::test]
async fn start_applies_viewport_and_media() {
	let options = WebCastOptions {
		viewport: Viewport::new(1280, 800, 4.0),
		media_features: vec![MediaFeature::new("prefers-color-scheme", "dark")],
		..Default::default()
	};
	let (cast, log) = fake_session_with(options, |_, _| None).await;

	assert_eq!(cast.state(), SessionState::Started);
	let metrics = calls(&log, "Emulation.setDeviceMetricsOverride");
	assert_eq!(metrics.len(), 1);
	assert_eq!(metrics[0]["width"], 1280);
	assert_eq!(metrics[0]["deviceScaleFactor"], 4.0);

	let media = calls(&log, "Emulation.setEmulatedMedia");
	assert_eq!(media[0]["features"][0]["name"], "prefers-color-scheme");
	assert!(methods(&log).contains(&"Network.enable".to_string()));
}

#[tokio::test]
async fn operations_before_start_are_rejected() {
	let cast = WebCast::new(WebCastOptions::default());
	assert_eq!(cast.state(), SessionState::Created);
	let err = cast.element_exists("body").await.unwrap_err();
	assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn goto_waits_and_installs_cursor() {
	let (mut cast, log) = fake_session(|_, _| None).await;
	cast.cursor_move(5, 5).await.unwrap();

	cast.goto("http://localhost/login").await.unwrap();

	assert_eq!(cast.state(), SessionState::Navigated);
	assert_eq!(cast.cursor_position(), CursorPosition::new(-20, -20));

	let methods = methods(&log);
	let navigate = methods.iter().position(|m| m == "Page.navigate").unwrap();
	let focus = methods.iter().position(|m| m == "DOM.focus").unwrap();
	assert!(navigate < focus);

	let scripts = calls(&log, "Runtime.evaluate");
	let install = scripts.last().unwrap()["expression"].as_str().unwrap().to_string();
	assert!(install.contains(cursor::CURSOR_ID));
	assert!(install.contains("pointer-events: none"));
}

#[tokio::test]
async fn goto_reports_navigation_errors() {
	let (mut cast, _log) = fake_session(|method, _| {
		(method == "Page.navigate").then(|| Reply::ok(json!({ "frameId": "F1", "errorText": "net::ERR_NAME_NOT_RESOLVED" })))
	})
	.await;

	let err = cast.goto("http://nowhere.invalid/").await.unwrap_err();
	assert!(matches!(err, Error::NavigationFailed { .. }));
	assert_eq!(cast.state(), SessionState::Started);
}

#[tokio::test]
async fn element_exists_does_not_fail_on_missing() {
	let (cast, _log) = fake_session(one_element).await;
	assert!(cast.element_exists("#found").await.unwrap());
	assert!(!cast.element_exists("#password").await.unwrap());
}

#[tokio::test]
async fn element_get_box_distinguishes_missing_and_hidden() {
	let (cast, _log) = fake_session(|method, params| match method {
		"DOM.querySelector" if params["selector"] == "#hidden" => Some(Reply::ok(json!({ "nodeId": 3 }))),
		"DOM.getBoxModel" => Some(Reply::err(-32000, "Could not compute box model.")),
		_ => None,
	})
	.await;

	let err = cast.element_get_box("#missing").await.unwrap_err();
	assert!(err.is_not_found());
	assert_eq!(err.to_string(), "element not found: #missing");

	let err = cast.element_get_box("#hidden").await.unwrap_err();
	assert!(matches!(err, Error::ElementNotVisible(ref s) if s == "#hidden"));
}

#[tokio::test]
async fn zero_size_box_is_not_visible() {
	let (cast, _log) = fake_session(|method, _| match method {
		"DOM.querySelector" => Some(Reply::ok(json!({ "nodeId": 3 }))),
		"DOM.getBoxModel" => Some(Reply::ok(json!({ "model": { "border": [5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0] } }))),
		_ => None,
	})
	.await;

	let err = cast.element_get_box("input[type=hidden]").await.unwrap_err();
	assert!(matches!(err, Error::ElementNotVisible(_)));
}

#[tokio::test]
async fn element_click_presses_at_rounded_center() {
	let (mut cast, log) = fake_session(one_element).await;

	let bbox = cast.element_get_box("#found").await.unwrap();
	assert_eq!(bbox.width, 100.0);

	cast.element_click("#found").await.unwrap();
	assert_eq!(cast.cursor_position(), CursorPosition::new(60, 40));

	let mouse = calls(&log, "Input.dispatchMouseEvent");
	let kinds: Vec<&str> = mouse.iter().map(|p| p["type"].as_str().unwrap()).collect();
	assert_eq!(kinds, ["mouseMoved", "mousePressed", "mouseReleased"]);
	for event in &mouse {
		assert_eq!(event["x"], 60);
		assert_eq!(event["y"], 40);
	}

	let pulse = calls(&log, "Runtime.evaluate");
	let pulse = pulse[0]["expression"].as_str().unwrap();
	assert!(pulse.contains("'50px'"), "marker centered on the click: {pulse}");
}

#[tokio::test]
async fn element_click_on_missing_element_fails() {
	let (mut cast, log) = fake_session(one_element).await;
	let err = cast.element_click("#nope").await.unwrap_err();
	assert!(err.is_not_found());
	assert!(calls(&log, "Input.dispatchMouseEvent").is_empty());
}

#[tokio::test]
async fn cursor_click_reinstalls_missing_marker() {
	let pulses = Arc::new(Mutex::new(0));
	let counter = Arc::clone(&pulses);
	let (mut cast, log) = fake_session(move |method, params| {
		if method != "Runtime.evaluate" {
			return None;
		}
		let expression = params["expression"].as_str().unwrap_or_default();
		if expression.contains("_webcastHide") {
			let mut n = counter.lock();
			*n += 1;
			let shown = *n > 1;
			return Some(Reply::ok(json!({ "result": { "type": "boolean", "value": shown } })));
		}
		None
	})
	.await;

	cast.cursor_move(300, 200).await.unwrap();
	cast.cursor_click().await.unwrap();

	assert_eq!(*pulses.lock(), 2);
	let scripts = calls(&log, "Runtime.evaluate");
	assert_eq!(scripts.len(), 3);
	assert!(scripts[1]["expression"].as_str().unwrap().contains("@keyframes"));
}

#[tokio::test]
async fn text_type_focuses_then_types_each_char() {
	let (cast, log) = fake_session(one_element).await;

	cast.text_type("#found", "adm\n").await.unwrap();

	let methods = methods(&log);
	let focus = methods.iter().position(|m| m == "DOM.focus").unwrap();
	let first_key = methods.iter().position(|m| m == "Input.dispatchKeyEvent").unwrap();
	assert!(focus < first_key);

	let keys = calls(&log, "Input.dispatchKeyEvent");
	assert_eq!(keys.len(), 8);
	let typed: String = keys
		.iter()
		.filter(|k| k["type"] == "keyDown")
		.map(|k| k["text"].as_str().unwrap())
		.collect();
	assert_eq!(typed, "adm\r");
}

#[tokio::test]
async fn text_type_inserts_emoji_as_text() {
	let (cast, log) = fake_session(one_element).await;

	cast.text_type("#found", "ok🚀").await.unwrap();

	assert_eq!(calls(&log, "Input.dispatchKeyEvent").len(), 4);
	let inserted = calls(&log, "Input.insertText");
	assert_eq!(inserted.len(), 1);
	assert_eq!(inserted[0]["text"], "🚀");
}

#[tokio::test]
async fn text_type_into_missing_element_fails() {
	let (cast, log) = fake_session(|_, _| None).await;
	let err = cast.text_type("#login", "admin").await.unwrap_err();
	assert!(err.is_not_found());
	assert!(calls(&log, "Input.dispatchKeyEvent").is_empty());
}

#[tokio::test]
async fn element_select_sets_value_without_waiting() {
	let (mut cast, log) = fake_session(|method, params| {
		if method == "Runtime.evaluate" && params["expression"].as_str().unwrap_or_default().contains("<select>") {
			return Some(Reply::ok(json!({ "result": { "type": "object", "value": ["eu-west"] } })));
		}
		one_element(method, params)
	})
	.await;

	cast.element_select("#found", "eu-west").await.unwrap();

	let scripts = calls(&log, "Runtime.evaluate");
	let select = scripts.last().unwrap()["expression"].as_str().unwrap();
	assert!(select.ends_with(r##"("#found", ["eu-west"])"##), "{select}");
	assert!(calls(&log, "DOM.focus").is_empty(), "select does not wait for the network");
}

#[tokio::test]
async fn element_select_propagates_page_errors() {
	let (mut cast, _log) = fake_session(|method, params| {
		if method == "Runtime.evaluate" && params["expression"].as_str().unwrap_or_default().contains("<select>") {
			return Some(Reply::ok(json!({
				"result": { "type": "object", "subtype": "error" },
				"exceptionDetails": { "text": "Uncaught", "exception": { "description": "Error: Element is not a <select> element." } }
			})));
		}
		one_element(method, params)
	})
	.await;

	let err = cast.element_select("#found", "x").await.unwrap_err();
	assert!(matches!(err, Error::JsException(ref m) if m.contains("not a <select>")));
}

#[tokio::test]
async fn scroll_into_view_ignores_missing_element() {
	let (cast, log) = fake_session(|method, _| {
		(method == "Runtime.evaluate").then(|| Reply::ok(json!({ "result": { "type": "boolean", "value": false } })))
	})
	.await;

	cast.element_scroll_into_view("#nowhere").await.unwrap();
	let script = calls(&log, "Runtime.evaluate")[0]["expression"].as_str().unwrap().to_string();
	assert!(script.contains("behavior: 'smooth', block: 'start'"));
}

#[tokio::test]
async fn element_get_attribute_maps_null_to_none() {
	let (cast, _log) = fake_session(|method, params| {
		if method != "Runtime.evaluate" {
			return None;
		}
		let expression = params["expression"].as_str().unwrap_or_default();
		let value = if expression.contains("\"id\"") { json!("instance-42") } else { Value::Null };
		Some(Reply::ok(json!({ "result": { "type": "string", "value": value } })))
	})
	.await;

	assert_eq!(
		cast.element_get_attribute("main ul>li>div", "id").await.unwrap().as_deref(),
		Some("instance-42")
	);
	assert_eq!(cast.element_get_attribute("main ul>li>div", "title").await.unwrap(), None);
}

#[tokio::test]
async fn element_file_select_clicks_then_uploads() {
	let dir = tempfile::tempdir().unwrap();
	let file = dir.path().join("build.zip");
	std::fs::write(&file, b"PK\x03\x04").unwrap();

	let (mut cast, log) = fake_session(one_element).await;
	cast.element_file_select("#found", &file).await.unwrap();

	let methods = methods(&log);
	let pressed = methods.iter().position(|m| m == "Input.dispatchMouseEvent").unwrap();
	let upload = methods.iter().position(|m| m == "DOM.setFileInputFiles").unwrap();
	assert!(pressed < upload);

	let upload = &calls(&log, "DOM.setFileInputFiles")[0];
	assert_eq!(upload["nodeId"], 7);
	assert_eq!(upload["files"][0], file.to_string_lossy().as_ref());
}

#[tokio::test]
async fn element_wait_for_times_out() {
	let (cast, _log) = fake_session(|_, _| None).await;
	let err = cast
		.element_wait_for(".success-icon", Some(Duration::from_millis(100)))
		.await
		.unwrap_err();
	assert!(err.is_timeout());
	assert!(matches!(err, Error::TimeoutExceeded { timeout_ms: 100, .. }));
}

#[tokio::test]
async fn element_wait_for_resolves_when_element_appears() {
	let appeared = Arc::new(Mutex::new(0u32));
	let queries = Arc::clone(&appeared);
	let (cast, _log) = fake_session(move |method, _| {
		if method != "DOM.querySelector" {
			return None;
		}
		let mut n = queries.lock();
		*n += 1;
		let node = if *n >= 3 { 9 } else { 0 };
		Some(Reply::ok(json!({ "nodeId": node })))
	})
	.await;

	cast.element_wait_for(".success-icon", None).await.unwrap();
	assert_eq!(*appeared.lock(), 3);
}

#[tokio::test]
async fn element_wait_for_checks_again_at_the_deadline() {
	let first_query: Arc<Mutex<Option<std::time::Instant>>> = Arc::default();
	let seen = Arc::clone(&first_query);
	let (cast, _log) = fake_session(move |method, params| {
		if method != "DOM.querySelector" || params["selector"] != ".late" {
			return None;
		}
		let started = *seen.lock().get_or_insert_with(std::time::Instant::now);
		let node = if started.elapsed() >= Duration::from_millis(230) { 9 } else { 0 };
		Some(Reply::ok(json!({ "nodeId": node })))
	})
	.await;

	cast.element_wait_for(".late", Some(Duration::from_millis(290))).await.unwrap();
}

#[tokio::test]
async fn element_wait_for_uses_the_whole_timeout() {
	let (cast, _log) = fake_session(|_, _| None).await;

	let started = std::time::Instant::now();
	let err = cast
		.element_wait_for(".never", Some(Duration::from_millis(150)))
		.await
		.unwrap_err();

	assert!(matches!(err, Error::TimeoutExceeded { timeout_ms: 150, .. }));
	assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn stop_and_close_are_idempotent() {
	let (mut cast, log) = fake_session(|_, _| None).await;

	cast.stop().await.unwrap();
	cast.stop().await.unwrap();
	cast.close().await.unwrap();
	cast.close().await.unwrap();
	cast.stop().await.unwrap();

	assert_eq!(cast.state(), SessionState::Closed);
	assert_eq!(calls(&log, "Browser.close").len(), 1);
	assert!(calls(&log, "Page.stopScreencast").is_empty());

	let err = cast.goto("http://localhost/").await.unwrap_err();
	assert!(matches!(err, Error::SessionClosed("goto")));
	assert!(cast.start().await.is_err());
}

#[tokio::test]
async fn close_survives_a_rejected_browser_close() {
	let (mut cast, log) = fake_session(|method, _| {
		(method == "Browser.close").then(|| Reply::err(-32000, "Browser.close is not allowed"))
	})
	.await;

	cast.close().await.unwrap();
	assert_eq!(cast.state(), SessionState::Closed);
	assert_eq!(calls(&log, "Browser.close").len(), 1);
}

#[tokio::test]
async fn splash_replaces_document() {
	let (cast, log) = fake_session(|_, _| None).await;
	cast.splash("Deploy", "in one minute", Duration::from_millis(10)).await.unwrap();
	let script = calls(&log, "Runtime.evaluate")[0]["expression"].as_str().unwrap().to_string();
	assert!(script.contains(r#"h1.textContent = "Deploy";"#));
}

#[cfg(unix)]
mod recording {
	use std::os::unix::fs::PermissionsExt;
	use std::path::{Path, PathBuf};

	use super::*;

	/// "JPEGDATA"
	const FRAME: &str = "SlBFR0RBVEE=";

	fn script(dir: &Path, body: &str) -> PathBuf {
		let path = dir.join("fake-ffmpeg");
		std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
		path
	}

	fn streaming_frames(method: &str, _: &Value) -> Option<Reply> {
		(method == "Page.startScreencast").then(|| {
			Reply::ok(json!({}))
				.with_event(
					"Page.screencastFrame",
					json!({ "data": FRAME, "sessionId": 1, "metadata": { "timestamp": 1000.0 } }),
				)
				.with_event(
					"Page.screencastFrame",
					json!({ "data": FRAME, "sessionId": 2, "metadata": { "timestamp": 1000.2 } }),
				)
		})
	}

	fn options(ffmpeg: PathBuf) -> WebCastOptions {
		WebCastOptions {
			recorder: RecorderOptions {
				ffmpeg_path: Some(ffmpeg),
				..Default::default()
			},
			..Default::default()
		}
	}

	#[tokio::test]
	async fn screencast_pipes_paced_frames_to_encoder() {
		let dir = tempfile::tempdir().unwrap();
		// last argument is the output file
		let ffmpeg = script(dir.path(), "for a; do out=\"$a\"; done\ncat > \"$out\"");
		let output = dir.path().join("videos/screen.mp4");

		let (mut cast, log) = fake_session_with(options(ffmpeg), streaming_frames).await;
		cast.screencast(&output).await.unwrap();
		assert!(cast.is_recording());
		assert!(cast.screencast(&output).await.is_err());

		cast.close().await.unwrap();
		assert!(!cast.is_recording());

		let video = std::fs::read(&output).unwrap();
		assert!(!video.is_empty());
		assert_eq!(video.len() % 8, 0);
		// 0.2 s at 25 fps of the first frame, then at least one of the second
		assert!(video.len() / 8 >= 6);

		let acks: Vec<i64> = calls(&log, "Page.screencastFrameAck")
			.iter()
			.map(|p| p["sessionId"].as_i64().unwrap())
			.collect();
		assert_eq!(acks, [1, 2]);

		let methods = methods(&log);
		let stop = methods.iter().position(|m| m == "Page.stopScreencast").unwrap();
		let close = methods.iter().position(|m| m == "Browser.close").unwrap();
		assert!(stop < close);
	}

	#[tokio::test]
	async fn repeated_stop_stops_the_recorder_once() {
		let dir = tempfile::tempdir().unwrap();
		let ffmpeg = script(dir.path(), "cat > /dev/null");

		let (mut cast, log) = fake_session_with(options(ffmpeg), streaming_frames).await;
		cast.screencast(dir.path().join("screen.mp4")).await.unwrap();

		cast.stop().await.unwrap();
		assert!(!cast.is_recording());
		cast.stop().await.unwrap();
		cast.close().await.unwrap();
		cast.close().await.unwrap();

		assert_eq!(calls(&log, "Page.stopScreencast").len(), 1);
		assert_eq!(calls(&log, "Browser.close").len(), 1);
	}

	#[tokio::test]
	async fn encoder_failure_surfaces_stderr() {
		let dir = tempfile::tempdir().unwrap();
		let ffmpeg = script(dir.path(), "cat > /dev/null\necho 'Unknown encoder libx999' >&2\nexit 1");

		let (mut cast, log) = fake_session_with(options(ffmpeg), streaming_frames).await;
		cast.screencast(dir.path().join("screen.mp4")).await.unwrap();

		let err = cast.close().await.unwrap_err();
		assert!(matches!(err, Error::Recorder(ref m) if m.contains("Unknown encoder libx999")));
		// the browser is still shut down
		assert_eq!(cast.state(), SessionState::Closed);
		assert_eq!(calls(&log, "Browser.close").len(), 1);
	}

	#[tokio::test]
	async fn missing_encoder_fails_to_start() {
		let (mut cast, _log) = fake_session_with(options(PathBuf::from("/nonexistent/ffmpeg")), streaming_frames).await;
		let err = cast.screencast("screen.mp4").await.unwrap_err();
		assert!(matches!(err, Error::Recorder(_)));
		assert!(!cast.is_recording());
	}
}
