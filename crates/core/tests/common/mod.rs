//! Local HTTP fixtures for browser integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use axum::response::Html;
use axum::routing::get;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const LOGIN: &str = r#"<!doctype html>
<html><head><title>Login</title></head>
<body>
	<form id="login-form" onsubmit="event.preventDefault(); location.href = '/apps.html';">
		<input id="name" name="name">
		<input id="password" name="password" type="password">
		<button type="submit">Sign in</button>
	</form>
</body></html>"#;

const APPS: &str = r#"<!doctype html>
<html><head><title>Apps</title></head>
<body>
	<main>
		<h1 id="apps">Apps</h1>
		<select id="region">
			<option value="us-east">US East</option>
			<option value="eu-west">EU West</option>
		</select>
		<ul><li><div id="instance-7" title="">instance</div></li></ul>
		<div id="hidden" style="display: none">hidden</div>
		<input id="build" type="file">
		<p id="log"></p>
	</main>
	<script>
		document.getElementById('region').addEventListener('change', (e) => {
			document.getElementById('log').textContent = 'region:' + e.target.value;
		});
	</script>
</body></html>"#;

const DELAYED: &str = r#"<!doctype html>
<html><head><title>Deploying</title></head>
<body>
	<p>Deploying...</p>
	<script>
		setTimeout(() => {
			const icon = document.createElement('span');
			icon.className = 'success-icon';
			document.body.append(icon);
		}, 5000);
	</script>
</body></html>"#;

/// An axum server on an ephemeral localhost port.
pub struct TestServer {
	addr: SocketAddr,
	shutdown: Option<oneshot::Sender<()>>,
	handle: JoinHandle<()>,
}

impl TestServer {
	pub async fn start() -> Self {
		let app = Router::new()
			.route("/login.html", get(|| async { Html(LOGIN) }))
			.route("/apps.html", get(|| async { Html(APPS) }))
			.route("/delayed.html", get(|| async { Html(DELAYED) }));

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let (tx, rx) = oneshot::channel::<()>();

		let handle = tokio::spawn(async move {
			axum::serve(listener, app)
				.with_graceful_shutdown(async {
					let _ = rx.await;
				})
				.await
				.unwrap();
		});

		Self {
			addr,
			shutdown: Some(tx),
			handle,
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("http://{}{}", self.addr, path)
	}

	pub fn shutdown(mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
		self.handle.abort();
	}
}

/// True if a Chromium binary can be found; prints why not otherwise.
pub fn browser_available() -> bool {
	match webcast::get_browser_executable(None) {
		Ok(_) => true,
		Err(e) => {
			eprintln!("skipping browser test: {e}");
			false
		}
	}
}

/// True if `ffmpeg` runs; prints why not otherwise.
pub fn ffmpeg_available() -> bool {
	match std::process::Command::new("ffmpeg").arg("-version").output() {
		Ok(out) if out.status.success() => true,
		_ => {
			eprintln!("skipping recording test: ffmpeg not available");
			false
		}
	}
}

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_test_writer()
		.with_max_level(tracing::Level::DEBUG)
		.try_init();
}
