//! Browser process management
//!
//! Launches Chromium with remote debugging on an ephemeral port and reads the
//! DevTools WebSocket URL it announces on stderr.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use webcast_protocol::LaunchOptions;

use crate::driver::get_browser_executable;
use crate::error::{Error, Result};

const DEVTOOLS_BANNER: &str = "DevTools listening on ";

/// Stderr lines kept for the error message when launch fails.
const STDERR_TAIL: usize = 8;

const DEFAULT_ARGS: &[&str] = &[
	"--remote-debugging-port=0",
	"--no-first-run",
	"--no-default-browser-check",
	"--disable-background-networking",
	"--disable-background-timer-throttling",
	"--disable-backgrounding-occluded-windows",
	"--disable-renderer-backgrounding",
	"--disable-sync",
	"--disable-extensions",
	"--disable-popup-blocking",
	"--metrics-recording-only",
	"--password-store=basic",
	"--use-mock-keychain",
	"--hide-scrollbars",
	"--mute-audio",
];

/// A running browser with remote debugging enabled.
///
/// The child is spawned with `kill_on_drop`, so dropping this without calling
/// [`BrowserProcess::shutdown`] still terminates the browser.
#[derive(Debug)]
pub struct BrowserProcess {
	process: Child,
	ws_url: String,
	profile: Option<TempDir>,
}

impl BrowserProcess {
	/// Launch the browser process
	///
	/// This will:
	/// 1. Locate the executable (see [`get_browser_executable`])
	/// 2. Create a temporary profile unless `user_data_dir` is set
	/// 3. Spawn it with `--remote-debugging-port=0`
	/// 4. Wait for the `DevTools listening on ws://...` line on stderr
	///
	/// # Errors
	///
	/// Returns [`Error::BrowserNotFound`] if no executable can be located and
	/// [`Error::LaunchFailed`] if the process cannot be spawned, exits early, or
	/// does not announce its endpoint within `launch_timeout_ms`.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let executable = get_browser_executable(options.executable_path.as_deref())?;

		let (profile, user_data_dir) = match &options.user_data_dir {
			Some(dir) => (None, dir.clone()),
			None => {
				let temp = tempfile::Builder::new().prefix("webcast-profile-").tempdir()?;
				let path = temp.path().to_path_buf();
				(Some(temp), path)
			}
		};

		let args = build_args(options, &user_data_dir);
		tracing::debug!(target: "webcast", executable = %executable.display(), ?args, "Launching browser");

		let mut process = Command::new(&executable)
			.args(&args)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("Failed to spawn {}: {}", executable.display(), e)))?;

		let stderr = process
			.stderr
			.take()
			.ok_or_else(|| Error::LaunchFailed("browser stderr was not captured".to_string()))?;

		let timeout = Duration::from_millis(options.launch_timeout_ms);
		let ws_url = match tokio::time::timeout(timeout, read_devtools_url(stderr)).await {
			Ok(Ok(url)) => url,
			Ok(Err(tail)) => {
				let status = process.wait().await.ok();
				return Err(Error::LaunchFailed(format!(
					"browser exited before announcing DevTools endpoint (status: {}){}",
					status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()),
					format_tail(&tail)
				)));
			}
			Err(_) => {
				let _ = process.kill().await;
				return Err(Error::LaunchFailed(format!(
					"browser did not announce DevTools endpoint within {}ms",
					options.launch_timeout_ms
				)));
			}
		};

		tracing::info!(target: "webcast", pid = process.id(), url = %ws_url, "Browser launched");

		Ok(Self {
			process,
			ws_url,
			profile,
		})
	}

	/// DevTools WebSocket URL of the browser target.
	pub fn ws_url(&self) -> &str {
		&self.ws_url
	}

	/// OS process id, if the process is still running.
	pub fn pid(&self) -> Option<u32> {
		self.process.id()
	}

	/// Profile directory in use when it is a temporary one.
	pub fn profile_dir(&self) -> Option<&Path> {
		self.profile.as_ref().map(TempDir::path)
	}

	/// Kills the browser without waiting, for use from `Drop`.
	pub fn start_kill(&mut self) {
		let _ = self.process.start_kill();
	}

	/// Shut down the browser
	///
	/// Kills the process, waits up to 5 seconds for it to exit, then removes
	/// the temporary profile.
	pub async fn shutdown(mut self) -> Result<()> {
		if let Ok(Some(status)) = self.process.try_wait() {
			tracing::debug!(%status, "Browser already exited");
		} else {
			self.process
				.start_kill()
				.map_err(|e| Error::LaunchFailed(format!("Failed to kill browser: {}", e)))?;

			match tokio::time::timeout(Duration::from_secs(5), self.process.wait()).await {
				Ok(Ok(_)) => {}
				Ok(Err(e)) => return Err(Error::LaunchFailed(format!("Failed to wait for browser: {}", e))),
				Err(_) => {
					return Err(Error::LaunchFailed("Browser shutdown timeout after 5 seconds".to_string()));
				}
			}
		}

		if let Some(profile) = self.profile.take() {
			let path = profile.path().to_path_buf();
			if let Err(e) = profile.close() {
				tracing::debug!(path = %path.display(), error = %e, "Failed to remove profile dir");
			}
		}
		Ok(())
	}
}

/// Command-line switches for a launch.
fn build_args(options: &LaunchOptions, user_data_dir: &Path) -> Vec<String> {
	let mut args: Vec<String> = DEFAULT_ARGS.iter().map(|s| s.to_string()).collect();
	args.push(format!("--user-data-dir={}", user_data_dir.display()));
	if options.headless {
		args.push("--headless=new".to_string());
	}
	args.extend(options.args.iter().cloned());
	args.push("about:blank".to_string());
	args
}

/// Extracts the URL from a `DevTools listening on ws://...` line.
fn parse_devtools_line(line: &str) -> Option<String> {
	let url = line.trim().strip_prefix(DEVTOOLS_BANNER)?.trim();
	(url.starts_with("ws://") || url.starts_with("wss://")).then(|| url.to_string())
}

/// Reads stderr until the DevTools banner appears.
///
/// On EOF returns the last few lines for the error message. After the banner,
/// the rest of stderr is drained in the background so the pipe never fills.
async fn read_devtools_url(stderr: ChildStderr) -> std::result::Result<String, Vec<String>> {
	let mut lines = BufReader::new(stderr).lines();
	let mut tail: Vec<String> = Vec::new();

	while let Ok(Some(line)) = lines.next_line().await {
		if let Some(url) = parse_devtools_line(&line) {
			tokio::spawn(async move {
				while let Ok(Some(line)) = lines.next_line().await {
					tracing::trace!(target: "webcast::browser", "{}", line);
				}
			});
			return Ok(url);
		}
		if tail.len() == STDERR_TAIL {
			tail.remove(0);
		}
		tail.push(line);
	}
	Err(tail)
}

fn format_tail(tail: &[String]) -> String {
	if tail.is_empty() {
		String::new()
	} else {
		format!("\nstderr:\n{}", tail.join("\n"))
	}
}
