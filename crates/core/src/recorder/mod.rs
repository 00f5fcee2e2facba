//! Screen recording through `Page.startScreencast` and ffmpeg.

mod ffmpeg;
mod pacing;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use webcast_protocol::{RecorderOptions, ScreencastFrame, Viewport};
use webcast_runtime::{Error, Result};

pub use ffmpeg::ffmpeg_args;
pub use pacing::FramePacer;

use crate::page::{Page, PageEvents};

/// ffmpeg stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// How long ffmpeg may take to finish the file after stdin closes.
const ENCODER_EXIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Recorder slot of a session.
#[derive(Default)]
pub enum RecorderState {
	#[default]
	Idle,
	Recording(ScreenRecorder),
}

impl RecorderState {
	pub fn is_recording(&self) -> bool {
		matches!(self, Self::Recording(_))
	}

	/// Moves an active recorder out, leaving the slot idle.
	pub fn take(&mut self) -> Option<ScreenRecorder> {
		match std::mem::take(self) {
			Self::Recording(recorder) => Some(recorder),
			Self::Idle => None,
		}
	}
}

/// An ffmpeg process fed with the frames of one page.
pub struct ScreenRecorder {
	page: Page,
	output: PathBuf,
	encoder: Child,
	stop_tx: Option<oneshot::Sender<()>>,
	pump: JoinHandle<Result<u64>>,
	stderr: JoinHandle<Vec<String>>,
}

fn now_secs() -> f64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or_default()
}

fn format_tail(lines: &[String]) -> String {
	if lines.is_empty() {
		String::new()
	} else {
		format!("\n{}", lines.join("\n"))
	}
}

impl ScreenRecorder {
	/// Spawns ffmpeg writing to `output` and starts the page screencast.
	///
	/// # Errors
	///
	/// Returns [`Error::Recorder`] if ffmpeg cannot be spawned.
	pub async fn start(page: &Page, output: &Path, options: &RecorderOptions, viewport: &Viewport) -> Result<Self> {
		if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await?;
		}
		if options.follow_new_tab {
			tracing::debug!("followNewTab has no effect on a single-tab session");
		}

		let program = options
			.ffmpeg_path
			.clone()
			.unwrap_or_else(|| PathBuf::from("ffmpeg"));
		let args = ffmpeg_args(options, output);
		tracing::debug!(program = %program.display(), ?args, "Spawning encoder");

		let mut encoder = Command::new(&program)
			.args(&args)
			.stdin(Stdio::piped())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::Recorder(format!("failed to spawn {}: {}", program.display(), e)))?;

		let stdin = encoder
			.stdin
			.take()
			.ok_or_else(|| Error::Recorder("encoder stdin was not captured".into()))?;
		let stderr = encoder
			.stderr
			.take()
			.ok_or_else(|| Error::Recorder("encoder stderr was not captured".into()))?;
		let stderr = tokio::spawn(collect_stderr(stderr));

		let events = page.events();
		let (width, height) = viewport.device_size();
		let started = page
			.command(
				"Page.startScreencast",
				serde_json::json!({
					"format": "jpeg",
					"quality": options.frame_quality,
					"maxWidth": width,
					"maxHeight": height,
					"everyNthFrame": 1,
				}),
			)
			.await;
		if let Err(e) = started {
			let _ = encoder.start_kill();
			return Err(e);
		}

		let (stop_tx, stop_rx) = oneshot::channel();
		let pump = tokio::spawn(pump_frames(page.clone(), events, stdin, FramePacer::new(options.fps), stop_rx));

		tracing::info!(target: "webcast", output = %output.display(), fps = options.fps, "Recording started");

		Ok(Self {
			page: page.clone(),
			output: output.to_path_buf(),
			encoder,
			stop_tx: Some(stop_tx),
			pump,
			stderr,
		})
	}

	pub fn output(&self) -> &Path {
		&self.output
	}

	/// Stops the screencast and waits for ffmpeg to finish the file.
	///
	/// # Errors
	///
	/// Returns [`Error::Recorder`] if writing frames failed or ffmpeg exits
	/// unsuccessfully. The error carries the tail of ffmpeg's stderr.
	pub async fn stop(mut self) -> Result<()> {
		if let Err(e) = self
			.page
			.command("Page.stopScreencast", serde_json::json!({}))
			.await
		{
			tracing::debug!(error = %e, "Page.stopScreencast");
		}

		if let Some(stop_tx) = self.stop_tx.take() {
			let _ = stop_tx.send(());
		}
		let pumped = match (&mut self.pump).await {
			Ok(result) => result,
			Err(e) => Err(Error::Recorder(format!("frame pump panicked: {e}"))),
		};

		let status = self.wait_encoder().await;
		let tail = (&mut self.stderr).await.unwrap_or_default();

		let frames = pumped?;
		match status {
			Ok(status) if status.success() => {
				tracing::info!(target: "webcast", output = %self.output.display(), frames, "Recording saved");
				Ok(())
			}
			Ok(status) => Err(Error::Recorder(format!("ffmpeg exited with {}{}", status, format_tail(&tail)))),
			Err(e) => Err(e),
		}
	}

	async fn wait_encoder(&mut self) -> Result<ExitStatus> {
		match tokio::time::timeout(ENCODER_EXIT_TIMEOUT, self.encoder.wait()).await {
			Ok(status) => Ok(status?),
			Err(_) => {
				let _ = self.encoder.start_kill();
				Err(Error::Recorder(format!(
					"ffmpeg did not exit within {}s",
					ENCODER_EXIT_TIMEOUT.as_secs()
				)))
			}
		}
	}
}

impl Drop for ScreenRecorder {
	fn drop(&mut self) {
		self.pump.abort();
	}
}

async fn write_repeated(stdin: &mut ChildStdin, frame: &[u8], times: u64) -> Result<()> {
	for _ in 0..times {
		stdin
			.write_all(frame)
			.await
			.map_err(|e| Error::Recorder(format!("failed to write frame to ffmpeg: {e}")))?;
	}
	Ok(())
}

async fn pump_frames(
	page: Page,
	mut events: PageEvents,
	mut stdin: ChildStdin,
	mut pacer: FramePacer,
	mut stop_rx: oneshot::Receiver<()>,
) -> Result<u64> {
	let mut last_frame: Option<(f64, Instant)> = None;
	loop {
		let event = tokio::select! {
			biased;
			_ = &mut stop_rx => break,
			event = events.next() => match event {
				Some(event) => event,
				None => break,
			},
		};
		if event.method != "Page.screencastFrame" {
			continue;
		}

		let frame: ScreencastFrame = match serde_json::from_value(event.params) {
			Ok(frame) => frame,
			Err(e) => {
				tracing::warn!(error = %e, "Malformed screencast frame");
				continue;
			}
		};
		if let Err(e) = page
			.command(
				"Page.screencastFrameAck",
				serde_json::json!({ "sessionId": frame.session_id }),
			)
			.await
		{
			tracing::debug!(error = %e, "Page.screencastFrameAck");
		}

		let bytes = match frame.decode() {
			Ok(bytes) => bytes,
			Err(e) => {
				tracing::warn!(error = %e, "Undecodable screencast frame");
				continue;
			}
		};
		let timestamp = frame.metadata.timestamp.unwrap_or_else(now_secs);
		last_frame = Some((timestamp, Instant::now()));
		if let Some((previous, times)) = pacer.push(timestamp, bytes) {
			write_repeated(&mut stdin, &previous, times).await?;
		}
	}

	// extend the last frame on the browser's clock up to the stop request
	let end = last_frame.map_or(0.0, |(timestamp, seen)| timestamp + seen.elapsed().as_secs_f64());
	if let Some((last, times)) = pacer.flush(end) {
		write_repeated(&mut stdin, &last, times).await?;
	}
	stdin
		.shutdown()
		.await
		.map_err(|e| Error::Recorder(format!("failed to close ffmpeg stdin: {e}")))?;
	Ok(pacer.written())
}

async fn collect_stderr(stderr: ChildStderr) -> Vec<String> {
	let mut lines = BufReader::new(stderr).lines();
	let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
	while let Ok(Some(line)) = lines.next_line().await {
		tracing::trace!(target: "webcast::ffmpeg", "{}", line);
		if tail.len() == STDERR_TAIL_LINES {
			tail.pop_front();
		}
		tail.push_back(line);
	}
	tail.into()
}
