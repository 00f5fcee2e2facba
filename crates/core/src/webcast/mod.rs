//! [`WebCast`], the scripted session driver.
//!
//! A session owns one browser, one page, the synthetic cursor and an optional
//! screen recording. Every operation runs to completion before the next one
//! starts, so the recording shows each step as it happens.
//!
//! ```ignore
//! let mut cast = WebCast::new(WebCastOptions::default());
//! cast.start().await?;
//! cast.screencast("screen.mp4").await?;
//! cast.goto("http://localhost:8080/").await?;
//! cast.text_type("#login", "admin").await?;
//! cast.element_click("button[type=submit]").await?;
//! cast.close().await?;
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use webcast_protocol::{BoundingBox, DEFAULT_TIMEOUT_MS, LaunchOptions, MediaFeature, RecorderOptions, Viewport};
use webcast_runtime::{Error, Result};

use crate::browser::Browser;
use crate::cadence::Cadence;
use crate::cursor::{self, CursorPosition, DEFAULT_CURSOR_BACKGROUND, DEFAULT_CURSOR_SIZE};
use crate::page::{ConsoleSubscription, Page};
use crate::recorder::{RecorderState, ScreenRecorder};
use crate::splash::splash_script;

/// Pause after clicks, selects and scrolls so the recording can catch up.
const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Pause after the recorder starts, before the first step.
const SCREENCAST_WARMUP: Duration = Duration::from_millis(100);

/// Session options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebCastOptions {
	pub viewport: Viewport,
	/// Diameter of the cursor marker in CSS pixels.
	pub cursor_size: u32,
	/// CSS background of the cursor marker.
	pub cursor_background: String,
	pub recorder: RecorderOptions,
	pub launch: LaunchOptions,
	/// Forward page `console.*` calls to `tracing` under `webcast::console`.
	pub forward_console: bool,
	/// CSS media features emulated for the whole session.
	pub media_features: Vec<MediaFeature>,
}

impl Default for WebCastOptions {
	fn default() -> Self {
		Self {
			viewport: Viewport::default(),
			cursor_size: DEFAULT_CURSOR_SIZE,
			cursor_background: DEFAULT_CURSOR_BACKGROUND.to_string(),
			recorder: RecorderOptions::default(),
			launch: LaunchOptions::default(),
			forward_console: false,
			media_features: Vec::new(),
		}
	}
}

/// Lifecycle of a [`WebCast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	/// Constructed, no browser yet.
	Created,
	/// Browser and page are up, nothing loaded.
	Started,
	/// At least one [`WebCast::goto`] completed.
	Navigated,
	/// Terminal.
	Closed,
}

/// Scripted browser session with a visible cursor and optional recording.
pub struct WebCast {
	options: WebCastOptions,
	state: SessionState,
	browser: Option<Browser>,
	page: Option<Page>,
	cursor: CursorPosition,
	recorder: RecorderState,
	console: Option<ConsoleSubscription>,
}

impl WebCast {
	pub fn new(options: WebCastOptions) -> Self {
		let cursor = CursorPosition::offscreen(options.cursor_size);
		Self {
			options,
			state: SessionState::Created,
			browser: None,
			page: None,
			cursor,
			recorder: RecorderState::Idle,
			console: None,
		}
	}

	/// Launches the browser and opens the session page.
	pub async fn start(&mut self) -> Result<()> {
		self.check_startable()?;
		let browser = Browser::launch(&self.options.launch).await?;
		self.start_with(browser).await
	}

	/// Opens the session page on an already connected browser.
	pub async fn start_with(&mut self, browser: Browser) -> Result<()> {
		self.check_startable()?;

		// kept even if page setup fails so close() can still tear it down
		let browser = self.browser.insert(browser);
		let page = browser.new_page().await?;
		page.set_viewport(&self.options.viewport).await?;
		if !self.options.media_features.is_empty() {
			page.emulate_media_features(&self.options.media_features).await?;
		}
		if self.options.forward_console {
			self.console = Some(page.on_console(|msg| msg.forward_to_tracing()));
		}

		tracing::info!(
			target: "webcast",
			width = self.options.viewport.width,
			height = self.options.viewport.height,
			scale = self.options.viewport.device_scale_factor,
			"Session started"
		);
		self.page = Some(page);
		self.state = SessionState::Started;
		Ok(())
	}

	fn check_startable(&self) -> Result<()> {
		match self.state {
			SessionState::Created => Ok(()),
			SessionState::Closed => Err(Error::SessionClosed("start")),
			_ => Err(Error::InvalidArgument("session already started".into())),
		}
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn options(&self) -> &WebCastOptions {
		&self.options
	}

	/// The session page, once started.
	pub fn page(&self) -> Option<&Page> {
		self.page.as_ref()
	}

	/// Where the synthetic cursor currently is.
	pub fn cursor_position(&self) -> CursorPosition {
		self.cursor
	}

	pub fn is_recording(&self) -> bool {
		self.recorder.is_recording()
	}

	fn active_page(&self, op: &'static str) -> Result<&Page> {
		match (self.state, &self.page) {
			(SessionState::Closed, _) => Err(Error::SessionClosed(op)),
			(_, Some(page)) => Ok(page),
			(_, None) => Err(Error::InvalidArgument(format!("cannot {op} before start()"))),
		}
	}

	/// Navigates, waits for the network to settle and installs the cursor.
	pub async fn goto(&mut self, url: &str) -> Result<()> {
		let page = self.active_page("goto")?;
		tracing::info!(target: "webcast", url, "Navigating");
		page.goto(url).await?;
		self.wait().await?;
		self.cursor_init().await?;
		self.state = SessionState::Navigated;
		Ok(())
	}

	/// Focuses `body` and waits for network idle.
	pub async fn wait(&self) -> Result<()> {
		let page = self.active_page("wait")?;
		page.focus("body").await?;
		page.wait_for_network_idle().await
	}

	pub async fn sleep(&self, ms: u64) {
		tokio::time::sleep(Duration::from_millis(ms)).await;
	}

	async fn cursor_init(&mut self) -> Result<()> {
		let page = self.active_page("goto")?;
		page.evaluate(&cursor::install_script(self.options.cursor_size, &self.options.cursor_background))
			.await?;
		self.cursor = CursorPosition::offscreen(self.options.cursor_size);
		Ok(())
	}

	/// True if `selector` matches an element.
	pub async fn element_exists(&self, selector: &str) -> Result<bool> {
		let page = self.active_page("query elements")?;
		Ok(page.query_selector(selector).await?.is_some())
	}

	/// Bounding box of the first match.
	///
	/// # Errors
	///
	/// [`Error::ElementNotFound`] when nothing matches and
	/// [`Error::ElementNotVisible`] when the match has no render box.
	pub async fn element_get_box(&self, selector: &str) -> Result<BoundingBox> {
		let page = self.active_page("query elements")?;
		let node = page
			.query_selector(selector)
			.await?
			.ok_or_else(|| Error::ElementNotFound(selector.to_string()))?;
		page.bounding_box(node)
			.await?
			.ok_or_else(|| Error::ElementNotVisible(selector.to_string()))
	}

	async fn cursor_to_element(&mut self, selector: &str) -> Result<()> {
		let (x, y) = self.element_get_box(selector).await?.center();
		self.cursor_move(x, y).await?;
		self.cursor_click().await
	}

	/// Moves the cursor to the element center, clicks and waits for the page.
	pub async fn element_click(&mut self, selector: &str) -> Result<()> {
		tracing::debug!(target: "webcast", selector, "Click");
		self.cursor_to_element(selector).await?;
		self.wait().await?;
		tokio::time::sleep(SETTLE_DELAY).await;
		Ok(())
	}

	/// Clicks a `<select>` and picks `value`.
	///
	/// `value` is not checked against the options; the page decides.
	pub async fn element_select(&mut self, selector: &str, value: &str) -> Result<()> {
		tracing::debug!(target: "webcast", selector, value, "Select");
		self.cursor_to_element(selector).await?;
		self.active_page("select")?
			.select_option(selector, &[value])
			.await?;
		tokio::time::sleep(SETTLE_DELAY).await;
		Ok(())
	}

	/// Focuses `selector` and types `text` one key at a time.
	pub async fn text_type(&self, selector: &str, text: &str) -> Result<()> {
		let page = self.active_page("type")?;
		tracing::debug!(target: "webcast", selector, len = text.chars().count(), "Type");
		page.focus(selector).await?;

		let chars: Vec<char> = text.chars().collect();
		let mut cadence = Cadence::new(chars.len());
		for (pos, ch) in chars.into_iter().enumerate() {
			page.type_char(ch).await?;
			if let Some(pause) = cadence.step(pos) {
				tokio::time::sleep(pause).await;
			}
		}
		Ok(())
	}

	/// Smoothly scrolls the element to the top. Missing elements are ignored.
	pub async fn element_scroll_into_view(&self, selector: &str) -> Result<()> {
		let page = self.active_page("scroll")?;
		if !page.scroll_into_view(selector).await? {
			tracing::debug!(target: "webcast", selector, "Nothing to scroll to");
		}
		tokio::time::sleep(SETTLE_DELAY).await;
		Ok(())
	}

	/// Clicks a file input, then attaches `file` to it.
	pub async fn element_file_select(&mut self, selector: &str, file: impl AsRef<Path>) -> Result<()> {
		self.element_click(selector).await?;
		let page = self.active_page("upload")?;
		let node = page
			.query_selector(selector)
			.await?
			.ok_or_else(|| Error::ElementNotFound(selector.to_string()))?;
		page.set_input_file(node, file.as_ref()).await?;
		tracing::debug!(target: "webcast", selector, file = %file.as_ref().display(), "File selected");
		Ok(())
	}

	/// Waits for `selector` to appear, 30 s unless `timeout` says otherwise.
	///
	/// # Errors
	///
	/// [`Error::TimeoutExceeded`] on expiry.
	pub async fn element_wait_for(&self, selector: &str, timeout: Option<Duration>) -> Result<()> {
		let page = self.active_page("wait for elements")?;
		let timeout = timeout.unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS));
		page.wait_for_selector(selector, timeout).await?;
		Ok(())
	}

	/// Attribute of the first match; `None` if absent or empty.
	pub async fn element_get_attribute(&self, selector: &str, attribute: &str) -> Result<Option<String>> {
		let page = self.active_page("read attributes")?;
		page.get_attribute(selector, attribute).await
	}

	/// Starts recording the page into `output`.
	pub async fn screencast(&mut self, output: impl AsRef<Path>) -> Result<()> {
		let page = self.active_page("screencast")?;
		if self.recorder.is_recording() {
			return Err(Error::InvalidArgument("a recording is already in progress".into()));
		}

		let recorder = ScreenRecorder::start(page, output.as_ref(), &self.options.recorder, &self.options.viewport).await?;
		self.recorder = RecorderState::Recording(recorder);
		tokio::time::sleep(SCREENCAST_WARMUP).await;
		Ok(())
	}

	/// Stops the recording, if any. Safe to call repeatedly and after close.
	pub async fn stop(&mut self) -> Result<()> {
		match self.recorder.take() {
			Some(recorder) => recorder.stop().await,
			None => Ok(()),
		}
	}

	/// Stops the recording, then shuts the browser down. Idempotent.
	pub async fn close(&mut self) -> Result<()> {
		if self.state == SessionState::Closed {
			return Ok(());
		}

		let stopped = self.stop().await;
		self.state = SessionState::Closed;
		self.console = None;
		self.page = None;
		let closed = match self.browser.take() {
			Some(browser) => browser.close().await,
			None => Ok(()),
		};
		tracing::info!(target: "webcast", "Session closed");

		stopped.and(closed)
	}

	/// Puts the cursor at `(x, y)` and moves the real pointer there.
	pub async fn cursor_move(&mut self, x: i64, y: i64) -> Result<()> {
		let page = self.active_page("move the cursor")?;
		page.mouse_move(x, y).await?;
		self.cursor = CursorPosition::new(x, y);
		Ok(())
	}

	/// Pulses the marker at the cursor and clicks there.
	pub async fn cursor_click(&self) -> Result<()> {
		let page = self.active_page("click")?;
		let size = self.options.cursor_size;
		let shown = page.evaluate(&cursor::pulse_script(self.cursor, size)).await?;
		if shown != serde_json::Value::Bool(true) {
			// the page replaced its document since goto
			page.evaluate(&cursor::install_script(size, &self.options.cursor_background))
				.await?;
			page.evaluate(&cursor::pulse_script(self.cursor, size)).await?;
		}

		tokio::time::sleep(SETTLE_DELAY).await;
		page.mouse_down(self.cursor.x, self.cursor.y).await?;
		page.mouse_up(self.cursor.x, self.cursor.y).await?;
		tokio::time::sleep(SETTLE_DELAY).await;
		Ok(())
	}

	/// Replaces the page with a title card and holds it for `duration`.
	pub async fn splash(&self, title: &str, subtitle: &str, duration: Duration) -> Result<()> {
		let page = self.active_page("splash")?;
		page.evaluate(&splash_script(title, subtitle)).await?;
		tokio::time::sleep(duration).await;
		Ok(())
	}

	/// Overrides CSS media features from now on.
	pub async fn emulate_media_features(&self, features: &[MediaFeature]) -> Result<()> {
		self.active_page("emulate media")?
			.emulate_media_features(features)
			.await
	}
}

impl Drop for WebCast {
	fn drop(&mut self) {
		if self.state == SessionState::Closed {
			return;
		}
		if let Some(browser) = self.browser.as_mut() {
			tracing::warn!(target: "webcast", "WebCast dropped without close(); killing browser");
			browser.kill();
		}
	}
}

#[cfg(test)]
mod tests;
