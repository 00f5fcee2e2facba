//! Option structs for launching the browser and recording the page.
//!
//! These types are deserialized from user configuration and passed through
//! to the runtime and the recorder.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default timeout in milliseconds for waits and commands.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Quiet window after the last network request before a page counts as idle.
pub const NETWORK_IDLE_MS: u64 = 500;

/// Browser launch options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchOptions {
	/// Explicit browser executable; discovered automatically when absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub executable_path: Option<PathBuf>,
	/// Run without a visible window.
	pub headless: bool,
	/// Extra command-line switches appended after the defaults.
	pub args: Vec<String>,
	/// How long to wait for the DevTools endpoint to be announced.
	pub launch_timeout_ms: u64,
	/// Profile directory; a temporary one is created when absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_data_dir: Option<PathBuf>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable_path: None,
			headless: true,
			args: Vec::new(),
			launch_timeout_ms: 20_000,
			user_data_dir: None,
		}
	}
}

impl LaunchOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn executable_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.executable_path = Some(path.into());
		self
	}

	pub fn headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}
}

/// Padding applied when the output aspect ratio differs from the viewport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Autopad {
	/// Any color ffmpeg understands (`black`, `#202020`, ...).
	pub color: String,
}

/// Screen recording options.
///
/// Mirrors the option bag of common page recorders. Values are handed to the
/// encoder without interpretation beyond building its command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecorderOptions {
	/// Keep recording when the page opens a new tab (single-page driver: ignored).
	pub follow_new_tab: bool,
	/// Output frame rate.
	pub fps: u32,
	/// Constant rate factor (lower is better quality).
	pub video_crf: u32,
	/// ffmpeg video codec name.
	pub video_codec: String,
	/// ffmpeg encoder preset.
	pub video_preset: String,
	/// Target bitrate in kbit/s.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub video_bitrate: Option<u32>,
	/// Output pixel format.
	pub video_pixel_format: String,
	/// Pad instead of stretch when `aspect_ratio` is set.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub autopad: Option<Autopad>,
	/// Output aspect ratio as `W:H`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub aspect_ratio: Option<String>,
	/// JPEG quality of captured frames (0-100).
	pub frame_quality: u8,
	/// Explicit ffmpeg binary; `ffmpeg` on `PATH` when absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ffmpeg_path: Option<PathBuf>,
}

impl Default for RecorderOptions {
	fn default() -> Self {
		Self {
			follow_new_tab: false,
			fps: 25,
			video_crf: 23,
			video_codec: "libx264".to_string(),
			video_preset: "ultrafast".to_string(),
			video_bitrate: None,
			video_pixel_format: "yuv420p".to_string(),
			autopad: None,
			aspect_ratio: None,
			frame_quality: 90,
			ffmpeg_path: None,
		}
	}
}

impl RecorderOptions {
	/// Parses `aspect_ratio` into its two terms.
	pub fn aspect_ratio_terms(&self) -> Option<(u32, u32)> {
		let (w, h) = self.aspect_ratio.as_deref()?.split_once(':')?;
		let w: u32 = w.trim().parse().ok()?;
		let h: u32 = h.trim().parse().ok()?;
		(w > 0 && h > 0).then_some((w, h))
	}
}
