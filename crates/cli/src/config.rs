//! Scenario configuration: built-in demo values, an optional JSON file, then
//! command-line overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use webcast::{Autopad, LaunchOptions, RecorderOptions, Viewport, WebCastOptions};

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Account used when the app asks for a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
	pub login: String,
	pub password: String,
}

impl Default for Credentials {
	fn default() -> Self {
		Self {
			login: "admin".to_string(),
			password: "admin".to_string(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioConfig {
	pub url: String,
	pub output: PathBuf,
	/// Build archive uploaded in the build step.
	pub archive: PathBuf,
	pub viewport: Viewport,
	pub recorder: RecorderOptions,
	pub credentials: Credentials,
	/// Pause before each step so viewers can follow along.
	pub look_around_delay_ms: u64,
	pub headless: bool,
	/// Forward page console output to the log.
	pub forward_console: bool,
	/// Extra browser switches.
	pub browser_args: Vec<String>,
}

impl Default for ScenarioConfig {
	fn default() -> Self {
		let viewport = Viewport::new(1280, 800, 4.0);
		Self {
			url: "http://d1.cesbo.net".to_string(),
			output: PathBuf::from("screen.mp4"),
			archive: PathBuf::from("nuxt-demo.tar.gz"),
			viewport,
			recorder: RecorderOptions {
				follow_new_tab: false,
				fps: 60,
				video_crf: 18,
				video_codec: "libx264".to_string(),
				video_preset: "ultrafast".to_string(),
				autopad: Some(Autopad {
					color: "black".to_string(),
				}),
				aspect_ratio: Some(aspect_ratio(&viewport)),
				..Default::default()
			},
			credentials: Credentials::default(),
			look_around_delay_ms: 1000,
			headless: true,
			forward_console: true,
			browser_args: Vec::new(),
		}
	}
}

fn aspect_ratio(viewport: &Viewport) -> String {
	format!("{}:{}", viewport.width, viewport.height)
}

impl ScenarioConfig {
	/// Reads a JSON config; missing fields keep their demo defaults.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Config from `--config` (or defaults) with the other flags applied.
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let mut config = match &cli.config {
			Some(path) => Self::load(path)?,
			None => Self::default(),
		};
		config.apply_overrides(cli);
		Ok(config)
	}

	pub fn apply_overrides(&mut self, cli: &Cli) {
		if let Some(url) = &cli.url {
			self.url = url.clone();
		}
		if let Some(output) = &cli.output {
			self.output = output.clone();
		}
		if let Some(archive) = &cli.archive {
			self.archive = archive.clone();
		}
		if let Some(scale) = cli.scale {
			self.viewport.device_scale_factor = scale;
		}
		if cli.headful {
			self.headless = false;
		}

		if cli.width.is_some() || cli.height.is_some() {
			self.viewport.width = cli.width.unwrap_or(self.viewport.width);
			self.viewport.height = cli.height.unwrap_or(self.viewport.height);
			// a padded recording keeps the shape of the viewport
			if self.recorder.autopad.is_some() {
				self.recorder.aspect_ratio = Some(aspect_ratio(&self.viewport));
			}
		}
	}

	pub fn webcast_options(&self) -> WebCastOptions {
		let mut launch = LaunchOptions::new().headless(self.headless);
		launch.args = self.browser_args.clone();

		WebCastOptions {
			viewport: self.viewport,
			recorder: self.recorder.clone(),
			launch,
			forward_console: self.forward_console,
			..Default::default()
		}
	}
}
