use std::path::PathBuf;

use clap::Parser;

use crate::styles::cli_styles;

/// Records the d1 walkthrough: log in, create an app, upload a build,
/// start an instance and attach a domain.
///
/// Every flag overrides the matching field of `--config`; without either the
/// built-in demo values are used.
#[derive(Parser, Debug)]
#[command(name = "webcast")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Scenario config (JSON)
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Application URL [default: http://d1.cesbo.net]
	#[arg(short, long)]
	pub url: Option<String>,

	/// Video output path [default: screen.mp4]
	#[arg(short, long, value_name = "FILE")]
	pub output: Option<PathBuf>,

	/// Build archive to upload [default: nuxt-demo.tar.gz]
	#[arg(short, long, value_name = "FILE")]
	pub archive: Option<PathBuf>,

	/// Viewport width in CSS pixels [default: 1280]
	#[arg(long, value_name = "N")]
	pub width: Option<u32>,

	/// Viewport height in CSS pixels [default: 800]
	#[arg(long, value_name = "N")]
	pub height: Option<u32>,

	/// Device scale factor [default: 4]
	#[arg(long, value_name = "F")]
	pub scale: Option<f64>,

	/// Show the browser window
	#[arg(long)]
	pub headful: bool,
}

#[cfg(test)]
mod tests;
