use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn no_flags_leaves_everything_to_config() {
	let cli = Cli::try_parse_from(["webcast"]).unwrap();
	assert_eq!(cli.verbose, 0);
	assert!(cli.config.is_none());
	assert!(cli.url.is_none());
	assert!(cli.width.is_none());
	assert!(!cli.headful);
}

#[test]
fn parse_overrides() {
	let cli = Cli::try_parse_from([
		"webcast",
		"--url",
		"http://localhost:8080",
		"-o",
		"out/demo.mp4",
		"--archive",
		"/tmp/app.tar.gz",
		"--width",
		"1920",
		"--height",
		"1080",
		"--scale",
		"2",
		"--headful",
		"-vv",
	])
	.unwrap();

	assert_eq!(cli.url.as_deref(), Some("http://localhost:8080"));
	assert_eq!(cli.output, Some(PathBuf::from("out/demo.mp4")));
	assert_eq!(cli.archive, Some(PathBuf::from("/tmp/app.tar.gz")));
	assert_eq!(cli.width, Some(1920));
	assert_eq!(cli.height, Some(1080));
	assert_eq!(cli.scale, Some(2.0));
	assert!(cli.headful);
	assert_eq!(cli.verbose, 2);
}

#[test]
fn rejects_non_numeric_width() {
	assert!(Cli::try_parse_from(["webcast", "--width", "wide"]).is_err());
}
