//! The binary exits 1 with a readable message on any failure.

use std::process::{Command, Output};

fn webcast(args: &[&str]) -> Output {
	Command::new(env!("CARGO_BIN_EXE_webcast"))
		.args(args)
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to execute webcast")
}

#[test]
fn missing_config_exits_1() {
	let dir = tempfile::tempdir().unwrap();
	let config = dir.path().join("absent.json");
	let output = webcast(&["--config", config.to_str().unwrap()]);

	assert_eq!(output.status.code(), Some(1));
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("cannot read config"), "stderr: {stderr}");
	assert!(!String::from_utf8_lossy(&output.stdout).contains("Done"));
}

#[test]
fn malformed_config_exits_1() {
	let dir = tempfile::tempdir().unwrap();
	let config = dir.path().join("broken.json");
	std::fs::write(&config, "{ \"fps\": ").unwrap();
	let output = webcast(&["-c", config.to_str().unwrap()]);

	assert_eq!(output.status.code(), Some(1));
	assert!(String::from_utf8_lossy(&output.stderr).contains("invalid config"));
}

#[test]
fn missing_archive_exits_1_before_launching() {
	let dir = tempfile::tempdir().unwrap();
	let archive = dir.path().join("nuxt-demo.tar.gz");
	let output = webcast(&["--archive", archive.to_str().unwrap(), "--url", "http://127.0.0.1:9"]);

	assert_eq!(output.status.code(), Some(1));
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("build archive not found"), "stderr: {stderr}");
	assert!(stderr.contains("walkthrough of http://127.0.0.1:9 failed"), "stderr: {stderr}");
}

#[test]
fn help_lists_the_demo_defaults() {
	let output = webcast(&["--help"]);
	assert!(output.status.success());
	let stdout = String::from_utf8_lossy(&output.stdout);
	assert!(stdout.contains("http://d1.cesbo.net"));
	assert!(stdout.contains("--headful"));
}
