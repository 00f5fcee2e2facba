//! Browser executable discovery
//!
//! Locates a Chromium-family browser that speaks the DevTools protocol.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable checked first for an explicit browser path.
pub const WEBCAST_CHROME_PATH: &str = "WEBCAST_CHROME_PATH";

/// Conventional variable honored by most Chrome tooling.
pub const CHROME_PATH: &str = "CHROME_PATH";

#[cfg(not(windows))]
const PATH_NAMES: &[&str] = &[
	"google-chrome",
	"google-chrome-stable",
	"chromium",
	"chromium-browser",
	"chrome",
	"microsoft-edge",
	"msedge",
];

#[cfg(windows)]
const PATH_NAMES: &[&str] = &["chrome.exe", "msedge.exe", "chromium.exe"];

#[cfg(target_os = "macos")]
const COMMON_LOCATIONS: &[&str] = &[
	"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
	"/Applications/Chromium.app/Contents/MacOS/Chromium",
	"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(all(unix, not(target_os = "macos")))]
const COMMON_LOCATIONS: &[&str] = &[
	"/usr/bin/google-chrome",
	"/usr/bin/chromium",
	"/usr/bin/chromium-browser",
	"/snap/bin/chromium",
	"/opt/google/chrome/chrome",
];

#[cfg(windows)]
const COMMON_LOCATIONS: &[&str] = &[
	"C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
	"C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
	"C:\\Program Files (x86)\\Microsoft\\Edge\\Application\\msedge.exe",
];

/// Get the path to a browser executable
///
/// Searches in the following order:
/// 1. `explicit` (from [`LaunchOptions::executable_path`])
/// 2. `WEBCAST_CHROME_PATH` environment variable
/// 3. `CHROME_PATH` environment variable
/// 4. Well-known executable names on `PATH`
/// 5. Chromium builds downloaded into the Playwright browser cache
/// 6. Platform-specific install locations
///
/// An explicit path that does not exist is an error rather than a fallthrough,
/// so a typo in configuration is not silently replaced by another browser.
///
/// # Errors
///
/// Returns [`Error::BrowserNotFound`] if no candidate exists, or
/// [`Error::LaunchFailed`] if `explicit` points at a missing file.
///
/// [`LaunchOptions::executable_path`]: webcast_protocol::LaunchOptions::executable_path
pub fn get_browser_executable(explicit: Option<&Path>) -> Result<PathBuf> {
	if let Some(path) = explicit {
		if is_executable(path) {
			return Ok(path.to_path_buf());
		}
		return Err(Error::LaunchFailed(format!("browser executable {} does not exist", path.display())));
	}

	for var in [WEBCAST_CHROME_PATH, CHROME_PATH] {
		if let Some(path) = std::env::var_os(var).map(PathBuf::from) {
			let usable = is_executable(&path);
			debug_candidate(var, &path, usable);
			if usable {
				return Ok(path);
			}
		}
	}

	if let Some(path) = first_resolved(PATH_NAMES, |name| which::which(name)) {
		debug_candidate("PATH", &path, true);
		return Ok(path);
	}

	if let Some(cache) = dirs::cache_dir() {
		if let Some(path) = find_in_playwright_cache(&cache.join("ms-playwright")) {
			debug_candidate("playwright cache", &path, true);
			return Ok(path);
		}
	}

	for location in COMMON_LOCATIONS {
		let path = PathBuf::from(location);
		if is_executable(&path) {
			debug_candidate("common location", &path, true);
			return Ok(path);
		}
	}

	Err(Error::BrowserNotFound)
}

/// Resolves `names` in priority order, returning the first that `lookup`
/// finds.
fn first_resolved<F>(names: &[&str], lookup: F) -> Option<PathBuf>
where
	F: Fn(&str) -> which::Result<PathBuf>,
{
	names.iter().find_map(|name| lookup(name).ok())
}

/// Finds the newest `chromium-<rev>` build in a Playwright browser cache.
fn find_in_playwright_cache(root: &Path) -> Option<PathBuf> {
	let mut builds: Vec<(u64, PathBuf)> = std::fs::read_dir(root)
		.ok()?
		.filter_map(|entry| entry.ok())
		.filter_map(|entry| {
			let name = entry.file_name();
			let revision = name.to_str()?.strip_prefix("chromium-")?.parse::<u64>().ok()?;
			Some((revision, entry.path()))
		})
		.collect();
	builds.sort_by(|a, b| b.0.cmp(&a.0));

	builds.into_iter().find_map(|(_, dir)| {
		playwright_binary_suffixes()
			.iter()
			.map(|suffix| dir.join(suffix))
			.find(|candidate| is_executable(candidate))
	})
}

fn playwright_binary_suffixes() -> &'static [&'static str] {
	if cfg!(target_os = "macos") {
		&[
			"chrome-mac/Chromium.app/Contents/MacOS/Chromium",
			"chrome-mac-arm64/Chromium.app/Contents/MacOS/Chromium",
		]
	} else if cfg!(windows) {
		&["chrome-win/chrome.exe", "chrome-win64/chrome.exe"]
	} else {
		&["chrome-linux/chrome", "chrome-linux64/chrome"]
	}
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
	use std::os::unix::fs::PermissionsExt;

	std::fs::metadata(path)
		.map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
		.unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
	path.is_file()
}

fn debug_candidate(label: &str, path: &Path, usable: bool) {
	debug!(target: "webcast", source = label, path = %path.display(), usable, "browser candidate");
}
