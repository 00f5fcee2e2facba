//! Synthetic cursor overlay.
//!
//! Headless screencasts do not show the OS pointer, so a translucent dot is
//! injected into the page and pulsed wherever a click lands. The dot is purely
//! visual: it ignores pointer events and real input is dispatched separately.

use serde::{Deserialize, Serialize};

/// Element id, class name and keyframes prefix of the overlay.
pub const CURSOR_ID: &str = "webcast-cursor";

/// How long the marker stays visible after a pulse.
pub const CURSOR_VISIBLE_MS: u64 = 500;

/// Default marker diameter in CSS pixels.
pub const DEFAULT_CURSOR_SIZE: u32 = 20;

/// Default marker fill.
pub const DEFAULT_CURSOR_BACKGROUND: &str = "rgba(0, 0, 0, 0.5)";

/// Position of the synthetic cursor in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
	pub x: i64,
	pub y: i64,
}

impl CursorPosition {
	pub fn new(x: i64, y: i64) -> Self {
		Self { x, y }
	}

	/// Just outside the top-left corner, where the cursor rests after navigation.
	pub fn offscreen(size: u32) -> Self {
		let size = i64::from(size);
		Self { x: -size, y: -size }
	}
}

fn keyframes_name() -> String {
	format!("{CURSOR_ID}-bounce")
}

fn js_string(value: &str) -> String {
	serde_json::Value::String(value.to_string()).to_string()
}

/// Expression that installs the overlay, or hides it if already present.
pub fn install_script(size: u32, background: &str) -> String {
	let css = format!(
		"@keyframes {keyframes} {{\n\
		 \t0%, 100% {{ transform: scale(1); }}\n\
		 \t25% {{ transform: scale(1.25); }}\n\
		 \t50% {{ transform: scale(0.75); }}\n\
		 \t75% {{ transform: scale(1.15); }}\n\
		 }}\n\
		 .{id} {{\n\
		 \tposition: fixed;\n\
		 \tz-index: 9999;\n\
		 \tpointer-events: none;\n\
		 \tanimation: {keyframes} 0.5s;\n\
		 \tanimation-iteration-count: 1;\n\
		 \tbackground: {background};\n\
		 \twidth: {size}px;\n\
		 \theight: {size}px;\n\
		 \tborder-radius: 50%;\n\
		 }}",
		keyframes = keyframes_name(),
		id = CURSOR_ID,
	);

	format!(
		"(() => {{\n\
		 \tconst id = {id};\n\
		 \tlet cursor = document.getElementById(id);\n\
		 \tif (cursor) {{\n\
		 \t\tcursor.style.display = 'none';\n\
		 \t\treturn false;\n\
		 \t}}\n\
		 \tconst style = document.createElement('style');\n\
		 \tstyle.textContent = {css};\n\
		 \tcursor = document.createElement('div');\n\
		 \tcursor.id = id;\n\
		 \tcursor.className = id;\n\
		 \tcursor.style.display = 'none';\n\
		 \t(document.head || document.documentElement).append(style);\n\
		 \t(document.body || document.documentElement).append(cursor);\n\
		 \treturn true;\n\
		 }})()",
		id = js_string(CURSOR_ID),
		css = js_string(&css),
	)
}

/// Expression that shows the marker centered on `at` and restarts its bounce.
///
/// Evaluates to `false` when the overlay is missing (e.g. the page navigated
/// on its own since the last install).
pub fn pulse_script(at: CursorPosition, size: u32) -> String {
	let r = f64::from(size) / 2.0;
	format!(
		"(() => {{\n\
		 \tconst cursor = document.getElementById({id});\n\
		 \tif (!cursor) return false;\n\
		 \tcursor.style.left = '{left}px';\n\
		 \tcursor.style.top = '{top}px';\n\
		 \tcursor.style.animation = 'none';\n\
		 \tvoid cursor.offsetWidth;\n\
		 \tcursor.style.animation = '';\n\
		 \tcursor.style.display = 'block';\n\
		 \tclearTimeout(cursor._webcastHide);\n\
		 \tcursor._webcastHide = setTimeout(() => {{ cursor.style.display = 'none'; }}, {hide});\n\
		 \treturn true;\n\
		 }})()",
		id = js_string(CURSOR_ID),
		left = at.x as f64 - r,
		top = at.y as f64 - r,
		hide = CURSOR_VISIBLE_MS,
	)
}
