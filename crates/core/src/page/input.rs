//! Keyboard and mouse input methods for [`Page`].

use serde_json::Value;
use webcast_protocol::{KeyEventType, MouseButton, MouseEventType};
use webcast_runtime::Result;

use super::Page;

/// Whether a character can be sent as a keystroke. Astral characters such as
/// emoji arrive as surrogate pairs and have to be inserted as text.
pub fn is_keyable(ch: char) -> bool {
	ch.len_utf16() == 1
}

/// `Input.dispatchKeyEvent` params for typing one character.
pub fn key_events(ch: char) -> [Value; 2] {
	match ch {
		'\n' | '\r' => [
			serde_json::json!({
				"type": KeyEventType::Down, "key": "Enter", "code": "Enter",
				"text": "\r", "unmodifiedText": "\r", "windowsVirtualKeyCode": 13,
			}),
			serde_json::json!({ "type": KeyEventType::Up, "key": "Enter", "code": "Enter", "windowsVirtualKeyCode": 13 }),
		],
		'\t' => [
			serde_json::json!({ "type": KeyEventType::Down, "key": "Tab", "code": "Tab", "windowsVirtualKeyCode": 9 }),
			serde_json::json!({ "type": KeyEventType::Up, "key": "Tab", "code": "Tab", "windowsVirtualKeyCode": 9 }),
		],
		_ => {
			let text = ch.to_string();
			[
				serde_json::json!({ "type": KeyEventType::Down, "key": text, "text": text, "unmodifiedText": text }),
				serde_json::json!({ "type": KeyEventType::Up, "key": text }),
			]
		}
	}
}

fn mouse_event(kind: MouseEventType, x: i64, y: i64, button: MouseButton) -> Value {
	let click_count = match kind {
		MouseEventType::Moved => 0,
		_ => 1,
	};
	serde_json::json!({
		"type": kind,
		"x": x,
		"y": y,
		"button": button,
		"clickCount": click_count,
	})
}

impl Page {
	/// Moves the real pointer.
	pub async fn mouse_move(&self, x: i64, y: i64) -> Result<()> {
		self.command(
			"Input.dispatchMouseEvent",
			mouse_event(MouseEventType::Moved, x, y, MouseButton::None),
		)
		.await?;
		Ok(())
	}

	/// Presses the left button at `(x, y)`.
	pub async fn mouse_down(&self, x: i64, y: i64) -> Result<()> {
		self.command(
			"Input.dispatchMouseEvent",
			mouse_event(MouseEventType::Pressed, x, y, MouseButton::Left),
		)
		.await?;
		Ok(())
	}

	/// Releases the left button at `(x, y)`.
	pub async fn mouse_up(&self, x: i64, y: i64) -> Result<()> {
		self.command(
			"Input.dispatchMouseEvent",
			mouse_event(MouseEventType::Released, x, y, MouseButton::Left),
		)
		.await?;
		Ok(())
	}

	/// Types one character into the focused element.
	pub async fn type_char(&self, ch: char) -> Result<()> {
		if !is_keyable(ch) {
			let mut buf = [0u8; 4];
			return self.insert_text(ch.encode_utf8(&mut buf)).await;
		}
		for event in key_events(ch) {
			self.command("Input.dispatchKeyEvent", event).await?;
		}
		Ok(())
	}

	/// Inserts text at the caret without key events.
	pub async fn insert_text(&self, text: &str) -> Result<()> {
		self.command("Input.insertText", serde_json::json!({ "text": text })).await?;
		Ok(())
	}
}
