//! Core protocol types used across the wire.
//!
//! These types represent primitive values and enums used in CDP commands and
//! events that the driver sends or consumes.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Mouse button for pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
	/// No button (used for plain moves)
	None,
	/// Left mouse button (default)
	#[default]
	Left,
	/// Right mouse button
	Right,
	/// Middle mouse button
	Middle,
}

/// `Input.dispatchMouseEvent` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseEventType {
	#[serde(rename = "mouseMoved")]
	Moved,
	#[serde(rename = "mousePressed")]
	Pressed,
	#[serde(rename = "mouseReleased")]
	Released,
}

/// `Input.dispatchKeyEvent` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventType {
	#[serde(rename = "keyDown")]
	Down,
	#[serde(rename = "keyUp")]
	Up,
	#[serde(rename = "char")]
	Char,
}

/// Viewport dimensions and pixel density of the emulated screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
	/// Page width in CSS pixels
	pub width: u32,
	/// Page height in CSS pixels
	pub height: u32,
	/// Device scale factor (1.0 = no scaling)
	#[serde(default = "default_scale")]
	pub device_scale_factor: f64,
}

fn default_scale() -> f64 {
	1.0
}

impl Default for Viewport {
	fn default() -> Self {
		Self {
			width: 1280,
			height: 800,
			device_scale_factor: 1.0,
		}
	}
}

impl Viewport {
	pub fn new(width: u32, height: u32, device_scale_factor: f64) -> Self {
		Self {
			width,
			height,
			device_scale_factor,
		}
	}

	/// Width and height in device pixels.
	pub fn device_size(&self) -> (u32, u32) {
		let w = (self.width as f64 * self.device_scale_factor).round() as u32;
		let h = (self.height as f64 * self.device_scale_factor).round() as u32;
		(w, h)
	}
}

/// Rendered rectangle of an element, in CSS pixels relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl BoundingBox {
	/// Builds a box from a CDP quad (`[x1,y1, x2,y2, x3,y3, x4,y4]`).
	///
	/// Returns `None` for malformed quads.
	pub fn from_quad(quad: &[f64]) -> Option<Self> {
		if quad.len() < 8 {
			return None;
		}

		let xs = [quad[0], quad[2], quad[4], quad[6]];
		let ys = [quad[1], quad[3], quad[5], quad[7]];
		let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
		let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
		let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
		let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

		Some(Self {
			x: min_x,
			y: min_y,
			width: max_x - min_x,
			height: max_y - min_y,
		})
	}

	/// True if the box has a positive area.
	pub fn is_visible(&self) -> bool {
		self.width > 0.0 && self.height > 0.0
	}

	/// Center point rounded to whole pixels.
	pub fn center(&self) -> (i64, i64) {
		let x = (self.x + self.width / 2.0).round() as i64;
		let y = (self.y + self.height / 2.0).round() as i64;
		(x, y)
	}
}

/// CSS media feature override, e.g. `prefers-color-scheme: dark`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFeature {
	pub name: String,
	pub value: String,
}

impl MediaFeature {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}

	/// Parses `name=value` or `name:value`.
	pub fn parse(s: &str) -> Option<Self> {
		let (name, value) = s.split_once('=').or_else(|| s.split_once(':'))?;
		let name = name.trim();
		let value = value.trim();
		if name.is_empty() || value.is_empty() {
			return None;
		}
		Some(Self::new(name, value))
	}
}

/// Payload of the `Page.screencastFrame` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreencastFrame {
	/// Base64-encoded JPEG image.
	pub data: String,
	pub metadata: ScreencastFrameMetadata,
	/// Frame number to acknowledge with `Page.screencastFrameAck`.
	pub session_id: i64,
}

impl ScreencastFrame {
	/// Decodes the frame image bytes.
	pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
		base64::prelude::BASE64_STANDARD.decode(&self.data)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreencastFrameMetadata {
	#[serde(default)]
	pub offset_top: f64,
	#[serde(default)]
	pub page_scale_factor: f64,
	#[serde(default)]
	pub device_width: f64,
	#[serde(default)]
	pub device_height: f64,
	/// Frame capture time in seconds since the epoch.
	#[serde(default)]
	pub timestamp: Option<f64>,
}
