//! Typing cadence.
//!
//! Keystrokes are slow at both ends of a string and fastest in the middle,
//! which reads as a person settling into a word. Per-character delays are
//! fractional; [`Cadence`] accumulates them and only sleeps whole
//! milliseconds, carrying the remainder to the next character.

use std::time::Duration;

/// Base delay between keystrokes in milliseconds.
pub const TYPING_SPEED_MS: f64 = 40.0;

/// Delay for character `pos` of a string of length `len`.
///
/// `speed + (1 - sin(pos / len * PI)) * speed`: `2 * speed` at the ends,
/// `speed` in the middle.
pub fn ease_in_out(pos: usize, len: usize, speed: f64) -> f64 {
	if len == 0 {
		return 2.0 * speed;
	}
	let phase = (pos as f64 / len as f64) * std::f64::consts::PI;
	speed + (1.0 - phase.sin()) * speed
}

/// Fractional delay accumulator for one string.
#[derive(Debug, Clone)]
pub struct Cadence {
	len: usize,
	speed: f64,
	acc: f64,
}

impl Cadence {
	pub fn new(len: usize) -> Self {
		Self::with_speed(len, TYPING_SPEED_MS)
	}

	pub fn with_speed(len: usize, speed: f64) -> Self {
		Self { len, speed, acc: 0.0 }
	}

	/// Adds the delay for character `pos` and returns the whole milliseconds
	/// to sleep now, if any.
	pub fn step(&mut self, pos: usize) -> Option<Duration> {
		self.acc += ease_in_out(pos, self.len, self.speed);
		if self.acc >= 1.0 {
			let whole = self.acc.floor();
			self.acc -= whole;
			Some(Duration::from_millis(whole as u64))
		} else {
			None
		}
	}

	/// Fractional delay carried into the next step.
	pub fn carry(&self) -> f64 {
		self.acc
	}
}
