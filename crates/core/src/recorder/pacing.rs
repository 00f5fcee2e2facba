//! Constant frame rate pacing for screencast frames.
//!
//! The browser only emits a frame when something repaints. Each frame is
//! held until the next one arrives and then written as many times as the
//! elapsed time covers at the target rate.

/// Turns timestamped frames into a constant-rate frame sequence.
#[derive(Debug)]
pub struct FramePacer {
	fps: f64,
	start: Option<f64>,
	last: Option<Vec<u8>>,
	written: u64,
}

impl FramePacer {
	pub fn new(fps: u32) -> Self {
		Self {
			fps: f64::from(fps.max(1)),
			start: None,
			last: None,
			written: 0,
		}
	}

	/// Output frames emitted so far.
	pub fn written(&self) -> u64 {
		self.written
	}

	fn due(&self, timestamp: f64) -> u64 {
		let start = self.start.unwrap_or(timestamp);
		((timestamp - start).max(0.0) * self.fps).floor() as u64
	}

	/// Takes a frame captured at `timestamp` (seconds).
	///
	/// Returns the previous frame and how many times to write it, if the
	/// elapsed time covers at least one output frame.
	pub fn push(&mut self, timestamp: f64, frame: Vec<u8>) -> Option<(Vec<u8>, u64)> {
		if self.start.is_none() {
			self.start = Some(timestamp);
		}

		let due = self.due(timestamp);
		let previous = self.last.replace(frame)?;
		let repeat = due.saturating_sub(self.written);
		if repeat == 0 {
			return None;
		}
		self.written = due;
		Some((previous, repeat))
	}

	/// Emits the held frame up to `end` (seconds), at least once.
	pub fn flush(&mut self, end: f64) -> Option<(Vec<u8>, u64)> {
		let last = self.last.take()?;
		let repeat = self.due(end).saturating_sub(self.written).max(1);
		self.written += repeat;
		Some((last, repeat))
	}
}
