//! Scripted Chromium sessions for screen-recorded product walkthroughs.
//!
//! [`WebCast`] drives one page over the Chrome DevTools Protocol: it
//! navigates, clicks and types like a person would, shows a synthetic cursor
//! where clicks land, and records the page to a video file through ffmpeg.
//!
//! Lower layers are public too: [`Browser`] and [`Page`] for direct protocol
//! access, [`recorder`] for recording a page without the driver.

pub mod browser;
pub mod cadence;
pub mod cursor;
pub mod page;
pub mod recorder;
pub mod splash;
mod webcast;

pub use browser::Browser;
pub use page::{ConsoleMessage, ConsoleMessageKind, NetworkIdle, Page};
pub use recorder::{RecorderState, ScreenRecorder};
pub use webcast::{SessionState, WebCast, WebCastOptions};
pub use webcast_protocol::{
	Autopad, BoundingBox, DEFAULT_TIMEOUT_MS, LaunchOptions, MediaFeature, RecorderOptions, Viewport,
};
pub use webcast_runtime::{Error, Result, get_browser_executable};
