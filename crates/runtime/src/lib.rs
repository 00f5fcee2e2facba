//! Browser runtime for webcast.
//!
//! Locates a Chromium-family browser, manages its process, and speaks the
//! Chrome DevTools Protocol to it over a WebSocket.

pub mod browser_process;
pub mod connection;
pub mod driver;
pub mod error;
pub mod transport;

pub use browser_process::BrowserProcess;
pub use connection::Connection;
pub use driver::get_browser_executable;
pub use error::{Error, Result};
