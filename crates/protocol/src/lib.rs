//! Wire types for the webcast DevTools driver.
//!
//! This crate contains the serde-serializable types exchanged with a
//! Chromium-family browser over the Chrome DevTools Protocol (CDP), plus the
//! option structs accepted by the higher-level driver.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization and small conversions
//! - **1:1 with protocol**: Field names follow the CDP JSON schema
//! - **Stable**: Changes only when the wire protocol or option surface changes
//!
//! Higher-level APIs are built on top of these types in `webcast`.

pub mod messages;
pub mod options;
pub mod types;

pub use messages::*;
pub use options::*;
pub use types::*;
