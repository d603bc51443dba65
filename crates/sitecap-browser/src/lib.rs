//! Sitecap Browser - Browser adapter seam
//!
//! The recording engine treats browser automation as an opaque collaborator.
//! This crate defines the session trait the recorder drives (navigate,
//! observe, act, scroll) and the element observation types that feed the
//! selector extractor. Concrete backends (CDP, WebDriver, extension bridges)
//! live outside this core.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod element;
pub mod error;
pub mod session;

pub use element::{ObservedElement, RawElementAttributes};
pub use error::{Error, Result};
pub use session::{BrowserFactory, BrowserSession, BrowserTokenStats};

/// Default observe timeout in milliseconds
pub const DEFAULT_OBSERVE_TIMEOUT_MS: u64 = 30_000;

/// Default wait after a scroll-to-bottom pass in milliseconds
pub const DEFAULT_SCROLL_WAIT_MS: u64 = 1_500;
