//!
//! # markerlink core
//!
//! This crate contains the config and error types shared by everything else.
//!

#![forbid(unsafe_code)]

pub extern crate parking_lot;
pub extern crate tokio;
pub extern crate tracing;

pub mod config;
pub mod error;

pub use error::Error;

pub mod prelude {
    pub use super::parking_lot::{self, Mutex, RwLock};
    pub use super::tokio;
    pub use super::tracing::{self, Instrument, debug, error, info, instrument, trace, warn};

    pub use super::config::{self, Config};
    pub use super::error::Error;
}
