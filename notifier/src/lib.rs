//! Notification service library crate.
//!
//! Turns "something happened" events into emails: a resolver finds the
//! people to notify, a template renders the message and a bounded worker
//! pool hands it to the mail transport.

pub mod api;
pub mod collector;
pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod template;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Error, Result};
