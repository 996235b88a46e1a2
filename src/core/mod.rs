//! Core types shared by every stage of the updater
//!
//! - [`error`] - [`UpdateError`] taxonomy and user-friendly error display

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
