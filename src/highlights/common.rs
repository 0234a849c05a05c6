//! Common utilities module
//!
//! This module contains the error type and the frame geometry shared by the
//! reconstruction engine, the device path and the raw I/O harness.

pub mod error;
pub mod types;

pub use error::{HighlightError, Result};
pub use types::{Frame, FrameMut, Roi};
