//! Utility functions.
//!
//! Collection of helpers used across the server.

pub mod parser;
pub mod validate;

pub use parser::{coerce_scalar, parse_duration, slugify};
pub use validate::{Validator, parse_object_id};
