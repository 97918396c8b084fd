//! Utility functions

pub mod time;
pub mod validation;

pub use time::{now_utc, parse_date, parse_datetime};
pub use validation::{validate_email, validate_username};
