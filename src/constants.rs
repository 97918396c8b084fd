//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

// =============================================================================
// AUTHENTICATION DEFAULTS
// =============================================================================

/// Default JWT token expiry in hours
pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;

/// Username maximum length
pub const MAX_USERNAME_LENGTH: u64 = 150;

/// Maximum length of first/last names
pub const MAX_NAME_LENGTH: usize = 150;

/// Maximum email length
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum raw password length accepted for hashing
pub const MAX_PASSWORD_LENGTH: u64 = 128;

// =============================================================================
// API
// =============================================================================

/// API base path
pub const API_BASE_PATH: &str = "/api";

/// Query parameter carrying the search term
pub const SEARCH_PARAM: &str = "search";

/// Query parameter carrying the ordering
pub const ORDERING_PARAM: &str = "ordering";

/// Deepest nesting a resource may request for related objects
pub const MAX_SERIALIZER_DEPTH: u8 = 10;

// =============================================================================
// SUPPORTED LANGUAGES
// =============================================================================

/// Language identifiers stored on problems and submissions
pub mod languages {
    /// Natively compiled (C/C++)
    pub const C_CPP: &str = "c_cpp";
    /// Interpreted (Python)
    pub const PYTHON: &str = "python";

    /// All supported language identifiers
    pub const ALL: &[&str] = &[C_CPP, PYTHON];
}

// =============================================================================
// SUBMISSION STATUSES
// =============================================================================

/// Submission verdict codes
pub mod verdicts {
    pub const PENDING: &str = "PJ";
    pub const ACCEPTED: &str = "AC";
    pub const WRONG_ANSWER: &str = "WA";
    pub const TIME_LIMIT_EXCEEDED: &str = "TLE";
    pub const MEMORY_LIMIT_EXCEEDED: &str = "MLE";
    pub const RUNTIME_ERROR: &str = "RE";
    pub const COMPILATION_ERROR: &str = "CE";
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Lowest difficulty rating a problem may be published with
pub const MIN_PROBLEM_DIFFICULTY: i64 = 500;

/// Maximum problem/contest/tutorial title length
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum length of a contest problem label ("A", "B1", ...)
pub const MAX_PROBLEM_CHAR_LENGTH: usize = 3;

/// Maximum profile bio length
pub const MAX_BIO_LENGTH: usize = 500;

/// Maximum profile location length
pub const MAX_LOCATION_LENGTH: usize = 30;

/// Maximum verdict code length
pub const MAX_VERDICT_LENGTH: usize = 5;
