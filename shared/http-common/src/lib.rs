//! Shared HTTP utilities for the kanban board workspace.
//!
//! Framework-agnostic error body builder and the card creation stamp used by
//! the api-server.

use chrono::{DateTime, Local, TimeZone};

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Format used for card `created` stamps: local wall-clock time with
/// microseconds, e.g. `2024-03-01 14:05:09.123456`. Clients treat it as text.
pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format a point in time as a card creation stamp.
pub fn created_stamp<Tz>(t: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    t.format(CREATED_FORMAT).to_string()
}

/// Creation stamp for "now" in the server's local time zone.
pub fn created_stamp_now() -> String {
    created_stamp(&Local::now())
}
