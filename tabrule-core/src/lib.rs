//! Tabrule Core - Shared Types
//!
//! Plain data structures used by the DSL and the evaluation engine:
//! durations, tab/window records, URL-derived keys, categories,
//! configuration and error types. No evaluation logic lives here.

pub mod category;
pub mod config;
pub mod duration;
pub mod error;
pub mod tab;
pub mod tab_keys;

pub use category::*;
pub use config::*;
pub use duration::*;
pub use error::*;
pub use tab::*;
pub use tab_keys::*;

use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Host-browser tab identifier.
pub type TabId = i64;

/// Host-browser window identifier.
pub type WindowId = i64;

/// Milliseconds since the Unix epoch.
pub type EpochMs = i64;

/// Duration in milliseconds.
pub type DurationMs = u64;

/// Generate a new rule identifier (UUIDv7, timestamp-sortable).
pub fn new_rule_id() -> String {
    Uuid::now_v7().to_string()
}
