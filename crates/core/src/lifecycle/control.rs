//! Control channel messages.

use serde::{Deserialize, Serialize};

pub const STATUS_CACHE_CLEARED: &str = "Cache cleared";
pub const STATUS_REVALIDATION_SCHEDULED: &str = "All assets marked for revalidation";

/// A command posted to the worker, tagged by `action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlCommand {
    /// Delete the whole current generation.
    ClearCache,
    /// Mark every tracked URL stale.
    RevalidateAll,
}

impl ControlCommand {
    /// Parse a posted message. Anything that is not a known command is `None`.
    pub fn parse(message: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }
}

/// Reply sent back for a handled command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ControlReply {
    pub status: String,
}

impl ControlReply {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}
