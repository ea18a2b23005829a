use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ItemRecord
// ---------------------------------------------------------------------------

/// One purchasable item code as held by the store.
///
/// The engine reads every field but only ever writes `active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub code: String,
    pub display_name: String,
    pub owner_group_id: i64,
    /// Name of the owning group (hero). Used for ordering and log lines.
    pub owner_group_name: String,
    /// Stored as 0/1 by the relational backend.
    pub active: bool,
    pub price: i64,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The code still lands on a checkout page.
    Active,
    /// The product is gone (404, or bounced to the storefront landing page).
    Inactive,
    /// Unrecognised landing spot. Never causes a write.
    Unknown,
    /// The session credential was rejected; the cycle must stop.
    SessionInvalid,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Active => "active",
            Verdict::Inactive => "inactive",
            Verdict::Unknown => "unknown",
            Verdict::SessionInvalid => "session_invalid",
        }
    }

    /// The `active` flag this verdict implies, if it implies one at all.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            Verdict::Active => Some(true),
            Verdict::Inactive => Some(false),
            Verdict::Unknown | Verdict::SessionInvalid => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ClassificationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub final_url: String,
    /// `0` when the redirect budget ran out before a terminal response.
    pub final_status: u16,
    pub verdict: Verdict,
    /// Id of the classifier rule that matched; `None` for the fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
}

// ---------------------------------------------------------------------------
// AbortReason / CycleOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// Required configuration (the session credential) is absent or unusable.
    ConfigurationMissing { detail: String },
    /// A record landed on a login page.
    SessionInvalid { code: String, final_url: String },
    /// The snapshot could not be loaded from the store.
    StoreUnavailable { detail: String },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ConfigurationMissing { detail } => {
                write!(f, "configuration missing: {detail}")
            }
            AbortReason::SessionInvalid { code, final_url } => {
                write!(f, "session invalid at {code} (redirected to {final_url})")
            }
            AbortReason::StoreUnavailable { detail } => write!(f, "store unavailable: {detail}"),
        }
    }
}

/// Summary of one reconciliation cycle. Discarded once logged.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub total_records: usize,
    pub updated_count: usize,
    pub unchanged_count: usize,
    pub unknown_count: usize,
    pub failed_count: usize,
    pub aborted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<AbortReason>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleOutcome {
    pub(crate) fn begin() -> Self {
        let now = Utc::now();
        Self {
            total_records: 0,
            updated_count: 0,
            unchanged_count: 0,
            unknown_count: 0,
            failed_count: 0,
            aborted: false,
            abort_reason: None,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn abort(mut self, reason: AbortReason) -> Self {
        self.aborted = true;
        self.abort_reason = Some(reason);
        self.finish()
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}
