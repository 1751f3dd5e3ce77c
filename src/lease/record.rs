//! Lease records as stored on disk.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A time-bounded exclusive claim on one repo-relative path.
///
/// Serialized as pretty JSON into `<lock_dir>/<encoded path>.lock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Canonical repo-relative path (the unique key).
    pub path: String,

    /// Agent holding the lease.
    pub owner_id: String,

    /// When the lease was created.
    pub acquired_at: DateTime<Utc>,

    /// When the lease stops being honoured (`acquired_at + lock_timeout`,
    /// pushed forward by renewals).
    pub expires_at: DateTime<Utc>,

    /// Process ID of the acquiring process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Machine the lease was taken from (`user@HOST`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Lease {
    /// Create a lease starting now.
    pub fn new(path: &str, owner_id: &str, timeout: Duration) -> Self {
        let acquired_at = Utc::now();
        Self {
            path: path.to_string(),
            owner_id: owner_id.to_string(),
            acquired_at,
            expires_at: acquired_at + timeout,
            pid: Some(std::process::id()),
            host: Some(get_host_string()),
        }
    }

    /// Parse a lease from its JSON record.
    pub fn from_json(content: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(content)
    }

    /// Serialize the lease to its JSON record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Whether the lease is past expiry at `now`, after allowing `skew` of
    /// clock drift in the holder's favour.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now >= self.expires_at + skew
    }

    /// Calculate the age of the lease.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        format_duration(self.age())
    }

    /// Human-readable time until expiry, or `expired` once past it.
    pub fn remaining_string(&self) -> String {
        let remaining = self.expires_at.signed_duration_since(Utc::now());
        if remaining <= Duration::zero() {
            "expired".to_string()
        } else {
            format_duration(remaining)
        }
    }
}

fn format_duration(d: Duration) -> String {
    let seconds = d.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// `user@HOST` for the current process.
pub(crate) fn get_host_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
