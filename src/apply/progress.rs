use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-reported status of an auto-apply run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Queued,
    Running,
    /// The backend is blocked on a one-time security code from the user.
    WaitingForInput,
    Completed,
    Error,
    Cancelled,
}

impl ApplyStatus {
    /// States after which the run can no longer move.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// The poller only stops itself on these; `Cancelled` is always set
    /// locally, never observed from a poll.
    pub fn ends_polling(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One progress snapshot. Each poll response replaces the previous snapshot
/// wholesale; there is no client-side merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyProgress {
    pub job_id: String,
    pub status: ApplyStatus,
    #[serde(default)]
    pub current_step: u32,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl ApplyProgress {
    /// A snapshot minted on this side of the wire, for optimistic
    /// transitions the backend never confirmed.
    pub fn local(job_id: &str, status: ApplyStatus, message: &str) -> Self {
        let now = Some(Utc::now());
        Self {
            job_id: job_id.to_string(),
            status,
            current_step: 0,
            total_steps: 0,
            message: message.to_string(),
            started_at: None,
            completed_at: if status == ApplyStatus::Completed { now } else { None },
            failed_at: if status == ApplyStatus::Error { now } else { None },
            cancelled_at: if status == ApplyStatus::Cancelled { now } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_match_the_wire_format() {
        let snapshot: ApplyProgress = serde_json::from_str(
            r#"{"job_id":"j1","status":"waiting_for_input","current_step":3,"total_steps":9,"message":"need code"}"#,
        )
        .unwrap();

        assert_eq!(snapshot.status, ApplyStatus::WaitingForInput);
        assert_eq!(snapshot.current_step, 3);
        assert!(!snapshot.status.is_terminal());
        assert!(!snapshot.status.ends_polling());
    }

    #[test]
    fn cancelled_is_terminal_but_does_not_end_polling() {
        assert!(ApplyStatus::Cancelled.is_terminal());
        assert!(!ApplyStatus::Cancelled.ends_polling());
        assert!(ApplyStatus::Completed.ends_polling());
        assert!(ApplyStatus::Error.ends_polling());
    }
}
