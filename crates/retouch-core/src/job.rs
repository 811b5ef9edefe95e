//! Edit-job types and the job state machine.
//!
//! Jobs are ephemeral and provider-tracked: they exist in memory for the
//! duration of one edit request and its polling lifecycle, and are never
//! persisted. The durable outcome of a job is an `ImageVersion` (on
//! success) or a refund entry (on any other terminal state).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, ProjectId, UserId, VersionId};

/// Parameters of one edit request, passed through to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditParams {
    /// The edit instruction.
    pub prompt: String,

    /// Optional named style.
    pub style: Option<String>,

    /// Output aspect ratio, e.g. `"1:1"` or `"match_input_image"`.
    pub aspect_ratio: String,
}

/// One submitted AI edit request and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditJob {
    /// The job ID.
    pub id: JobId,

    /// The user who submitted (and was charged for) the job.
    pub user_id: UserId,

    /// The project the result will be appended to.
    pub project_id: ProjectId,

    /// Provider-side identifier, `None` for synchronous providers.
    pub prediction_id: Option<String>,

    /// The input image URL sent to the provider.
    pub input_image_ref: String,

    /// The edit parameters.
    pub params: EditParams,

    /// Current lifecycle state.
    pub state: JobState,

    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
}

impl EditJob {
    /// Create a job in the `Created` state.
    #[must_use]
    pub fn new(
        user_id: UserId,
        project_id: ProjectId,
        input_image_ref: String,
        params: EditParams,
    ) -> Self {
        Self {
            id: JobId::generate(),
            user_id,
            project_id,
            prediction_id: None,
            input_image_ref,
            params,
            state: JobState::Created,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle state of an edit job.
///
/// Transitions: `Created → Polling → {Succeeded, Failed, Canceled,
/// TimedOut}`; synchronous providers go straight from `Created` to
/// `Succeeded`. There is no transition out of a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    /// Accepted and charged, not yet polling.
    Created,

    /// Waiting on the provider.
    Polling,

    /// The provider delivered a result; the version chain was extended.
    Succeeded {
        /// Public URL of the stored result image.
        image_ref: String,
        /// The appended image version.
        version_id: VersionId,
    },

    /// The provider reported failure; the charge was refunded.
    Failed {
        /// Provider-reported reason, if any.
        reason: Option<String>,
    },

    /// The provider reported cancellation; the charge was refunded.
    Canceled,

    /// The polling ceiling was exhausted; the charge was refunded.
    TimedOut,
}

impl JobState {
    /// Check whether this state is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::Canceled | Self::TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_created() {
        let job = EditJob::new(
            UserId::generate(),
            ProjectId::generate(),
            "https://img.example/in.png".into(),
            EditParams {
                prompt: "remove background".into(),
                style: None,
                aspect_ratio: "match_input_image".into(),
            },
        );

        assert_eq!(job.state, JobState::Created);
        assert!(job.prediction_id.is_none());
        assert!(!job.state.is_terminal());
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Succeeded {
            image_ref: "x".into(),
            version_id: VersionId::generate()
        }
        .is_terminal());
        assert!(JobState::Failed { reason: None }.is_terminal());
        assert!(JobState::Canceled.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
        assert!(!JobState::Created.is_terminal());
        assert!(!JobState::Polling.is_terminal());
    }

    #[test]
    fn job_state_serializes_with_status_tag() {
        let json = serde_json::to_value(JobState::Polling).unwrap();
        assert_eq!(json["status"], "polling");

        let json = serde_json::to_value(JobState::Failed {
            reason: Some("NSFW content detected".into()),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "NSFW content detected");
    }
}
