//! Edit-job orchestration.
//!
//! The flow is reserve-then-submit: one credit is deducted atomically
//! before the provider sees the request, so two concurrent submits from a
//! one-credit balance cannot both go through. Any terminal outcome other
//! than success refunds the charge exactly once; the refund is gated on
//! winning the transition into the terminal state.
//!
//! Jobs live only in memory. Their durable traces are the charge entry,
//! the refund entry, and (on success) the appended image version.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use retouch_core::{
    CreditEntry, EditJob, EditParams, ImageVersion, JobId, JobState, ProjectId, UserId,
    EDIT_COST_CREDITS,
};
use retouch_store::Store;

use crate::error::ApiError;
use crate::provider::{EditRequest, PollUpdate, Submission};
use crate::state::AppState;

/// How long a terminal job stays readable before eviction.
///
/// Long enough for any reasonable status poller to observe the outcome;
/// the durable record is the ledger and the version chain, not the
/// registry.
const TERMINAL_RETENTION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct JobSlot {
    job: EditJob,
    resolved_at: Option<Instant>,
}

/// In-memory registry of edit jobs.
///
/// Terminal jobs are retained for a bounded window and then evicted on
/// the next insert, so the registry tracks in-flight work rather than
/// the service's whole edit history.
#[derive(Debug, Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, JobSlot>>>,
    retention: Duration,
}

impl JobRegistry {
    /// Create an empty registry with the default retention window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(TERMINAL_RETENTION)
    }

    /// Create an empty registry retaining terminal jobs for `retention`.
    #[must_use]
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Insert a job, evicting terminal jobs past the retention window.
    pub fn insert(&self, job: EditJob) {
        let mut jobs = self.jobs.write().expect("job registry lock poisoned");
        Self::evict_expired(&mut jobs, self.retention);
        jobs.insert(
            job.id,
            JobSlot {
                job,
                resolved_at: None,
            },
        );
    }

    /// Get a job by ID.
    #[must_use]
    pub fn get(&self, job_id: &JobId) -> Option<EditJob> {
        self.jobs
            .read()
            .expect("job registry lock poisoned")
            .get(job_id)
            .map(|slot| slot.job.clone())
    }

    /// Record the provider-side prediction ID on a job.
    pub fn set_prediction(&self, job_id: &JobId, prediction_id: String) {
        if let Some(slot) = self
            .jobs
            .write()
            .expect("job registry lock poisoned")
            .get_mut(job_id)
        {
            slot.job.prediction_id = Some(prediction_id);
        }
    }

    /// Transition a job into `state`.
    ///
    /// Returns `false` without writing if the job is unknown or already
    /// terminal. Terminal states are absorbing, so exactly one caller wins
    /// the transition; the winner is the one allowed to refund. A
    /// terminal transition starts the retention clock.
    pub fn set_state(&self, job_id: &JobId, state: JobState) -> bool {
        let mut jobs = self.jobs.write().expect("job registry lock poisoned");
        match jobs.get_mut(job_id) {
            Some(slot) if !slot.job.state.is_terminal() => {
                if state.is_terminal() {
                    slot.resolved_at = Some(Instant::now());
                }
                slot.job.state = state;
                true
            }
            _ => false,
        }
    }

    /// Number of jobs currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.read().expect("job registry lock poisoned").len()
    }

    /// Whether the registry holds no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(jobs: &mut HashMap<JobId, JobSlot>, retention: Duration) {
        jobs.retain(|_, slot| {
            slot.resolved_at
                .map_or(true, |resolved| resolved.elapsed() < retention)
        });
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Submit an edit job for a project.
///
/// Charges one credit, submits to the provider, and either resolves the
/// job inline (synchronous provider) or spawns the poll loop. The
/// returned job reflects the state at return time.
///
/// # Errors
///
/// - `ApiError::NotFound` / `ApiError::Forbidden` for a missing or
///   foreign project.
/// - `ApiError::InsufficientCredits` if the balance is empty; nothing is
///   written in that case.
/// - `ApiError::ExternalService` if the provider rejects the submission;
///   the charge has been refunded.
pub async fn submit_edit(
    state: &Arc<AppState>,
    user_id: UserId,
    project_id: ProjectId,
    params: EditParams,
) -> Result<EditJob, ApiError> {
    let project = state
        .store
        .get_project(&project_id)?
        .ok_or_else(|| ApiError::NotFound(format!("project not found: {project_id}")))?;
    if project.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    let head = state
        .store
        .latest_version(&project_id)?
        .ok_or_else(|| ApiError::Internal(format!("project {project_id} has no versions")))?;

    let job = EditJob::new(user_id, project_id, head.image_ref.clone(), params);

    let charge = CreditEntry::edit_charge(user_id, EDIT_COST_CREDITS, format!("Edit job {}", job.id));
    state
        .store
        .deduct_credits(&user_id, EDIT_COST_CREDITS, charge)?;

    tracing::info!(
        job_id = %job.id,
        project_id = %project_id,
        user_id = %user_id,
        "Edit job charged and created"
    );

    state.jobs.insert(job.clone());

    let request = EditRequest {
        input_image: job.input_image_ref.clone(),
        prompt: effective_prompt(&job.params),
        aspect_ratio: job.params.aspect_ratio.clone(),
    };

    match state.provider.submit(&request).await {
        Ok(Submission::Completed { output_url }) => {
            finalize_success(state, &job.id, &output_url).await;
        }
        Ok(Submission::Accepted { prediction_id }) => {
            state.jobs.set_prediction(&job.id, prediction_id);
            state.jobs.set_state(&job.id, JobState::Polling);

            let state = Arc::clone(state);
            let job_id = job.id;
            tokio::spawn(async move {
                poll_job(state, job_id).await;
            });
        }
        Err(err) => {
            tracing::warn!(job_id = %job.id, error = %err, "Provider rejected submission");
            resolve_failure(
                state,
                &job.id,
                JobState::Failed {
                    reason: Some(err.to_string()),
                },
                "Provider rejected submission",
            );
            return Err(ApiError::ExternalService(format!(
                "edit provider rejected the request: {err}"
            )));
        }
    }

    state
        .jobs
        .get(&job.id)
        .ok_or_else(|| ApiError::Internal("job vanished from registry".into()))
}

/// Poll an accepted prediction until a terminal state or the attempt
/// ceiling.
async fn poll_job(state: Arc<AppState>, job_id: JobId) {
    let Some(prediction_id) = state.jobs.get(&job_id).and_then(|j| j.prediction_id) else {
        tracing::error!(job_id = %job_id, "Poll loop started without a prediction ID");
        return;
    };

    tokio::time::sleep(state.config.poll_initial_delay).await;

    for attempt in 1..=state.config.poll_max_attempts {
        match state.provider.poll(&prediction_id).await {
            Ok(PollUpdate::Running) => {}
            Ok(PollUpdate::Succeeded { output_url }) => {
                finalize_success(&state, &job_id, &output_url).await;
                return;
            }
            Ok(PollUpdate::Failed { reason }) => {
                resolve_failure(
                    &state,
                    &job_id,
                    JobState::Failed { reason },
                    "Provider reported failure",
                );
                return;
            }
            Ok(PollUpdate::Canceled) => {
                resolve_failure(&state, &job_id, JobState::Canceled, "Provider canceled job");
                return;
            }
            Err(err) if err.is_transient() => {
                tracing::debug!(
                    job_id = %job_id,
                    attempt,
                    error = %err,
                    "Transient poll error, will retry"
                );
            }
            Err(err) => {
                resolve_failure(
                    &state,
                    &job_id,
                    JobState::Failed {
                        reason: Some(err.to_string()),
                    },
                    "Provider poll failed",
                );
                return;
            }
        }

        tokio::time::sleep(state.config.poll_interval).await;
    }

    resolve_failure(&state, &job_id, JobState::TimedOut, "Polling ceiling reached");
}

/// Persist the provider output and extend the version chain.
///
/// A failure after the provider succeeded (storage or chain append) still
/// refunds: the user paid for a delivered image, not a delivered
/// prediction.
async fn finalize_success(state: &Arc<AppState>, job_id: &JobId, output_url: &str) {
    let Some(job) = state.jobs.get(job_id) else {
        tracing::error!(job_id = %job_id, "Finalizing unknown job");
        return;
    };

    let image_ref = match state.storage.persist(output_url).await {
        Ok(url) => url,
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "Failed to store result image");
            resolve_failure(
                state,
                job_id,
                JobState::Failed {
                    reason: Some("failed to store result image".into()),
                },
                "Result image storage failed",
            );
            return;
        }
    };

    let appended = state
        .store
        .latest_version(&job.project_id)
        .and_then(|head| match head {
            Some(head) => {
                let version = ImageVersion::edited(
                    &head,
                    image_ref.clone(),
                    job.params.prompt.clone(),
                    job.params.style.clone(),
                );
                state.store.append_version(&version).map(|()| version)
            }
            None => Err(retouch_store::StoreError::NotFound {
                entity: "version",
                id: job.project_id.to_string(),
            }),
        });

    match appended {
        Ok(version) => {
            state.jobs.set_state(
                job_id,
                JobState::Succeeded {
                    image_ref,
                    version_id: version.id,
                },
            );
            tracing::info!(
                job_id = %job_id,
                version_id = %version.id,
                "Edit job succeeded"
            );
        }
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "Failed to append result version");
            resolve_failure(
                state,
                job_id,
                JobState::Failed {
                    reason: Some("failed to record result version".into()),
                },
                "Result version append failed",
            );
        }
    }
}

/// Move a job into a non-success terminal state and refund its charge.
///
/// The refund happens only when this call wins the state transition, so
/// concurrent resolvers cannot double-refund.
fn resolve_failure(state: &Arc<AppState>, job_id: &JobId, terminal: JobState, reason: &str) {
    let Some(job) = state.jobs.get(job_id) else {
        return;
    };

    if !state.jobs.set_state(job_id, terminal) {
        return;
    }

    let entry = CreditEntry::refund(
        job.user_id,
        EDIT_COST_CREDITS,
        format!("{reason} (job {job_id})"),
    );
    match state.store.add_credits(&job.user_id, EDIT_COST_CREDITS, entry) {
        Ok(new_balance) => {
            tracing::info!(
                job_id = %job_id,
                user_id = %job.user_id,
                new_balance,
                "Refunded edit charge"
            );
        }
        Err(err) => {
            // The user has paid for nothing; this needs operator attention.
            tracing::error!(
                job_id = %job_id,
                user_id = %job.user_id,
                error = %err,
                "REFUND FAILED after terminal job state"
            );
        }
    }
}

/// Fold the optional style into the prompt sent to the provider.
fn effective_prompt(params: &EditParams) -> String {
    match &params.style {
        Some(style) => format!("{}, in {style} style", params.prompt),
        None => params.prompt.clone(),
    }
}
