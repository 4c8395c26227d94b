//! Document Agent
//!
//! Single-call document analysis: submit, wait for the run within a bounded
//! poll budget, read the answer, then delete the thread and uploaded file.

use tracing::{info, warn};

use crate::agents::status::StatusAgent;
use crate::agents::submission::{RemoteResources, SubmissionAgent};
use crate::llm::AssistantsClient;
use crate::models::{AnalysisRequest, AnalysisResult, RunStatus};
use crate::types::{AppError, AppResult};
use crate::utils::{poll_until, PollOutcome, PollPolicy};

pub struct DocumentAgent;

impl DocumentAgent {
    /// The workflow runs on its own task, so the thread and file are still
    /// released when the caller stops waiting (e.g. the client disconnects).
    pub async fn analyze(
        client: AssistantsClient,
        assistant_id: String,
        policy: PollPolicy,
        request: AnalysisRequest,
    ) -> AppResult<AnalysisResult> {
        let task = tokio::spawn(async move {
            let mut resources = RemoteResources::default();
            let result =
                Self::run_to_completion(&client, &assistant_id, policy, &request, &mut resources).await;

            // Released on every exit path, success or not
            resources.release(&client).await;
            result
        });

        task.await
            .map_err(|e| AppError::Internal(format!("Document analysis task failed: {}", e)))?
            .map_err(AppError::into_server_error)
    }

    async fn run_to_completion(
        client: &AssistantsClient,
        assistant_id: &str,
        policy: PollPolicy,
        request: &AnalysisRequest,
        resources: &mut RemoteResources,
    ) -> AppResult<AnalysisResult> {
        let handle = SubmissionAgent::start_run(client, assistant_id, request, resources).await?;

        let outcome = poll_until(
            policy,
            || client.retrieve_run(&handle.thread_id, &handle.run_id),
            |run| run.status.is_terminal(),
        )
        .await?;

        match outcome {
            PollOutcome::Done(run) if run.status == RunStatus::Completed => {
                let text = StatusAgent::fetch_analysis(client, &handle.thread_id).await?;
                info!(thread_id = %handle.thread_id, run_id = %handle.run_id, "Document analysis completed");
                Ok(AnalysisResult { text })
            }
            PollOutcome::Done(run) => Err(AppError::llm(StatusAgent::failure_detail(&run))),
            PollOutcome::Exhausted(last) => {
                warn!(
                    thread_id = %handle.thread_id,
                    run_id = %handle.run_id,
                    last_status = ?last.map(|r| r.status),
                    "Gave up waiting for run"
                );
                Err(AppError::RunTimedOut {
                    attempts: policy.max_attempts,
                })
            }
        }
    }
}
