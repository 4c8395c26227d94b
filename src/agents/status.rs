//! Status Agent
//!
//! Observes a run once. Completed runs yield the latest assistant message;
//! runs that ended any other way yield their status plus an error detail.

use tracing::{info, warn};

use crate::llm::assistants::{Run, ThreadMessage};
use crate::llm::AssistantsClient;
use crate::models::{RunHandle, RunStatus, StatusResponse, NO_ANALYSIS_PLACEHOLDER};
use crate::types::{AppError, AppResult};

pub struct StatusAgent;

impl StatusAgent {
    pub async fn check(client: &AssistantsClient, handle: &RunHandle) -> AppResult<StatusResponse> {
        Self::check_inner(client, handle)
            .await
            .map_err(AppError::into_server_error)
    }

    async fn check_inner(client: &AssistantsClient, handle: &RunHandle) -> AppResult<StatusResponse> {
        let run = client.retrieve_run(&handle.thread_id, &handle.run_id).await?;

        if run.status == RunStatus::Completed {
            let analysis = Self::fetch_analysis(client, &handle.thread_id).await?;
            info!(thread_id = %handle.thread_id, run_id = %handle.run_id, "Run completed");
            return Ok(StatusResponse {
                status: RunStatus::Completed,
                analysis: Some(analysis),
                error: None,
            });
        }

        if run.status.is_failure() {
            warn!(
                thread_id = %handle.thread_id,
                run_id = %handle.run_id,
                status = %run.status,
                "Run ended without a result"
            );
            let error = Self::failure_detail(&run);
            return Ok(StatusResponse {
                status: run.status,
                analysis: None,
                error: Some(error),
            });
        }

        Ok(StatusResponse {
            status: run.status,
            analysis: None,
            error: None,
        })
    }

    pub async fn fetch_analysis(client: &AssistantsClient, thread_id: &str) -> AppResult<String> {
        let messages = client.list_messages(thread_id).await?;
        Ok(Self::latest_assistant_text(&messages))
    }

    /// Text of the newest assistant message; `messages` must be newest first.
    pub fn latest_assistant_text(messages: &[ThreadMessage]) -> String {
        messages
            .iter()
            .find(|m| m.role == "assistant")
            .map(ThreadMessage::text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_ANALYSIS_PLACEHOLDER.to_string())
    }

    pub fn failure_detail(run: &Run) -> String {
        run.last_error
            .as_ref()
            .and_then(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Run ended with status {}", run.status))
    }
}
