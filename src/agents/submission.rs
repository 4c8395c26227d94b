//! Submission Agent
//!
//! Uploads a document, opens a thread, posts the instruction with the file
//! attached and starts a run. Each step needs the previous step's id, so the
//! calls are strictly sequential and the first failure aborts the rest.

use tracing::{info, warn};

use crate::llm::AssistantsClient;
use crate::models::{AnalysisRequest, RunHandle};
use crate::types::{AppError, AppResult};

/// Remote objects created on behalf of one request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RemoteResources {
    pub file_id: Option<String>,
    pub thread_id: Option<String>,
}

impl RemoteResources {
    /// Delete everything acquired so far. Failures are logged and swallowed.
    pub async fn release(self, client: &AssistantsClient) {
        if let Some(thread_id) = self.thread_id {
            match client.delete_thread(&thread_id).await {
                Ok(()) => info!(thread_id = %thread_id, "Deleted thread"),
                Err(e) => warn!(thread_id = %thread_id, "Failed to delete thread: {}", e),
            }
        }
        if let Some(file_id) = self.file_id {
            match client.delete_file(&file_id).await {
                Ok(()) => info!(file_id = %file_id, "Deleted file"),
                Err(e) => warn!(file_id = %file_id, "Failed to delete file: {}", e),
            }
        }
    }
}

pub struct SubmissionAgent;

impl SubmissionAgent {
    /// Start a run and return its handle without waiting for it.
    ///
    /// Nothing is cleaned up on failure: an uploaded file stays uploaded if a
    /// later step fails.
    pub async fn submit(
        client: &AssistantsClient,
        assistant_id: &str,
        request: &AnalysisRequest,
    ) -> AppResult<RunHandle> {
        let mut resources = RemoteResources::default();
        let result = Self::start_run(client, assistant_id, request, &mut resources).await;
        if result.is_err() && resources != RemoteResources::default() {
            warn!(
                file_id = ?resources.file_id,
                thread_id = ?resources.thread_id,
                "Submission failed part-way; remote objects left in place"
            );
        }
        result.map_err(AppError::into_server_error)
    }

    /// Steps 1-4 of the workflow. Ids are recorded in `resources` as soon as
    /// they exist so callers can release them.
    pub async fn start_run(
        client: &AssistantsClient,
        assistant_id: &str,
        request: &AnalysisRequest,
        resources: &mut RemoteResources,
    ) -> AppResult<RunHandle> {
        let document = request
            .document
            .as_ref()
            .ok_or_else(|| AppError::InvalidRequest("Missing prompt or file.".to_string()))?;

        let file_id = client.upload_file(document).await?;
        resources.file_id = Some(file_id.clone());

        let thread_id = client.create_thread().await?;
        resources.thread_id = Some(thread_id.clone());

        client.add_message(&thread_id, &request.prompt, &file_id).await?;

        let run = client.create_run(&thread_id, assistant_id).await?;

        info!(
            thread_id = %thread_id,
            run_id = %run.id,
            filename = %document.filename,
            "Analysis run submitted"
        );

        Ok(RunHandle {
            thread_id,
            run_id: run.id,
        })
    }
}
