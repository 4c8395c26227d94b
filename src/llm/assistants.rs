// OpenAI Assistants v2 client: files, threads, messages and runs
// API Reference: https://platform.openai.com/docs/api-reference/assistants

use crate::llm::openai::parse_response;
use crate::models::RunStatus;
use crate::multipart::UploadedFile;
use crate::types::{AppError, AppResult};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ASSISTANTS_BETA: (&str, &str) = ("OpenAI-Beta", "assistants=v2");
const ASSISTANTS_FALLBACK_ERROR: &str = "OpenAI assistants request failed.";

#[derive(Clone)]
pub struct AssistantsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: &'a str,
    content: &'a str,
    attachments: Vec<Attachment<'a>>,
}

#[derive(Serialize)]
struct Attachment<'a> {
    file_id: &'a str,
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Tool {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum MessageContentBlock {
    #[serde(rename = "text")]
    Text { text: TextBlock },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBlock {
    pub value: String,
}

impl ThreadMessage {
    /// All text segments joined by newlines. Non-text blocks are skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                MessageContentBlock::Text { text } => Some(text.value.as_str()),
                MessageContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl AssistantsClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Base URL extended by `segments`, each percent-encoded as exactly one
    /// path segment. Ids are never allowed to change which endpoint is hit.
    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        if let Some(bad) = segments.iter().copied().find(|s| matches!(*s, "" | "." | "..")) {
            return Err(AppError::InvalidRequest(format!("Invalid identifier: {:?}", bad)));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Configuration(format!("Invalid OpenAI base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Configuration("OpenAI base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header(ASSISTANTS_BETA.0, ASSISTANTS_BETA.1)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        action: &str,
    ) -> AppResult<T> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| AppError::llm(format!("OpenAI request to {} failed: {}", action, e)))?;
        parse_response(response, ASSISTANTS_FALLBACK_ERROR).await
    }

    /// Upload a document for use by assistants, returning its file id.
    pub async fn upload_file(&self, file: &UploadedFile) -> AppResult<String> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.media_type)
            .map_err(|e| AppError::InvalidRequest(format!("Invalid media type: {}", e)))?;
        let form = Form::new().text("purpose", "assistants").part("file", part);

        let created: IdObject = self
            .send(self.client.post(self.endpoint(&["files"])?).multipart(form), "upload file")
            .await?;
        debug!(file_id = %created.id, filename = %file.filename, "Uploaded file");
        Ok(created.id)
    }

    pub async fn create_thread(&self) -> AppResult<String> {
        let created: IdObject = self
            .send(
                self.client.post(self.endpoint(&["threads"])?).json(&serde_json::json!({})),
                "create thread",
            )
            .await?;
        debug!(thread_id = %created.id, "Created thread");
        Ok(created.id)
    }

    /// Add the user's instruction to a thread with the file attached for file search.
    pub async fn add_message(&self, thread_id: &str, prompt: &str, file_id: &str) -> AppResult<String> {
        let body = CreateMessageRequest {
            role: "user",
            content: prompt,
            attachments: vec![Attachment {
                file_id,
                tools: vec![Tool { kind: "file_search" }],
            }],
        };
        let created: IdObject = self
            .send(
                self.client
                    .post(self.endpoint(&["threads", thread_id, "messages"])?)
                    .json(&body),
                "add message",
            )
            .await?;
        Ok(created.id)
    }

    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> AppResult<Run> {
        let run: Run = self
            .send(
                self.client
                    .post(self.endpoint(&["threads", thread_id, "runs"])?)
                    .json(&CreateRunRequest { assistant_id }),
                "create run",
            )
            .await?;
        debug!(thread_id, run_id = %run.id, status = %run.status, "Created run");
        Ok(run)
    }

    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AppResult<Run> {
        self.send(
            self.client
                .get(self.endpoint(&["threads", thread_id, "runs", run_id])?),
            "retrieve run",
        )
        .await
    }

    /// Messages of a thread, newest first.
    pub async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<ThreadMessage>> {
        let list: MessageList = self
            .send(
                self.client
                    .get(self.endpoint(&["threads", thread_id, "messages"])?)
                    .query(&[("order", "desc")]),
                "list messages",
            )
            .await?;
        Ok(list.data)
    }

    pub async fn delete_thread(&self, thread_id: &str) -> AppResult<()> {
        let _: serde_json::Value = self
            .send(
                self.client.delete(self.endpoint(&["threads", thread_id])?),
                "delete thread",
            )
            .await?;
        Ok(())
    }

    pub async fn delete_file(&self, file_id: &str) -> AppResult<()> {
        let _: serde_json::Value = self
            .send(
                self.client.delete(self.endpoint(&["files", file_id])?),
                "delete file",
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> AssistantsClient {
        AssistantsClient::new(Client::new(), &server.url(), "test-key")
    }

    #[test]
    fn test_ids_stay_within_one_path_segment() {
        let client = AssistantsClient::new(Client::new(), "https://api.openai.com/v1/", "k");

        let url = client
            .endpoint(&["threads", "../files/file_secret#", "runs", "run?x=1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openai.com/v1/threads/..%2Ffiles%2Ffile_secret%23/runs/run%3Fx=1"
        );

        let root = AssistantsClient::new(Client::new(), "http://127.0.0.1:8080", "k");
        assert_eq!(
            root.endpoint(&["threads", "thread_1"]).unwrap().as_str(),
            "http://127.0.0.1:8080/threads/thread_1"
        );
    }

    #[test]
    fn test_dot_segment_ids_are_rejected() {
        let client = AssistantsClient::new(Client::new(), "http://127.0.0.1:8080", "k");
        for id in ["..", ".", ""] {
            let err = client.endpoint(&["threads", id]).unwrap_err();
            assert!(matches!(err, AppError::InvalidRequest(_)), "{id:?}");
        }
    }

    #[test]
    fn test_message_text_joins_text_blocks() {
        let message: ThreadMessage = serde_json::from_value(serde_json::json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "First", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "file_1"}},
                {"type": "text", "text": {"value": "Second", "annotations": []}}
            ]
        }))
        .unwrap();

        assert_eq!(message.text(), "First\nSecond");
    }

    #[tokio::test]
    async fn test_add_message_attaches_file_search() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/threads/thread_1/messages")
            .match_header("openai-beta", "assistants=v2")
            .match_body(Matcher::Json(serde_json::json!({
                "role": "user",
                "content": "Summarize",
                "attachments": [{"file_id": "file_1", "tools": [{"type": "file_search"}]}]
            })))
            .with_status(200)
            .with_body(r#"{"id":"msg_1","object":"thread.message"}"#)
            .create_async()
            .await;

        let id = client(&server)
            .add_message("thread_1", "Summarize", "file_1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(id, "msg_1");
    }

    #[tokio::test]
    async fn test_retrieve_run_reads_last_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/threads/thread_1/runs/run_1")
            .with_status(200)
            .with_body(r#"{"id":"run_1","status":"failed","last_error":{"code":"server_error","message":"Something broke"}}"#)
            .create_async()
            .await;

        let run = client(&server).retrieve_run("thread_1", "run_1").await.unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(
            run.last_error.and_then(|e| e.message).as_deref(),
            Some("Something broke")
        );
    }

    #[tokio::test]
    async fn test_list_messages_requests_newest_first() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/threads/thread_1/messages")
            .match_query(Matcher::UrlEncoded("order".into(), "desc".into()))
            .with_status(200)
            .with_body(r#"{"object":"list","data":[{"role":"assistant","content":[]}]}"#)
            .create_async()
            .await;

        let messages = client(&server).list_messages("thread_1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("DELETE", "/threads/thread_x")
            .with_status(404)
            .with_body(r#"{"error":{"message":"No thread found with id 'thread_x'."}}"#)
            .create_async()
            .await;

        let err = client(&server).delete_thread("thread_x").await.unwrap_err();

        assert!(matches!(err, AppError::LLMApi { status: Some(404), .. }));
        assert_eq!(err.to_string(), "No thread found with id 'thread_x'.");
    }
}
