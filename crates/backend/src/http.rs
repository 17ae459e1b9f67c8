use async_trait::async_trait;
use quiz_core::model::{
    AttemptId, AttemptRecord, AutosaveRecord, NewAttempt, QuizSnapshot, UserId,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::{BackendError, BackendOp, QuizBackendClient};
use crate::config::BackendConfig;
use crate::envelope::decode_envelope;

/// `QuizBackendClient` over the quiz REST API.
#[derive(Clone)]
pub struct HttpQuizBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpQuizBackend {
    /// # Errors
    ///
    /// Returns `BackendError::Transport` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.base_url(), path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        match self.config.api_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        op: BackendOp,
        request: RequestBuilder,
    ) -> Result<Option<T>, BackendError> {
        let outcome = read_response(request).await.and_then(|(status, body)| {
            debug!(%op, status, "quiz api responded");
            decode_envelope::<T>(status, &body)
        });

        if let Err(err) = &outcome {
            warn!(%op, error = %err, "quiz api call failed");
        }
        outcome
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        op: BackendOp,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, BackendError> {
        self.send(op, self.request(method, path).json(body)).await
    }
}

#[derive(Debug, Serialize)]
struct UpsertAutosaveRequest<'a> {
    user_id: UserId,
    quiz_data: &'a QuizSnapshot,
}

async fn read_response(request: RequestBuilder) -> Result<(u16, String), BackendError> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

fn required<T>(op: BackendOp, data: Option<T>) -> Result<T, BackendError> {
    data.ok_or_else(|| BackendError::Malformed(format!("{op} response carried no data")))
}

#[async_trait]
impl QuizBackendClient for HttpQuizBackend {
    async fn upsert_autosave(
        &self,
        user_id: UserId,
        snapshot: &QuizSnapshot,
    ) -> Result<(), BackendError> {
        let body = UpsertAutosaveRequest {
            user_id,
            quiz_data: snapshot,
        };
        self.send_json::<_, serde_json::Value>(
            BackendOp::UpsertAutosave,
            Method::POST,
            "quiz/autosave",
            &body,
        )
        .await?;
        Ok(())
    }

    async fn fetch_autosave(&self, user_id: UserId) -> Result<Option<AutosaveRecord>, BackendError> {
        let path = format!("quiz/autosave/{user_id}");
        self.send(BackendOp::FetchAutosave, self.request(Method::GET, &path))
            .await
    }

    async fn delete_autosave(&self, user_id: UserId) -> Result<(), BackendError> {
        let path = format!("quiz/autosave/{user_id}");
        self.send::<serde_json::Value>(
            BackendOp::DeleteAutosave,
            self.request(Method::DELETE, &path),
        )
        .await?;
        Ok(())
    }

    async fn save_attempt(&self, attempt: &NewAttempt) -> Result<AttemptRecord, BackendError> {
        let data = self
            .send_json(BackendOp::SaveAttempt, Method::POST, "quiz/attempts", attempt)
            .await?;
        required(BackendOp::SaveAttempt, data)
    }

    async fn list_attempts(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, BackendError> {
        let request = self
            .request(Method::GET, "quiz/attempts")
            .query(&[("user_id", user_id.to_string()), ("limit", limit.to_string())]);
        let data = self.send(BackendOp::ListAttempts, request).await?;
        Ok(data.unwrap_or_default())
    }

    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<AttemptRecord, BackendError> {
        let path = format!("quiz/attempts/{attempt_id}");
        let data = self
            .send(BackendOp::FetchAttempt, self.request(Method::GET, &path))
            .await?;
        required(BackendOp::FetchAttempt, data)
    }
}
