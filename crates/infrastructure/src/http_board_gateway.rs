use std::time::Duration;

use async_trait::async_trait;
use cardflow_application::{BoardGateway, ResolvedCardMove};
use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::{CardColor, CardDateField};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

/// HTTP client for the board application's internal automation API.
///
/// Transient upstream trouble (5xx, 429, transport errors) is retried with a
/// linear backoff. Definite answers, including 404 for unresolved names,
/// are returned immediately.
pub struct HttpBoardGateway {
    http_client: reqwest::Client,
    base_url: String,
    shared_secret: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpBoardGateway {
    /// Creates a new gateway client.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        shared_secret: impl Into<String>,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            shared_secret: shared_secret.into(),
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }

    async fn send_with_retry(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> AppResult<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);

            let mut builder = self
                .http_client
                .request(method.clone(), url.as_str())
                .bearer_auth(self.shared_secret.as_str());
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} from board API at '{path}'",
                        response.status()
                    ));
                }
                Ok(response) => return Ok(response),
                Err(error) => {
                    last_error = Some(format!("board API transport error at '{path}': {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Internal(last_error.unwrap_or_else(|| {
            "board API request exhausted retries".to_owned()
        })))
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<Option<T>> {
        let response = self
            .send_with_retry(reqwest::Method::GET, path, query, None)
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = expect_success(response, path).await?;
        let parsed = response.json::<T>().await.map_err(|error| {
            AppError::Internal(format!("failed to parse board API response: {error}"))
        })?;

        Ok(Some(parsed))
    }

    async fn post(&self, path: &str, body: Value) -> AppResult<()> {
        let response = self
            .send_with_retry(reqwest::Method::POST, path, &[], Some(&body))
            .await?;
        expect_success(response, path).await?;
        Ok(())
    }

    async fn post_returning<T: DeserializeOwned>(&self, path: &str, body: Value) -> AppResult<T> {
        let response = self
            .send_with_retry(reqwest::Method::POST, path, &[], Some(&body))
            .await?;
        let response = expect_success(response, path).await?;

        response.json::<T>().await.map_err(|error| {
            AppError::Internal(format!("failed to parse board API response: {error}"))
        })
    }
}

async fn expect_success(response: reqwest::Response, path: &str) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());

    Err(match status {
        reqwest::StatusCode::BAD_REQUEST => {
            AppError::Validation(format!("board API rejected '{path}': {body}"))
        }
        reqwest::StatusCode::NOT_FOUND => {
            AppError::NotFound(format!("board API target at '{path}' does not exist: {body}"))
        }
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            AppError::Unauthorized(format!("board API refused credentials for '{path}'"))
        }
        _ => AppError::Internal(format!(
            "board API returned status {status} for '{path}': {body}"
        )),
    })
}

#[derive(Debug, serde::Deserialize)]
struct BoardIdResponse {
    board_id: Uuid,
}

#[derive(Debug, serde::Deserialize)]
struct ListIdResponse {
    list_id: String,
}

#[derive(Debug, serde::Deserialize)]
struct SwimlaneIdResponse {
    swimlane_id: String,
}

#[derive(Debug, serde::Deserialize)]
struct MemberResponse {
    subject: String,
}

#[derive(Debug, serde::Deserialize)]
struct CardIdResponse {
    card_id: String,
}

#[async_trait]
impl BoardGateway for HttpBoardGateway {
    async fn find_board_id(&self, board_name: &str) -> AppResult<Option<BoardId>> {
        Ok(self
            .get_optional::<BoardIdResponse>(
                "/api/internal/boards/resolve",
                &[("name", board_name)],
            )
            .await?
            .map(|response| BoardId::from_uuid(response.board_id)))
    }

    async fn find_list_id(&self, board_id: BoardId, list_name: &str) -> AppResult<Option<String>> {
        let path = format!("/api/internal/boards/{board_id}/lists/resolve");
        Ok(self
            .get_optional::<ListIdResponse>(path.as_str(), &[("name", list_name)])
            .await?
            .map(|response| response.list_id))
    }

    async fn find_swimlane_id(
        &self,
        board_id: BoardId,
        swimlane_name: &str,
    ) -> AppResult<Option<String>> {
        let path = format!("/api/internal/boards/{board_id}/swimlanes/resolve");
        Ok(self
            .get_optional::<SwimlaneIdResponse>(path.as_str(), &[("name", swimlane_name)])
            .await?
            .map(|response| response.swimlane_id))
    }

    async fn default_swimlane_id(&self, board_id: BoardId) -> AppResult<Option<String>> {
        let path = format!("/api/internal/boards/{board_id}/swimlanes/default");
        Ok(self
            .get_optional::<SwimlaneIdResponse>(path.as_str(), &[])
            .await?
            .map(|response| response.swimlane_id))
    }

    async fn find_member_subject(
        &self,
        board_id: BoardId,
        username: &str,
    ) -> AppResult<Option<String>> {
        let path = format!("/api/internal/boards/{board_id}/members/resolve");
        Ok(self
            .get_optional::<MemberResponse>(path.as_str(), &[("username", username)])
            .await?
            .map(|response| response.subject))
    }

    async fn create_swimlane(&self, board_id: BoardId, swimlane_name: &str) -> AppResult<String> {
        let path = format!("/api/internal/boards/{board_id}/swimlanes");
        let response: SwimlaneIdResponse = self
            .post_returning(path.as_str(), json!({"name": swimlane_name}))
            .await?;
        Ok(response.swimlane_id)
    }

    async fn move_card(&self, command: ResolvedCardMove) -> AppResult<()> {
        let path = format!("/api/internal/cards/{}/move", command.card_id);
        self.post(
            path.as_str(),
            json!({
                "board_id": command.board_id.as_uuid(),
                "list_id": command.list_id,
                "swimlane_id": command.swimlane_id,
                "position": command.position.as_str(),
            }),
        )
        .await
    }

    async fn archive_card(&self, card_id: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/archive").as_str(),
            json!({}),
        )
        .await
    }

    async fn restore_card(&self, card_id: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/restore").as_str(),
            json!({}),
        )
        .await
    }

    async fn create_card(
        &self,
        board_id: BoardId,
        list_id: &str,
        swimlane_id: &str,
        card_title: &str,
    ) -> AppResult<String> {
        let path = format!("/api/internal/boards/{board_id}/cards");
        let response: CardIdResponse = self
            .post_returning(
                path.as_str(),
                json!({
                    "list_id": list_id,
                    "swimlane_id": swimlane_id,
                    "title": card_title,
                }),
            )
            .await?;
        Ok(response.card_id)
    }

    async fn link_card(&self, card_id: &str, board_id: BoardId, list_id: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/link").as_str(),
            json!({
                "board_id": board_id.as_uuid(),
                "list_id": list_id,
            }),
        )
        .await
    }

    async fn set_card_date(
        &self,
        card_id: &str,
        field: CardDateField,
        value: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/dates").as_str(),
            json!({
                "field": field.as_str(),
                "value": value.map(|stamp| stamp.to_rfc3339()),
            }),
        )
        .await
    }

    async fn add_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/labels/add").as_str(),
            json!({"label_id": label_id}),
        )
        .await
    }

    async fn remove_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/labels/remove").as_str(),
            json!({"label_id": label_id}),
        )
        .await
    }

    async fn clear_card_labels(&self, card_id: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/labels/clear").as_str(),
            json!({}),
        )
        .await
    }

    async fn add_card_member(&self, card_id: &str, subject: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/members/add").as_str(),
            json!({"subject": subject}),
        )
        .await
    }

    async fn remove_card_member(&self, card_id: &str, subject: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/members/remove").as_str(),
            json!({"subject": subject}),
        )
        .await
    }

    async fn clear_card_members(&self, card_id: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/members/clear").as_str(),
            json!({}),
        )
        .await
    }

    async fn set_card_color(&self, card_id: &str, color: CardColor) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/color").as_str(),
            json!({"color": color.as_str()}),
        )
        .await
    }

    async fn add_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/checklists/add").as_str(),
            json!({"name": checklist_name}),
        )
        .await
    }

    async fn remove_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/checklists/remove").as_str(),
            json!({"name": checklist_name}),
        )
        .await
    }

    async fn set_checklist_item(
        &self,
        card_id: &str,
        item_name: &str,
        checked: bool,
    ) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/checklists/items").as_str(),
            json!({"item_name": item_name, "checked": checked}),
        )
        .await
    }

    async fn set_all_checklist_items(&self, card_id: &str, checked: bool) -> AppResult<()> {
        self.post(
            format!("/api/internal/cards/{card_id}/checklists/items/all").as_str(),
            json!({"checked": checked}),
        )
        .await
    }
}
