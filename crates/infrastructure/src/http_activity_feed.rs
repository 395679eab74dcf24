use async_trait::async_trait;
use cardflow_application::{ActivityFeed, ClaimedActivityBatch};
use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::{ActivityEvent, ActivityEventInput, ActivityType};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// HTTP client for the board application's activity feed endpoint.
pub struct HttpActivityFeed {
    http_client: reqwest::Client,
    base_url: String,
    shared_secret: String,
}

#[derive(Debug, serde::Serialize)]
struct ClaimRequest<'a> {
    cursor: Option<&'a str>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct ClaimResponse {
    events: Vec<ActivityEventRecord>,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivityEventRecord {
    activity_type: ActivityType,
    board_id: Uuid,
    actor_subject: String,
    card_id: Option<String>,
    list_id: Option<String>,
    swimlane_id: Option<String>,
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    data: Value,
}

impl ActivityEventRecord {
    fn into_event(self) -> AppResult<ActivityEvent> {
        ActivityEvent::new(ActivityEventInput {
            activity_type: self.activity_type,
            board_id: BoardId::from_uuid(self.board_id),
            actor_subject: self.actor_subject,
            card_id: self.card_id,
            list_id: self.list_id,
            swimlane_id: self.swimlane_id,
            occurred_at: self.occurred_at,
            data: self.data,
        })
    }
}

impl HttpActivityFeed {
    /// Creates a new activity feed client.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        shared_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            shared_secret: shared_secret.into(),
        }
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> AppResult<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(self.shared_secret.as_str())
            .json(body)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to call activity feed at '{path}': {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Internal(format!(
                "activity feed returned status {} for '{path}': {body}",
                status.as_u16()
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl ActivityFeed for HttpActivityFeed {
    async fn claim_batch(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<ClaimedActivityBatch> {
        let response = self
            .post_json(
                "/api/internal/activities/claim",
                &ClaimRequest { cursor, limit },
            )
            .await?;

        let body = response.json::<ClaimResponse>().await.map_err(|error| {
            AppError::Internal(format!("failed to parse activity feed response: {error}"))
        })?;

        // A record the feed delivered malformed is dropped with a warning so
        // one bad row cannot wedge the cursor forever.
        let mut events = Vec::with_capacity(body.events.len());
        for record in body.events {
            match record.into_event() {
                Ok(event) => events.push(event),
                Err(error) => {
                    warn!(error = %error, "dropping malformed activity feed record");
                }
            }
        }

        Ok(ClaimedActivityBatch {
            events,
            next_cursor: body.next_cursor,
        })
    }

    async fn acknowledge(&self, cursor: &str) -> AppResult<()> {
        self.post_json(
            "/api/internal/activities/ack",
            &serde_json::json!({"cursor": cursor}),
        )
        .await?;
        Ok(())
    }
}
