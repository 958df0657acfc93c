//! # HTTP Backend Clients
//!
//! Concrete [`RecordStore`] and [`AuthProvider`] implementations over the
//! case data REST API. The update call wraps the backend's two-phase
//! start-event/submit-event protocol and surfaces it as one atomic operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::record::{CaseRecord, SearchPage};
use crate::store::{AuthProvider, EventMetadata, RecordStore, StoreError};

#[derive(Debug, Deserialize)]
struct CaseDto {
    id: i64,
    #[serde(default)]
    jurisdiction: Option<String>,
    #[serde(default)]
    case_type_id: Option<String>,
    #[serde(default)]
    created_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "data")]
    case_data: Map<String, Value>,
}

impl From<CaseDto> for CaseRecord {
    fn from(dto: CaseDto) -> Self {
        CaseRecord {
            id: dto.id,
            jurisdiction: dto.jurisdiction,
            case_type_id: dto.case_type_id,
            created_date: dto.created_date,
            data: dto.case_data,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponseDto {
    total: u64,
    #[serde(default)]
    cases: Vec<CaseDto>,
}

#[derive(Debug, Deserialize)]
struct StartEventDto {
    token: String,
    event_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponseDto {
    access_token: String,
}

/// Case data API client.
pub struct HttpRecordStore {
    client: reqwest::Client,
    base_url: String,
    case_type: String,
}

impl HttpRecordStore {
    pub fn new(base_url: impl Into<String>, case_type: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_trailing_slash(base_url.into()),
            case_type: case_type.into(),
        }
    }

    async fn rejected(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        StoreError::Rejected { status, message }
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn fetch_one(&self, token: &str, case_id: i64) -> Result<CaseRecord, StoreError> {
        let url = format!("{}/cases/{case_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound { case_id });
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        let dto: CaseDto = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(dto.into())
    }

    async fn search_page(&self, token: &str, body: &Value) -> Result<SearchPage, StoreError> {
        let url = format!("{}/searchCases?ctid={}", self.base_url, self.case_type);
        debug!(case_type = %self.case_type, "executing case search");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        let dto: SearchResponseDto = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(SearchPage {
            records: dto.cases.into_iter().map(CaseRecord::from).collect(),
            total: dto.total,
        })
    }

    async fn update(
        &self,
        token: &str,
        case_id: i64,
        event: &EventMetadata,
        data: Map<String, Value>,
    ) -> Result<CaseRecord, StoreError> {
        // Phase one: start the event and obtain the event token
        let start_url = format!(
            "{}/cases/{case_id}/event-triggers/{}",
            self.base_url, event.id
        );
        let response = self
            .client
            .get(&start_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound { case_id });
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        let start: StartEventDto = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        // Phase two: submit the transformed data under the event token
        let submit_url = format!("{}/cases/{case_id}/events", self.base_url);
        let submit_body = json!({
            "event": {
                "id": start.event_id,
                "summary": event.summary,
                "description": event.description,
            },
            "event_token": start.token,
            "data": data,
        });
        let response = self
            .client
            .post(&submit_url)
            .bearer_auth(token)
            .json(&submit_body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        let dto: CaseDto = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(dto.into())
    }
}

/// Identity provider client: exchanges credentials for a bearer token once
/// per run.
pub struct HttpAuthProvider {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpAuthProvider {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_trailing_slash(base_url.into()),
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn token(&self) -> Result<String, StoreError> {
        let url = format!("{}/loginUser", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HttpRecordStore::rejected(response).await);
        }
        let token: TokenResponseDto = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(token.access_token)
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
