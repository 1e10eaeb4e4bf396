use std::fmt::{Display, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Request, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// The host automation runtime, seen through its REST API: entity state
/// snapshots in, state publications and service calls out.
#[async_trait]
pub trait HostHub {
    /// Fetch the current state of an entity. `Ok(None)` means the host does
    /// not know the entity (yet); that is not an error here.
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, HubError>;

    /// Create or replace an entity's state and attributes on the host.
    async fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: Value,
    ) -> Result<(), HubError>;

    /// Invoke a host service, e.g. `climate.set_temperature`.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> Result<(), HubError>;
}

#[derive(Debug)]
pub enum HubError {
    Network(reqwest::Error),
    Json(serde_json::Error),
    Status(u16),
}

impl Display for HubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self {
            HubError::Network(e) => write!(f, "Network Error: {}", e),
            HubError::Json(e) => write!(f, "Deserialization Error: {}", e),
            HubError::Status(code) => write!(f, "Host answered with status {}", code),
        }
    }
}

impl std::error::Error for HubError {}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        HubError::Network(e)
    }
}

/// An entity snapshot as the host reports it.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EntityState {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: Value,
    last_updated: Option<DateTime<Utc>>,
}

impl EntityState {
    pub fn get_entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn get_state(&self) -> &str {
        &self.state
    }

    pub fn get_last_updated(&self) -> Option<&DateTime<Utc>> {
        self.last_updated.as_ref()
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn attribute_f32(&self, name: &str) -> Option<f32> {
        self.attributes
            .get(name)
            .and_then(Value::as_f64)
            .map(|value| value as f32)
    }
}

pub struct RestHostHub {
    base_url: String,
    token: String,
    client: Client,
}

impl RestHostHub {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            client: Client::new(),
        }
    }

    fn new_request(
        &self,
        method: Method,
        location: &str,
        body: Option<&Value>,
    ) -> Result<Request, reqwest::Error> {
        let mut builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, location))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(3));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.build()
    }

    async fn execute_expecting_success(&self, request: Request) -> Result<(), HubError> {
        let response = self.client.execute(request).await?;
        if !response.status().is_success() {
            return Err(HubError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl HostHub for RestHostHub {
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, HubError> {
        let request = self.new_request(Method::GET, &format!("api/states/{}", entity_id), None)?;
        let response = self.client.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(HubError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(HubError::Json)
    }

    async fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: Value,
    ) -> Result<(), HubError> {
        let payload = serde_json::json!({
            "state": state,
            "attributes": attributes,
        });
        let request = self.new_request(
            Method::POST,
            &format!("api/states/{}", entity_id),
            Some(&payload),
        )?;
        self.execute_expecting_success(request).await
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> Result<(), HubError> {
        let request = self.new_request(
            Method::POST,
            &format!("api/services/{}/{}", domain, service),
            Some(&data),
        )?;
        self.execute_expecting_success(request).await
    }
}
