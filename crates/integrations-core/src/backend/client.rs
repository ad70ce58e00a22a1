use reqwest::multipart::Form;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::integration::IntegrationType;
use crate::params::{Identity, Item};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const USER_AGENT: &str = "integrations-rs/0.1.0";

/// Errors returned by the backend client.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}{}", format_detail(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to deserialize response: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("no credentials available; connect an integration first")]
    MissingCredentials,
}

impl BackendError {
    /// Text shown to the user when an action fails: the server's `detail` when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Minimal client for the integrations backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base: Url,
}

impl BackendClient {
    /// Build a client with a custom backend base URL (useful for testing).
    pub fn with_base_url(base: &str) -> BackendResult<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, kind: IntegrationType, action: &str) -> BackendResult<Url> {
        Ok(self
            .base
            .join(&format!("integrations/{}/{action}", kind.slug()))?)
    }

    /// Send the credentials to `/integrations/{slug}/load` and return the items verbatim.
    pub async fn load_items(
        &self,
        kind: IntegrationType,
        credentials: &Value,
    ) -> BackendResult<Vec<Item>> {
        let payload = serde_json::to_string(credentials)?;
        let form = Form::new().text("credentials", payload);
        let url = self.endpoint(kind, "load")?;

        tracing::debug!(integration = kind.slug(), %url, "loading integration items");
        let response = self.post_form(url, form).await?;
        let items = response.json::<Vec<Item>>().await?;
        tracing::debug!(integration = kind.slug(), count = items.len(), "items loaded");
        Ok(items)
    }

    /// Ask the backend for the provider authorization URL.
    pub async fn authorize(&self, kind: IntegrationType, identity: &Identity) -> BackendResult<Url> {
        let url = self.endpoint(kind, "authorize")?;
        tracing::debug!(integration = kind.slug(), user = %identity.user, org = %identity.org, "requesting authorization URL");
        let response = self.post_form(url, identity_form(identity)).await?;
        let text = response.text().await?;
        let raw = match serde_json::from_str::<Value>(&text) {
            Ok(Value::String(s)) => s,
            _ => text.trim().to_owned(),
        };
        Ok(Url::parse(&raw)?)
    }

    /// Fetch the credentials the backend stored after the OAuth callback.
    pub async fn fetch_credentials(
        &self,
        kind: IntegrationType,
        identity: &Identity,
    ) -> BackendResult<Value> {
        let url = self.endpoint(kind, "credentials")?;
        tracing::debug!(integration = kind.slug(), user = %identity.user, org = %identity.org, "fetching credentials");
        let response = self.post_form(url, identity_form(identity)).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn post_form(&self, url: Url, form: Form) -> BackendResult<Response> {
        let response = self.http.post(url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            tracing::warn!(%status, detail = detail.as_deref().unwrap_or("-"), "backend request failed");
            return Err(BackendError::Status { status, detail });
        }

        Ok(response)
    }
}

fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

fn identity_form(identity: &Identity) -> Form {
    Form::new()
        .text("user_id", identity.user.clone())
        .text("org_id", identity.org.clone())
}

/// Pull the conventional `detail` field out of an error body.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
