use std::future::Future;

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::backend::{BackendClient, BackendError};
use crate::integration::IntegrationType;
use crate::params::{Identity, IntegrationParams};

/// Errors surfaced while obtaining credentials for an integration.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to launch system browser: {0}")]
    BrowserLaunch(String),
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("authorization flow cancelled")]
    Cancelled,
}

impl CredentialError {
    pub fn user_message(&self) -> String {
        match self {
            CredentialError::Backend(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Parse manually supplied credentials. Only JSON objects are accepted.
pub fn parse_credentials(raw: &str) -> Result<Value, CredentialError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|err| CredentialError::InvalidCredentials(err.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(CredentialError::InvalidCredentials(
            "expected a JSON object".into(),
        ))
    }
}

/// Drives the backend OAuth flow that each integration's credential view uses.
#[derive(Clone)]
pub struct CredentialService {
    client: BackendClient,
}

impl CredentialService {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub async fn authorization_url(
        &self,
        kind: IntegrationType,
        identity: &Identity,
    ) -> Result<Url, CredentialError> {
        Ok(self.client.authorize(kind, identity).await?)
    }

    pub async fn fetch(
        &self,
        kind: IntegrationType,
        identity: &Identity,
    ) -> Result<Value, CredentialError> {
        Ok(self.client.fetch_credentials(kind, identity).await?)
    }

    /// Run the full flow: obtain the authorization URL, show/open it, wait for the
    /// user to finish in the browser, then fetch the stored credentials.
    pub async fn connect<N, W, Fut>(
        &self,
        kind: IntegrationType,
        identity: &Identity,
        open_browser: bool,
        notify: N,
        wait_for_user: W,
    ) -> Result<Value, CredentialError>
    where
        N: Fn(&Url) -> Result<(), CredentialError>,
        W: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), CredentialError>>,
    {
        let url = self.authorization_url(kind, identity).await?;
        notify(&url)?;
        if open_browser {
            if let Err(err) = launch_browser(&url) {
                tracing::warn!(error = %err, "browser launch failed; continuing with printed URL");
            }
        }
        wait_for_user().await?;
        self.fetch(kind, identity).await
    }

    /// Connect and publish the resulting pair into `params`.
    pub async fn connect_into<N, W, Fut>(
        &self,
        params: &mut IntegrationParams,
        kind: IntegrationType,
        identity: &Identity,
        open_browser: bool,
        notify: N,
        wait_for_user: W,
    ) -> Result<(), CredentialError>
    where
        N: Fn(&Url) -> Result<(), CredentialError>,
        W: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), CredentialError>>,
    {
        let credentials = self
            .connect(kind, identity, open_browser, notify, wait_for_user)
            .await?;
        params.set_credentials(kind, credentials);
        Ok(())
    }
}

pub fn launch_browser(url: &Url) -> Result<(), CredentialError> {
    open::that(url.as_str()).map_err(|err| CredentialError::BrowserLaunch(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn parse_accepts_objects_only() {
        assert_eq!(
            parse_credentials(r#" {"access_token":"x"} "#).unwrap()["access_token"],
            "x"
        );
        assert!(matches!(
            parse_credentials("[1,2]"),
            Err(CredentialError::InvalidCredentials(_))
        ));
        assert!(matches!(
            parse_credentials("token"),
            Err(CredentialError::InvalidCredentials(_))
        ));
    }

    #[tokio::test]
    async fn connect_publishes_pair() {
        let server = MockServer::start();
        let authorize = server.mock(|when, then| {
            when.method(POST).path("/integrations/notion/authorize");
            then.status(200)
                .json_body_obj(&json!("https://api.notion.com/v1/oauth/authorize?owner=user"));
        });
        let credentials = server.mock(|when, then| {
            when.method(POST)
                .path("/integrations/notion/credentials")
                .body_contains("TestOrg");
            then.status(200)
                .json_body_obj(&json!({ "access_token": "secret" }));
        });

        let service =
            CredentialService::new(BackendClient::with_base_url(&server.base_url()).unwrap());
        let mut params = IntegrationParams::default();
        let notified = AtomicBool::new(false);
        service
            .connect_into(
                &mut params,
                IntegrationType::Notion,
                &Identity::default(),
                false,
                |url| {
                    assert_eq!(url.host_str(), Some("api.notion.com"));
                    notified.store(true, Ordering::SeqCst);
                    Ok(())
                },
                || async { Ok(()) },
            )
            .await
            .unwrap();

        authorize.assert();
        credentials.assert();
        assert!(notified.load(Ordering::SeqCst));
        assert_eq!(params.integration_type, Some(IntegrationType::Notion));
        assert_eq!(params.credentials.unwrap()["access_token"], "secret");
    }

    #[tokio::test]
    async fn cancelled_wait_skips_credentials_fetch() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/integrations/hubspot/authorize");
            then.status(200).body("https://app.hubspot.com/oauth/authorize");
        });
        let credentials = server.mock(|when, then| {
            when.method(POST).path("/integrations/hubspot/credentials");
            then.status(200).json_body_obj(&json!({}));
        });

        let service =
            CredentialService::new(BackendClient::with_base_url(&server.base_url()).unwrap());
        let err = service
            .connect(
                IntegrationType::Hubspot,
                &Identity::default(),
                false,
                |_| Ok(()),
                || async { Err(CredentialError::Cancelled) },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CredentialError::Cancelled));
        credentials.assert_hits(0);
    }

    #[tokio::test]
    async fn missing_stored_credentials_surface_detail() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/integrations/airtable/credentials");
            then.status(400)
                .json_body_obj(&json!({ "detail": "No credentials found." }));
        });

        let service =
            CredentialService::new(BackendClient::with_base_url(&server.base_url()).unwrap());
        let err = service
            .fetch(IntegrationType::Airtable, &Identity::default())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "No credentials found.");
    }
}
