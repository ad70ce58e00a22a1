use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::BackendError;
use crate::integration::IntegrationType;

/// A single record returned by the backend. No schema is enforced.
pub type Item = Map<String, Value>;

pub const DEFAULT_USER: &str = "TestUser";
pub const DEFAULT_ORG: &str = "TestOrg";

/// Free-text user/org pair sent along with authorization requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: String,
    pub org: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.into(),
            org: DEFAULT_ORG.into(),
        }
    }
}

/// Shared form state: the selected integration, its credentials and the loaded items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationParams {
    #[serde(rename = "type")]
    pub integration_type: Option<IntegrationType>,
    pub credentials: Option<Value>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl IntegrationParams {
    /// Publish a `{type, credentials}` pair. Loaded items are left alone.
    pub fn set_credentials(&mut self, kind: IntegrationType, credentials: Value) {
        self.integration_type = Some(kind);
        self.credentials = Some(credentials);
    }

    pub fn has_credentials(&self) -> bool {
        self.integration_type.is_some() && self.credentials.is_some()
    }

    /// The pair a load needs, or `MissingCredentials`.
    pub fn load_target(&self) -> Result<(IntegrationType, &Value), BackendError> {
        match (self.integration_type, self.credentials.as_ref()) {
            (Some(kind), Some(credentials)) => Ok((kind, credentials)),
            _ => Err(BackendError::MissingCredentials),
        }
    }

    /// Replace `items` with a successful load; a failure leaves them untouched.
    pub fn apply_load(
        &mut self,
        result: Result<Vec<Item>, BackendError>,
    ) -> Result<usize, BackendError> {
        let items = result?;
        self.items = items;
        Ok(self.items.len())
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }
}
