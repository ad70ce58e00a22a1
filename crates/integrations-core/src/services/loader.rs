use serde_json::Value;

use crate::backend::{BackendClient, BackendResult};
use crate::integration::IntegrationType;
use crate::params::{IntegrationParams, Item};

/// Loads and clears integration items held in [`IntegrationParams`].
#[derive(Clone)]
pub struct DataLoader {
    client: BackendClient,
}

impl DataLoader {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Fetch items without touching any state, so callers can run it on a spawned task.
    pub async fn fetch(&self, kind: IntegrationType, credentials: Value) -> BackendResult<Vec<Item>> {
        self.client.load_items(kind, &credentials).await
    }

    /// Fetch items for the current pair and replace `params.items` on success.
    pub async fn load(&self, params: &mut IntegrationParams) -> BackendResult<usize> {
        let (kind, credentials) = params.load_target()?;
        let result = self.client.load_items(kind, credentials).await;
        if let Err(err) = &result {
            tracing::warn!(integration = kind.slug(), error = %err, "load failed; keeping previous items");
        }
        params.apply_load(result)
    }

    pub fn clear(&self, params: &mut IntegrationParams) {
        params.clear_items();
    }
}
