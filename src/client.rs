//! Cached access to a tricount registry
use crate::core::config::ClientConfig;
use crate::core::registry::{RegistryPayload, RegistryProvider};
use crate::core::{MonthlyBreakdown, TargetMonth, breakdown, listing};
use crate::providers::TricountProvider;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Holds the last fetched registry payload.
///
/// The payload is fetched once on construction and replaced as a whole by
/// [`TricountClient::refresh`]. Readers get a shared snapshot, so a refresh
/// never changes a payload somebody is still reading.
pub struct TricountClient {
    provider: Arc<dyn RegistryProvider>,
    payload: RwLock<Arc<RegistryPayload>>,
}

impl TricountClient {
    /// Connects to the Tricount API and fetches the registry.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let provider = TricountProvider::new(config)?;
        debug!(
            installation_id = provider.installation_id(),
            "Created Tricount provider"
        );
        Self::with_provider(Arc::new(provider)).await
    }

    pub async fn with_provider(provider: Arc<dyn RegistryProvider>) -> Result<Self> {
        let payload = provider
            .fetch_registry()
            .await
            .context("Failed to fetch tricount registry")?;
        info!("Fetched tricount registry");
        Ok(Self {
            provider,
            payload: RwLock::new(Arc::new(payload)),
        })
    }

    /// The cached raw payload.
    pub async fn fetch_raw_payload(&self) -> Arc<RegistryPayload> {
        Arc::clone(&*self.payload.read().await)
    }

    /// Fetches the registry again and replaces the cached payload.
    ///
    /// On error the previous payload is kept.
    pub async fn refresh(&self) -> Result<()> {
        let fresh = self
            .provider
            .fetch_registry()
            .await
            .context("Failed to refresh tricount registry")?;
        *self.payload.write().await = Arc::new(fresh);
        info!("Refreshed tricount registry");
        Ok(())
    }

    pub async fn list_users(&self) -> BTreeMap<String, String> {
        listing::users(&*self.fetch_raw_payload().await)
    }

    pub async fn list_expense_amounts(&self, user_id: Option<&str>) -> Vec<f64> {
        listing::expense_amounts(&*self.fetch_raw_payload().await, user_id)
    }

    /// Expense total of every member, keyed by member name.
    pub async fn expense_totals_per_user(&self) -> BTreeMap<String, f64> {
        listing::expense_totals_per_user(&*self.fetch_raw_payload().await)
    }

    pub async fn monthly_breakdown(&self, month: TargetMonth) -> MonthlyBreakdown {
        breakdown::monthly_breakdown(&*self.fetch_raw_payload().await, month)
    }
}
