use super::keys;
use super::util::RetryPolicy;
use crate::core::config::ClientConfig;
use crate::core::registry::{RegistryPayload, RegistryProvider};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

const USER_AGENT: &str = "com.bunq.tricount.android:RELEASE:7.0.7:3174:ANDROID:13:C";
const CLIENT_REQUEST_ID: &str = "049bfcdf-6ae4-4cee-af7b-45da31ea85d0";
const DEVICE_DESCRIPTION: &str = "Android";
const AUTH_HEADER: &str = "X-Bunq-Client-Authentication";

#[derive(Debug, Deserialize)]
struct InstallationResponse {
    #[serde(rename = "Response")]
    response: Vec<Value>,
}

#[derive(Debug)]
struct Session {
    token: String,
    user_id: String,
}

impl InstallationResponse {
    fn into_session(self) -> Result<Session> {
        let token = self
            .response
            .iter()
            .find_map(|item| item.get("Token")?.get("token")?.as_str())
            .ok_or_else(|| anyhow!("Installation response has no session token"))?
            .to_string();
        let user_id = self
            .response
            .iter()
            .find_map(|item| match item.get("UserPerson")?.get("id")? {
                Value::Number(id) => Some(id.to_string()),
                Value::String(id) => Some(id.clone()),
                _ => None,
            })
            .ok_or_else(|| anyhow!("Installation response has no user id"))?;
        Ok(Session { token, user_id })
    }
}

/// Fetches a registry from the Tricount API.
///
/// Every fetch registers the installation again and uses the session token
/// it returns; tokens are never stored.
pub struct TricountProvider {
    base_url: String,
    access_key: String,
    installation_id: String,
    public_key_pem: String,
    client: reqwest::Client,
}

impl TricountProvider {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let installation_id = keys::installation_id(config.app_id.as_deref());
        let public_key_pem = keys::generate_public_key_pem(config.key_bits)?;
        Self::with_identity(config, installation_id, public_key_pem)
    }

    /// Builds a provider around an existing installation id and public key.
    pub fn with_identity(
        config: &ClientConfig,
        installation_id: String,
        public_key_pem: String,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("app-id"),
            HeaderValue::from_str(&installation_id)
                .with_context(|| format!("Invalid app id: {installation_id}"))?,
        );
        headers.insert(
            HeaderName::from_static("x-bunq-client-request-id"),
            HeaderValue::from_static(CLIENT_REQUEST_ID),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_key: config.access_key.clone(),
            installation_id,
            public_key_pem,
            client,
        })
    }

    pub fn installation_id(&self) -> &str {
        &self.installation_id
    }

    async fn authenticate(&self) -> Result<Session> {
        let url = format!("{}/v1/session-registry-installation", self.base_url);
        let body = json!({
            "app_installation_uuid": self.installation_id,
            "client_public_key": self.public_key_pem,
            "device_description": DEVICE_DESCRIPTION,
        });
        debug!("Registering installation at {}", url);

        let response = RetryPolicy::DEFAULT
            .send("installation", || self.client.post(&url).json(&body).send())
            .await
            .context("Failed to send installation request")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read installation response")?;
        if !status.is_success() {
            bail!("Installation request failed with status {status}: '{response_text}'");
        }

        let installation: InstallationResponse = serde_json::from_str(&response_text)
            .with_context(|| {
                format!("Failed to parse installation response. Response: '{response_text}'")
            })?;
        let session = installation.into_session()?;
        debug!(user_id = %session.user_id, "Authenticated installation");
        Ok(session)
    }

    async fn registry(&self, session: &Session) -> Result<RegistryPayload> {
        let url = format!(
            "{}/v1/user/{}/registry?public_identifier_token={}",
            self.base_url, session.user_id, self.access_key
        );
        debug!("Requesting registry for user {}", session.user_id);

        let token = session.token.as_str();
        let response = RetryPolicy::DEFAULT
            .send("registry", || {
                self.client.get(&url).header(AUTH_HEADER, token).send()
            })
            .await
            .context("Failed to send registry request")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read registry response")?;
        if !status.is_success() {
            bail!("Registry request failed with status {status}: '{response_text}'");
        }

        match RegistryPayload::from_json_str(&response_text) {
            Ok(payload) => Ok(payload),
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse registry response"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RegistryProvider for TricountProvider {
    async fn fetch_registry(&self) -> Result<RegistryPayload> {
        let session = self.authenticate().await?;
        let payload = self.registry(&session).await?;
        debug!(
            entries = payload.entries().count(),
            "Fetched registry payload"
        );
        Ok(payload)
    }
}
