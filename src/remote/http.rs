//! [`RemoteStore`] over a JSON document service.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `POST /auth/anonymous` with `{"existingId": ...}` returns `{"id": ...}`
//! - `GET|PUT /users/{id}` reads or replaces a [`RemoteDocument`]
//! - `GET /shortCodes/{alias}` reads an [`AliasRecord`]
//! - `PUT /shortCodes/{alias}` with `If-None-Match: *` creates one; a
//!   `412 Precondition Failed` means the alias is taken
//!
//! The service has no push channel, so [`RemoteStore::subscribe`] polls.
//!
//! The API key is sent as a bearer token and never formatted: [`HttpRemote`]
//! keeps it in a [`SecretString`] and its `Debug` output omits it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use super::{AliasRecord, RemoteDocument, RemoteStore};
use crate::config::RemoteConfig;
use crate::error::{KennzeichenError, Result};

const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    existing_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct SignInResponse {
    id: String,
}

#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
    api_key: Option<Arc<SecretString>>,
    poll_interval: Duration,
}

impl fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl HttpRemote {
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let mut base_url = Url::parse(config.base_url.trim())?;
        // Url::join drops the last segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key().map(Arc::new),
            poll_interval: config.poll_interval(),
        })
    }

    fn endpoint(&self, collection: &str, key: &str) -> Result<Url> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(KennzeichenError::Remote(format!(
                "invalid document key '{key}'"
            )));
        }
        Ok(self.base_url.join(&format!("{collection}/{key}"))?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn sign_in_anonymously(&self, existing: Option<&str>) -> Result<String> {
        let url = self.base_url.join("auth/anonymous")?;
        let response = self
            .authorize(self.client.post(url))
            .json(&SignInRequest {
                existing_id: existing,
            })
            .send()
            .await?
            .error_for_status()?;
        let body: SignInResponse = response.json().await?;
        Ok(body.id)
    }

    async fn get_document(&self, id: &str) -> Result<Option<RemoteDocument>> {
        let url = self.endpoint("users", id)?;
        self.get_json(url).await
    }

    async fn set_document(&self, id: &str, document: &RemoteDocument) -> Result<()> {
        let url = self.endpoint("users", id)?;
        self.authorize(self.client.put(url))
            .json(document)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn lookup_alias(&self, alias: &str) -> Result<Option<String>> {
        let url = self.endpoint("shortCodes", alias)?;
        let record: Option<AliasRecord> = self.get_json(url).await?;
        Ok(record.map(|r| r.user_id))
    }

    async fn reserve_alias(&self, alias: &str, id: &str) -> Result<bool> {
        let url = self.endpoint("shortCodes", alias)?;
        let record = AliasRecord {
            user_id: id.to_string(),
            created_at: Timestamp::now(),
        };
        let response = self
            .authorize(self.client.put(url))
            .header(header::IF_NONE_MATCH, "*")
            .json(&record)
            .send()
            .await?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    async fn subscribe(&self, id: &str) -> Result<mpsc::Receiver<RemoteDocument>> {
        // Validate the key up front so a bad id fails here, not in the task
        self.endpoint("users", id)?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let remote = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            let mut last_seen: Option<Timestamp> = None;
            let mut interval = tokio::time::interval(remote.poll_interval);
            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }
                match remote.get_document(&id).await {
                    Ok(Some(document)) => {
                        if last_seen == Some(document.last_modified) {
                            continue;
                        }
                        last_seen = Some(document.last_modified);
                        if tx.send(document).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("polling remote document {id} failed: {e}"),
                }
            }
            tracing::debug!("stopped polling remote document {id}");
        });
        Ok(rx)
    }
}
