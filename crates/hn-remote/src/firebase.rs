//! HTTP client for the Firebase REST interface.
//!
//! Every path is readable as `GET {base_url}/{path}.json`. A missing node
//! comes back as the JSON literal `null`. Subscriptions poll their path on
//! a fixed interval and forward a value only when it differs from the last
//! one forwarded.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use hn_types::RemoteSettings;

use crate::error::RemoteError;
use crate::path::RemotePath;
use crate::source::{RemoteEvent, RemoteSource, Subscription};

/// Configuration for the Firebase client.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Tree root, e.g. "https://hacker-news.firebaseio.com/v0"
    pub base_url: String,

    /// Upper bound for one HTTP request
    pub request_timeout: Duration,

    /// Delay between polls of a subscribed path
    pub poll_interval: Duration,

    /// Events buffered per subscription before polling waits
    pub subscription_buffer: usize,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self::from(&RemoteSettings::default())
    }
}

impl From<&RemoteSettings> for FirebaseConfig {
    fn from(settings: &RemoteSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            subscription_buffer: 4,
        }
    }
}

impl FirebaseConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_subscription_buffer(mut self, buffer: usize) -> Self {
        self.subscription_buffer = buffer.max(1);
        self
    }
}

/// Remote source backed by the Firebase REST interface.
#[derive(Clone)]
pub struct FirebaseClient {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseClient {
    /// Create a new client.
    pub fn new(config: FirebaseConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Http(e.to_string()))?;

        info!(base_url = %config.base_url, "Created Firebase client");
        Ok(Self { client, config })
    }

    fn url_for(&self, path: &RemotePath) -> String {
        format!("{}/{}.json", self.config.base_url, path.path())
    }

    async fn get(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        let url = self.url_for(path);
        debug!(url = %url, "Reading remote path");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                path: path.path(),
                status: status.as_u16(),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        match value {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

#[async_trait]
impl RemoteSource for FirebaseClient {
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        self.get(path).await
    }

    fn subscribe(&self, path: RemotePath) -> Subscription {
        let (tx, subscription) = Subscription::channel(self.config.subscription_buffer);
        let client = self.clone();
        tokio::spawn(async move { client.poll(path, tx).await });
        subscription
    }
}

impl FirebaseClient {
    async fn poll(self, path: RemotePath, tx: mpsc::Sender<RemoteEvent>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Value> = None;

        debug!(path = %path, "Subscription started");

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                _ = interval.tick() => {}
            }

            let event = match self.get(&path).await {
                Ok(value) => {
                    let value = value.unwrap_or(Value::Null);
                    if last.as_ref() == Some(&value) {
                        continue;
                    }
                    last = Some(value.clone());
                    RemoteEvent::Value(value)
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Subscription poll failed");
                    RemoteEvent::Error(e)
                }
            };

            if tx.send(event).await.is_err() {
                break;
            }
        }

        debug!(path = %path, "Subscription ended");
    }
}
