//! Octocrab-backed implementation of [`ForgeTransport`].

use async_trait::async_trait;
use http::Uri;
use octocrab::Octocrab;
use serde_json::Value;

use crate::forge::error::ForgeError;
use crate::forge::locator::{ApiPath, PersonalAccessToken, rate_limit_path};
use crate::forge::rate_limit::{ApiRateLimitResponse, RateLimitInfo};

use super::ForgeTransport;
use super::client::build_octocrab_client;
use super::error_mapping::{is_rate_limit_response, map_http_error, map_octocrab_error};
use super::http_utils::{decode_body, extract_github_message};

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Transport that sends authenticated requests through Octocrab.
pub struct OctocrabTransport {
    client: Octocrab,
}

impl OctocrabTransport {
    /// Creates a transport for the given token and API base URL.
    ///
    /// # Arguments
    ///
    /// * `token` - Personal access token for authentication.
    /// * `api_base` - Base URL for the API (e.g. `https://api.github.com`).
    ///
    /// # Errors
    ///
    /// Returns an error if the Octocrab client cannot be built.
    pub fn new(token: &PersonalAccessToken, api_base: &str) -> Result<Self, ForgeError> {
        let client = build_octocrab_client(token, api_base)?;
        Ok(Self { client })
    }

    async fn send(
        &self,
        verb: Verb,
        path: &ApiPath,
        body: Option<&Value>,
    ) -> Result<String, ForgeError> {
        let operation = format!("{} {path}", verb.as_str());
        let uri: Uri = path
            .to_string()
            .parse::<Uri>()
            .map_err(|error| ForgeError::InvalidUrl(error.to_string()))?;

        let sent = match verb {
            Verb::Get => self.client._get(uri).await,
            Verb::Post => self.client._post(uri, body).await,
            Verb::Put => self.client._put(uri, body).await,
            Verb::Delete => self.client._delete(uri, body).await,
        };
        let response = sent.map_err(|error| map_octocrab_error(&operation, &error))?;

        let status = response.status();
        if status.is_success() {
            return self
                .client
                .body_to_string(response)
                .await
                .map_err(|error| ForgeError::Network {
                    message: format!("{operation} response read failed: {error}"),
                });
        }

        let error_body = self
            .client
            .body_to_string(response)
            .await
            .unwrap_or_else(|_| String::new());
        let message = extract_github_message(&error_body);

        if is_rate_limit_response(status, message.as_deref()) {
            return Err(self.rate_limit_error(&operation, message).await);
        }

        Err(map_http_error(&operation, status, message))
    }

    /// Builds a [`ForgeError::RateLimitExceeded`], attaching the current
    /// window when it can still be fetched.
    async fn rate_limit_error(&self, operation: &str, message: Option<String>) -> ForgeError {
        let rate_limit = self.fetch_rate_limit_info().await;
        let base_message = format!(
            "{operation} failed: {message}",
            message = message.unwrap_or_else(|| "rate limit exceeded".to_owned())
        );
        let full_message = match &rate_limit {
            Some(info) => format!(
                "{base_message} (resets at {reset})",
                reset = info.reset_at()
            ),
            None => base_message,
        };

        ForgeError::RateLimitExceeded {
            rate_limit,
            message: full_message,
        }
    }

    async fn fetch_rate_limit_info(&self) -> Option<RateLimitInfo> {
        let uri: Uri = rate_limit_path().to_string().parse::<Uri>().ok()?;
        let response = self.client._get(uri).await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = self.client.body_to_string(response).await.ok()?;
        let parsed: ApiRateLimitResponse = serde_json::from_str(&body).ok()?;
        Some(parsed.rate.into())
    }

    fn decode(operation: &str, body: &str) -> Result<Value, ForgeError> {
        decode_body(operation, body).map_err(|error| ForgeError::Decode {
            operation: operation.to_owned(),
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl ForgeTransport for OctocrabTransport {
    async fn get(&self, path: &ApiPath) -> Result<Value, ForgeError> {
        let body = self.send(Verb::Get, path, None).await?;
        Self::decode(&format!("GET {path}"), &body)
    }

    async fn post(&self, path: &ApiPath, body: &Value) -> Result<Value, ForgeError> {
        let reply = self.send(Verb::Post, path, Some(body)).await?;
        Self::decode(&format!("POST {path}"), &reply)
    }

    async fn put(&self, path: &ApiPath, body: &Value) -> Result<Value, ForgeError> {
        let reply = self.send(Verb::Put, path, Some(body)).await?;
        Self::decode(&format!("PUT {path}"), &reply)
    }

    async fn delete(&self, path: &ApiPath) -> Result<(), ForgeError> {
        self.send(Verb::Delete, path, None).await.map(|_| ())
    }
}
