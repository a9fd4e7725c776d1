//! HTTP seam between the bot and the forge.
//!
//! Every forge interaction goes through [`ForgeTransport`], which speaks in
//! relative API paths and JSON values. The Octocrab implementation handles
//! authentication, status checking and error mapping; tests substitute a
//! mock or the in-memory fake forge.

mod client;
mod error_mapping;
mod http_utils;
mod octocrab_transport;

pub use octocrab_transport::OctocrabTransport;

use async_trait::async_trait;
use serde_json::Value;

use super::error::ForgeError;
use super::locator::ApiPath;

/// Raw JSON access to the forge REST API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForgeTransport: Send + Sync {
    /// Issues a GET request and returns the decoded body.
    async fn get(&self, path: &ApiPath) -> Result<Value, ForgeError>;

    /// Issues a POST request with a JSON body and returns the decoded reply.
    async fn post(&self, path: &ApiPath, body: &Value) -> Result<Value, ForgeError>;

    /// Issues a PUT request with a JSON body and returns the decoded reply.
    async fn put(&self, path: &ApiPath, body: &Value) -> Result<Value, ForgeError>;

    /// Issues a DELETE request.
    async fn delete(&self, path: &ApiPath) -> Result<(), ForgeError>;
}
