//! Octocrab client construction for the forge transport.

use http::Uri;
use octocrab::Octocrab;

use crate::forge::error::ForgeError;
use crate::forge::locator::PersonalAccessToken;

use super::error_mapping::map_octocrab_error;

/// Builds an Octocrab client authenticated with `token` against `api_base`.
///
/// # Errors
///
/// Returns [`ForgeError::InvalidUrl`] when `api_base` is not a URI,
/// [`ForgeError::Configuration`] when Octocrab rejects it as a base, and the
/// mapped Octocrab error when the client cannot be built.
pub(super) fn build_octocrab_client(
    token: &PersonalAccessToken,
    api_base: &str,
) -> Result<Octocrab, ForgeError> {
    let base_uri = api_base
        .parse::<Uri>()
        .map_err(|error| ForgeError::InvalidUrl(format!("{api_base}: {error}")))?;

    // A parseable URI Octocrab refuses as a base is a configured value, so it
    // maps to a usage error and not to a forge failure.
    let builder = Octocrab::builder()
        .personal_token(token.value())
        .base_uri(base_uri)
        .map_err(|error| ForgeError::Configuration {
            message: format!("api_base {api_base} is not usable as a forge API base: {error}"),
        })?;

    builder
        .build()
        .map_err(|error| map_octocrab_error("build forge client", &error))
}
