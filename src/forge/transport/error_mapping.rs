//! Error mapping helpers for the Octocrab transport.

use http::StatusCode;

use crate::forge::error::ForgeError;

/// Checks if a forge error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Checks whether a response is a rate limit rejection based on the HTTP
/// status and the message GitHub sent with it.
pub(super) fn is_rate_limit_response(status: StatusCode, message: Option<&str>) -> bool {
    let is_rate_limit_status = matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );

    is_rate_limit_status
        && message.is_some_and(|text| text.to_lowercase().contains("rate limit"))
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> ForgeError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return map_http_error(operation, source.status_code, Some(source.message.clone()));
    }

    if is_network_error(error) {
        return ForgeError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    ForgeError::Decode {
        operation: operation.to_owned(),
        message: error.to_string(),
    }
}

pub(super) fn map_http_error(
    operation: &str,
    status: StatusCode,
    maybe_message: Option<String>,
) -> ForgeError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    if is_auth_failure(status) {
        ForgeError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        }
    } else {
        ForgeError::Api {
            status: status.as_u16(),
            message: format!("{operation} failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use rstest::rstest;

    use super::{is_rate_limit_response, map_http_error};
    use crate::forge::error::ForgeError;

    #[rstest]
    #[case::forbidden_rate_limit(StatusCode::FORBIDDEN, Some("API rate limit exceeded"), true)]
    #[case::secondary(StatusCode::TOO_MANY_REQUESTS, Some("secondary rate limit"), true)]
    #[case::forbidden_other(StatusCode::FORBIDDEN, Some("Resource not accessible"), false)]
    #[case::not_found(StatusCode::NOT_FOUND, Some("rate limit"), false)]
    #[case::no_message(StatusCode::TOO_MANY_REQUESTS, None, false)]
    fn detects_rate_limit_responses(
        #[case] status: StatusCode,
        #[case] message: Option<&str>,
        #[case] expected: bool,
    ) {
        assert_eq!(is_rate_limit_response(status, message), expected);
    }

    #[test]
    fn unauthorised_maps_to_authentication() {
        let error = map_http_error("GET /user", StatusCode::UNAUTHORIZED, None);
        assert!(
            matches!(error, ForgeError::Authentication { ref message } if message.contains("401")),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn other_statuses_keep_their_code() {
        let error = map_http_error(
            "GET /repos/o/r/commits/abc",
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("No commit found for SHA: abc".to_owned()),
        );
        assert_eq!(
            error,
            ForgeError::Api {
                status: 422,
                message: "GET /repos/o/r/commits/abc failed: No commit found for SHA: abc"
                    .to_owned(),
            }
        );
    }
}
