//! Response body helpers shared by the transport.

use serde_json::Value;

/// Pulls the `message` field out of a forge error body, if present.
pub(super) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// Decodes a success body, treating an empty body (204 responses) as null.
pub(super) fn decode_body(operation: &str, body: &str) -> Result<Value, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).inspect_err(|error| {
        tracing::debug!(operation, %error, "response body is not JSON");
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::Value;

    use super::{decode_body, extract_github_message};

    #[rstest]
    #[case::json_message(r#"{"message":"Not Found"}"#, Some("Not Found"))]
    #[case::no_message(r#"{"errors":[]}"#, None)]
    #[case::not_json("<html>bad gateway</html>", None)]
    fn extracts_message_field(#[case] body: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_github_message(body).as_deref(), expected);
    }

    #[test]
    fn empty_body_decodes_to_null() {
        let value = decode_body("DELETE /x", "  ").expect("empty body should decode");
        assert_eq!(value, Value::Null);
    }
}
