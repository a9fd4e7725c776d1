//! Page-number driven listing of forge collections.
//!
//! Collections are requested with `page=1, 2, …` and `per_page=100` until a
//! page comes back short. Call sites choose how a failed page is handled:
//! most abort, while a few best-effort listings carry on as though the page
//! had been empty.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use super::error::ForgeError;
use super::locator::ApiPath;
use super::pacing::pause;
use super::transport::ForgeTransport;

/// Items requested per page.
pub const PAGE_SIZE: usize = 100;

/// Consecutive failed pages tolerated before a lenient listing stops.
const MAX_CONSECUTIVE_PAGE_FAILURES: u32 = 5;

/// How a failed page request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFailurePolicy {
    /// Return the error to the caller.
    #[default]
    Abort,
    /// Log the failure, count the page as empty and keep going.
    ///
    /// A failed page leaves the previous page size in place, so a failure
    /// right after a full page continues to the next page while a failure on
    /// the first page ends the listing.
    TreatAsEmpty,
}

/// Fetches every page of `endpoint` and concatenates the items.
///
/// `page_delay` is slept after each page when non-zero.
///
/// # Errors
///
/// With [`PageFailurePolicy::Abort`], returns the first transport error or a
/// [`ForgeError::Decode`] when a page body is not a JSON array.
pub async fn fetch_all_pages<T>(
    transport: &T,
    endpoint: &ApiPath,
    policy: PageFailurePolicy,
    page_delay: Duration,
) -> Result<Vec<Value>, ForgeError>
where
    T: ForgeTransport + ?Sized,
{
    let mut items = Vec::new();
    let mut page: u32 = 1;
    let mut last_page_len: usize = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        let page_path = endpoint
            .clone()
            .with_query("page", page.to_string())
            .with_query("per_page", PAGE_SIZE.to_string());

        match fetch_page(transport, &page_path).await {
            Ok(entries) => {
                consecutive_failures = 0;
                last_page_len = entries.len();
                items.extend(entries);
            }
            Err(error) => match policy {
                PageFailurePolicy::Abort => return Err(error),
                PageFailurePolicy::TreatAsEmpty => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!(
                        endpoint = %endpoint,
                        page,
                        consecutive_failures,
                        %error,
                        "page request failed, treating page as empty"
                    );
                    if consecutive_failures > MAX_CONSECUTIVE_PAGE_FAILURES {
                        break;
                    }
                }
            },
        }

        pause(page_delay).await;

        if last_page_len < PAGE_SIZE {
            break;
        }
        page = page.saturating_add(1);
    }

    Ok(items)
}

async fn fetch_page<T>(transport: &T, page_path: &ApiPath) -> Result<Vec<Value>, ForgeError>
where
    T: ForgeTransport + ?Sized,
{
    match transport.get(page_path).await? {
        Value::Array(entries) => Ok(entries),
        other => Err(ForgeError::Decode {
            operation: format!("GET {page_path}"),
            message: format!("expected a JSON array, got {}", json_kind(&other)),
        }),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
