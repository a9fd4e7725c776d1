//! Keeping a label present or absent.

use super::Reconciler;
use crate::forge::cache::ResponseCache;
use crate::forge::error::ForgeError;
use crate::forge::transport::ForgeTransport;
use crate::telemetry::TelemetryEvent;

impl<T, C> Reconciler<'_, T, C>
where
    T: ForgeTransport,
    C: ResponseCache,
{
    /// Adds `name` to the pull request unless it is already there.
    /// Returns whether the label was added.
    ///
    /// # Errors
    ///
    /// Propagates forge failures.
    pub async fn ensure_label(&self, pr_number: u64, name: &str) -> Result<bool, ForgeError> {
        if self.client.find_label(pr_number, name, true).await?.is_some() {
            return Ok(false);
        }
        self.client.add_label(pr_number, name).await?;
        self.telemetry.record(TelemetryEvent::LabelAdded {
            pr_number,
            label: name.to_owned(),
        });
        Ok(true)
    }

    /// Removes `name` from the pull request when it is there.
    /// Returns whether the label was removed.
    ///
    /// # Errors
    ///
    /// Propagates forge failures.
    pub async fn ensure_label_absent(
        &self,
        pr_number: u64,
        name: &str,
    ) -> Result<bool, ForgeError> {
        if self.client.find_label(pr_number, name, true).await?.is_none() {
            return Ok(false);
        }
        self.client.remove_label(pr_number, name).await?;
        self.telemetry.record(TelemetryEvent::LabelRemoved {
            pr_number,
            label: name.to_owned(),
        });
        Ok(true)
    }
}
