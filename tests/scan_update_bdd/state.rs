//! Scenario state for scan update behavioural tests.

use std::rc::Rc;

use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use vigil::forge::test_support::FakeForge;
use vigil::forge::{ForgeClient, ForgeError, IssueRecord, PacingPolicy, RepositoryLocator};
use vigil::scan::ScanSummary;
use vigil::telemetry::test_support::RecordingTelemetrySink;

pub(crate) use crate::support::runtime::{SharedRuntime, ensure_runtime};

/// Login the fake forge hands out for the run token.
pub(crate) const BOT: &str = "vigil-bot";

#[derive(ScenarioState, Default)]
pub(crate) struct ScanState {
    pub(crate) runtime: Slot<SharedRuntime>,
    pub(crate) client: Slot<Rc<ForgeClient<FakeForge>>>,
    pub(crate) telemetry: Slot<Rc<RecordingTelemetrySink>>,
    pub(crate) commit: Slot<String>,
    pub(crate) ceiling: Slot<usize>,
    pub(crate) issues: Slot<Vec<IssueRecord>>,
    pub(crate) summary: Slot<ScanSummary>,
    pub(crate) error: Slot<ForgeError>,
}

impl ScanState {
    /// Returns the forge client, creating it over an empty fake on first use.
    pub(crate) fn client(&self) -> Rc<ForgeClient<FakeForge>> {
        if let Some(client) = self.client.get() {
            return client;
        }
        let locator = RepositoryLocator::from_owner_repo("octo", "cat")
            .unwrap_or_else(|error| panic!("locator should be valid: {error}"));
        let client = Rc::new(
            ForgeClient::new(FakeForge::new(BOT), locator).with_pacing(PacingPolicy::immediate()),
        );
        self.client.set(Rc::clone(&client));
        client
    }

    /// Returns the telemetry sink, creating it on first use.
    pub(crate) fn telemetry(&self) -> Rc<RecordingTelemetrySink> {
        if let Some(telemetry) = self.telemetry.get() {
            return telemetry;
        }
        let telemetry = Rc::new(RecordingTelemetrySink::default());
        self.telemetry.set(Rc::clone(&telemetry));
        telemetry
    }

    /// Returns the last scan summary, panicking with the last error when the
    /// scan failed.
    pub(crate) fn summary(&self) -> ScanSummary {
        self.summary.get().unwrap_or_else(|| {
            let error = self.error.with_ref(ToString::to_string);
            panic!("scan summary missing; last error: {error:?}")
        })
    }
}
