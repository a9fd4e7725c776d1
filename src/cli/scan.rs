//! Scan run wiring for the binary.

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use tracing::info;
use vigil::forge::locator::DEFAULT_API_BASE;
use vigil::telemetry::StderrJsonlTelemetrySink;
use vigil::{
    ForgeClient, ForgeError, OctocrabTransport, PersonalAccessToken, RepositoryLocator,
    ScanOptions, ScanSummary, VigilConfig, load_scan_report, run_scan,
};

/// Loads configuration, connects to the forge and runs one scan update.
///
/// # Errors
///
/// Returns [`ForgeError::Configuration`] for missing or invalid settings,
/// [`ForgeError::Io`] when the scan report cannot be read, and propagates
/// forge failures from the run.
pub async fn run() -> Result<ScanSummary, ForgeError> {
    let config = load_config()?;

    let token = PersonalAccessToken::new(config.resolve_token()?)?;
    let (owner, repo) = config.require_repository()?;
    let api_base = config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
    let locator = RepositoryLocator::with_api_base(owner, repo, api_base)?;
    let options = ScanOptions::from_config(&config)?;
    let report = load_scan_report(Utf8Path::new(config.require_scan_report()?))?;

    info!(
        repo_owner = owner,
        repo_name = repo,
        commit_id = options.commit_id.as_str(),
        issues = report.issues.len(),
        "starting scan run"
    );

    let transport = OctocrabTransport::new(&token, locator.api_base().as_str())?;
    let client = ForgeClient::new(transport, locator).with_pacing(config.pacing_policy());
    run_scan(
        &client,
        config.reconcile_settings(),
        &StderrJsonlTelemetrySink,
        report,
        &options,
    )
    .await
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`ForgeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<VigilConfig, ForgeError> {
    VigilConfig::load().map_err(|error| ForgeError::Configuration {
        message: error.to_string(),
    })
}
