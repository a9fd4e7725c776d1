//! Loading the scan report written by the linters.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use crate::forge::error::ForgeError;
use crate::forge::issues::ScanReport;

/// Reads and decodes the scan report at `path`.
///
/// # Errors
///
/// Returns [`ForgeError::Io`] when the file cannot be opened or read, or
/// when its contents are not a valid scan report.
pub fn load_scan_report(path: &Utf8Path) -> Result<ScanReport, ForgeError> {
    let file_name = path.file_name().ok_or_else(|| ForgeError::Io {
        message: format!("invalid scan report path '{path}': no file name"),
    })?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        ForgeError::Io {
            message: format!("failed to open scan report directory '{parent}': {error}"),
        }
    })?;
    let contents = dir.read_to_string(file_name).map_err(|error| ForgeError::Io {
        message: format!("failed to read scan report '{path}': {error}"),
    })?;

    serde_json::from_str(&contents).map_err(|error| ForgeError::Io {
        message: format!("failed to parse scan report '{path}': {error}"),
    })
}
