//! Issues reported by scanners and how they become inline comments.
//!
//! Scanners hand over [`IssueRecord`]s keyed by file and line. Before they
//! can be posted, duplicates are collapsed, each line is mapped to its
//! position in the pull request diff and the record is rendered into the
//! comment body the bot posts.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Severity class of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    /// Must be fixed; requests changes on the pull request.
    Error,
    /// Should be looked at.
    Warning,
    /// Informational only.
    Info,
}

impl IssueLevel {
    const fn label(self) -> &'static str {
        match self {
            Self::Error => ":no_entry_sign: Error",
            Self::Warning => ":exclamation: Warning",
            Self::Info => "Info",
        }
    }
}

/// One issue found by a scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Repository-relative path of the file.
    pub file_name: String,
    /// Line in the file, 1-based.
    pub file_line: u32,
    /// Human-readable description.
    pub message: String,
    /// Severity class.
    pub level: IssueLevel,
    /// Scanner that reported the issue.
    pub source: String,
    /// Scanner-specific severity number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u32>,
}

/// Identity of an issue for duplicate suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueKey {
    /// File path.
    pub file_name: String,
    /// File line.
    pub file_line: u32,
    /// Issue message.
    pub message: String,
    /// Reporting scanner.
    pub source: String,
}

impl IssueRecord {
    /// Key identifying this issue among duplicates.
    #[must_use]
    pub fn key(&self) -> IssueKey {
        IssueKey {
            file_name: self.file_name.clone(),
            file_line: self.file_line,
            message: self.message.clone(),
            source: self.source.clone(),
        }
    }

    /// Whether the issue requests changes.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.level, IssueLevel::Error)
    }
}

/// Drops repeated issues, keeping the first of each key in input order.
#[must_use]
pub fn dedupe_issues(issues: Vec<IssueRecord>) -> Vec<IssueRecord> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.key()))
        .collect()
}

/// Renders the inline comment body for an issue.
///
/// # Example
///
/// ```
/// use vigil::forge::issues::{IssueLevel, IssueRecord, render_comment_body};
///
/// let issue = IssueRecord {
///     file_name: "a.php".to_owned(),
///     file_line: 3,
///     message: "All output should be escaped.".to_owned(),
///     level: IssueLevel::Warning,
///     source: "phpcs".to_owned(),
///     severity: Some(5),
/// };
/// assert_eq!(
///     render_comment_body(&issue),
///     "**:exclamation: Warning ( severity 5 )**: All output should be escaped."
/// );
/// ```
#[must_use]
pub fn render_comment_body(issue: &IssueRecord) -> String {
    let severity = issue
        .severity
        .map(|value| format!(" ( severity {value} )"))
        .unwrap_or_default();
    format!("**{}{severity}**: {}", issue.level.label(), issue.message)
}

/// Reduces a comment body to the issue message it carries.
///
/// A leading bold `**…**:` label is removed and surrounding whitespace
/// trimmed, so a comment posted with a different level or severity label
/// still matches the same issue.
#[must_use]
pub fn normalize_comment_body(body: &str) -> String {
    let trimmed = body.trim();
    let without_label = trimmed
        .strip_prefix("**")
        .and_then(|rest| rest.split_once("**:"))
        .map_or(trimmed, |(_, message)| message);
    without_label.trim().to_owned()
}

/// Diff positions of changed lines, per file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<Option<u32>>>")]
pub struct DiffPositions {
    files: BTreeMap<String, BTreeMap<u32, u32>>,
}

impl DiffPositions {
    /// Builds positions from changed-line vectors.
    ///
    /// Each vector is indexed by diff position and holds the file line at
    /// that position, or `None` for removed lines and hunk headers. When a
    /// line appears more than once the first position wins.
    #[must_use]
    pub fn from_changed_lines(changed: BTreeMap<String, Vec<Option<u32>>>) -> Self {
        let files = changed
            .into_iter()
            .map(|(file, lines)| {
                let mut positions = BTreeMap::new();
                for (index, line) in lines.into_iter().enumerate() {
                    let (Some(file_line), Ok(position)) = (line, u32::try_from(index)) else {
                        continue;
                    };
                    positions.entry(file_line).or_insert(position);
                }
                (file, positions)
            })
            .collect();
        Self { files }
    }

    /// Diff position of `line` in `file`, when the line is part of the diff.
    #[must_use]
    pub fn position_for(&self, file: &str, line: u32) -> Option<u32> {
        self.files.get(file)?.get(&line).copied()
    }

    /// Whether no file has any changed line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.values().all(BTreeMap::is_empty)
    }
}

impl From<BTreeMap<String, Vec<Option<u32>>>> for DiffPositions {
    fn from(changed: BTreeMap<String, Vec<Option<u32>>>) -> Self {
        Self::from_changed_lines(changed)
    }
}

/// Scanner output for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScanReport {
    /// Issues found in the changed files.
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
    /// Diff positions of changed lines.
    #[serde(default)]
    pub diff_positions: DiffPositions,
}
