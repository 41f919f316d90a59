//! Scan results.

use serde::Serialize;

/// Images produced by a single successful `scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedSheet {
    /// Front and back image paths, in the order the driver reported them.
    pub files: [String; 2],
}

impl ScannedSheet {
    /// Build a sheet from the `file=` paths of one response.
    ///
    /// # Errors
    ///
    /// Returns the unmodified list when it does not hold exactly two paths.
    pub fn from_files(files: Vec<String>) -> std::result::Result<Self, Vec<String>> {
        <[String; 2]>::try_from(files).map(|files| Self { files })
    }
}

/// Render a list of paths the way the driver tooling logs arrays:
/// `[ 'a.jpg', 'b.jpg' ]`, or `[]` when empty.
#[must_use]
pub fn format_file_list(files: &[String]) -> String {
    if files.is_empty() {
        return "[]".to_owned();
    }
    let quoted: Vec<String> = files.iter().map(|f| format!("'{f}'")).collect();
    format!("[ {} ]", quoted.join(", "))
}
