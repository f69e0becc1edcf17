use std::fs;
use std::io;
use std::path::Path;

use crate::FilterError;

/// Splits ignore-file `text` into patterns, dropping blank lines and comments.
///
/// ```
/// let patterns = filters::parse_patterns("# generated\n*.log\n\n!keep.log\r\n");
/// assert_eq!(patterns, ["*.log", "!keep.log"]);
/// ```
#[must_use]
pub fn parse_patterns(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Reads the patterns of the ignore file at `path`.
///
/// A missing file yields an empty list.
pub fn load_ignore_file(path: &Path) -> Result<Vec<String>, FilterError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_patterns(&text)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(FilterError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
