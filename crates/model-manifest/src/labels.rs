// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use crate::ManifestError;
use std::path::Path;

/// Reads a features file: one label per line, line `i` naming class `i`.
///
/// Trailing whitespace (including `\r`) is stripped from each line and
/// trailing blank lines are dropped. Interior blank lines are kept so class
/// indices stay aligned.
pub fn read_labels(path: &Path) -> Result<Vec<String>, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Labels {
        path: path.to_path_buf(),
        source,
    })?;

    let mut labels: Vec<String> = content.lines().map(|l| l.trim_end().to_string()).collect();
    while labels.last().is_some_and(|l| l.is_empty()) {
        labels.pop();
    }
    tracing::debug!("read {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_labels() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "n01440764 tench\r\nn01443537 goldfish\n\nn01484850 shark  \n\n\n").unwrap();

        let labels = read_labels(file.path()).unwrap();
        assert_eq!(
            labels,
            vec!["n01440764 tench", "n01443537 goldfish", "", "n01484850 shark"]
        );
    }

    #[test]
    fn test_missing_labels_file() {
        let err = read_labels(Path::new("/nonexistent/synset.txt")).unwrap_err();
        assert!(matches!(err, ManifestError::Labels { .. }));
    }
}
