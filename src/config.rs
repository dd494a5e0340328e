//! Tunable settings shared by the loaders, the overlap resolver and export

use crate::error::{AsmGraphError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Graph-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Smallest overlap tried by automatic overlap detection
    pub min_auto_overlap: usize,
    /// Largest overlap tried by automatic overlap detection
    pub max_auto_overlap: usize,
    /// Line width for FASTA output
    pub fasta_line_width: usize,
    /// Number of input lines between cancellation checks
    pub checkpoint_interval: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_auto_overlap: 10,
            max_auto_overlap: 200,
            fasta_line_width: 70,
            checkpoint_interval: 1000,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; absent fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AsmGraphError::FileNotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.min_auto_overlap > self.max_auto_overlap {
            return Err(AsmGraphError::InvalidInput(format!(
                "min_auto_overlap ({}) exceeds max_auto_overlap ({})",
                self.min_auto_overlap, self.max_auto_overlap
            )));
        }
        if self.fasta_line_width == 0 {
            return Err(AsmGraphError::InvalidInput(
                "fasta_line_width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"max_auto_overlap": 99}"#).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.max_auto_overlap, 99);
        assert_eq!(settings.min_auto_overlap, 10);
        assert_eq!(settings.fasta_line_width, 70);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"min_auto_overlap": 50, "max_auto_overlap": 20}"#).unwrap();
        assert!(Settings::from_file(&path).is_err());
    }
}
