//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

use jiff::Timestamp;

/// Upper bound for `next --count`
const MAX_COUNT: usize = 1000;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate the number of fire times to print
pub fn validate_count(count_str: &str) -> Result<usize, String> {
    let count: usize = count_str
        .parse()
        .map_err(|_| format!("Count must be a valid positive number, got: '{}'", count_str))?;

    if count == 0 {
        return Err("Count must be greater than 0".to_string());
    }

    if count > MAX_COUNT {
        return Err(format!("Count cannot exceed {MAX_COUNT}"));
    }

    Ok(count)
}

/// Validate an RFC 3339 instant such as `2025-01-01T00:00:00Z`
pub fn validate_timestamp(value: &str) -> Result<Timestamp, String> {
    value.trim().parse::<Timestamp>().map_err(|e| {
        format!(
            "Invalid timestamp '{}': {}. Expected RFC 3339, e.g. 2025-01-01T00:00:00Z",
            value, e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_path_validation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.toml");
        fs::write(&file, "[jobs]\n").unwrap();

        assert_eq!(
            validate_config_file_path(file.to_str().unwrap()).unwrap(),
            file
        );
        assert!(validate_config_file_path(dir.path().to_str().unwrap()).is_err());
        assert!(validate_config_file_path("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn test_count_validation_valid() {
        for count_str in ["1", "5", "100", "1000"] {
            assert!(validate_count(count_str).is_ok(), "Count {} should be valid", count_str);
        }
    }

    #[test]
    fn test_count_validation_invalid() {
        for count_str in ["0", "1001", "-1", "abc", ""] {
            assert!(validate_count(count_str).is_err(), "Count '{}' should be invalid", count_str);
        }
    }

    #[test]
    fn test_timestamp_validation() {
        let ts = validate_timestamp("2025-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.as_second(), 1_735_689_600);

        let offset = validate_timestamp("2025-01-01T08:00:00+08:00").unwrap();
        assert_eq!(offset, ts);

        assert!(validate_timestamp("2025-01-01").is_err());
        assert!(validate_timestamp("yesterday").is_err());
    }
}
