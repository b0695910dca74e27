// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}

/// Search paths for the combined `xmitd.toml` config file
/// (current directory → XDG config → /etc).
pub fn combined_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("xmitd.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("xmitd").join("xmitd.toml"));
    }
    paths.push(PathBuf::from("/etc/xmitd/xmitd.toml"));
    paths
}

/// Extract and deserialize a named section from a TOML file.
///
/// Returns `Ok(Some(cfg))` when the section is present and parses cleanly,
/// `Ok(None)` when the section is absent, or `Err` on I/O / parse failure.
fn load_section_from_file<T: DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

    let table: toml::Table = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let Some(section) = table.get(key) else {
        return Ok(None);
    };

    let section_toml = toml::to_string(section)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    let cfg = toml::from_str::<T>(&section_toml)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    Ok(Some(cfg))
}

/// Trait for loading configuration files with tiered default search paths (§4.8).
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Config filename, e.g. `"xmitd.toml"`.
    fn config_filename() -> &'static str;

    /// Section key inside a combined `xmitd.toml` file. `None` (the default)
    /// disables combined-file support.
    fn combined_key() -> Option<&'static str> {
        None
    }

    /// Load config from a specific file path.
    ///
    /// If `combined_key()` is set and the file contains that section header,
    /// only that section is deserialized; otherwise the whole file is used.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if let Some(key) = Self::combined_key() {
            if let Ok(Some(cfg)) = load_section_from_file::<Self>(path, key) {
                return Ok(cfg);
            }
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Search default paths and load the first config found.
    ///
    /// Search order, per tier (CWD → XDG → `/etc`):
    ///   1. the combined file with our section header, if `combined_key()` is set;
    ///   2. the per-binary flat file.
    ///
    /// Returns `(config, path_where_found)`, or `(Self::default(), None)` if
    /// nothing was found.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let combined = combined_config_paths();
        let flat = Self::default_search_paths();

        let tiers = combined.len().max(flat.len());
        for i in 0..tiers {
            if let Some(key) = Self::combined_key() {
                if let Some(path) = combined.get(i) {
                    if path.exists() {
                        if let Some(cfg) = load_section_from_file::<Self>(path, key)? {
                            return Ok((cfg, Some(path.clone())));
                        }
                    }
                }
            }
            if let Some(path) = flat.get(i) {
                if path.exists() {
                    let cfg = Self::load_from_file(path)?;
                    return Ok((cfg, Some(path.clone())));
                }
            }
        }
        Ok((Self::default(), None))
    }

    /// Default search paths for the per-binary flat config file
    /// (current dir → XDG → `/etc`).
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(Self::config_filename())];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("xmitd").join(Self::config_filename()));
        }

        paths.push(PathBuf::from("/etc/xmitd").join(Self::config_filename()));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        value: u32,
    }

    impl ConfigFile for Sample {
        fn config_filename() -> &'static str {
            "sample.toml"
        }
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "xmit-app-config-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .subsec_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn load_from_file_reads_flat_document() {
        let dir = tempdir();
        let path = dir.join("sample.toml");
        std::fs::write(&path, "value = 7\n").unwrap();
        let cfg = Sample::load_from_file(&path).unwrap();
        assert_eq!(cfg, Sample { value: 7 });
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir();
        let path = dir.join("does-not-exist.toml");
        assert!(matches!(
            Sample::load_from_file(&path),
            Err(ConfigError::ReadError(_, _))
        ));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let dir = tempdir();
        let path = dir.join("sample.toml");
        std::fs::write(&path, "value = not-a-number\n").unwrap();
        assert!(matches!(
            Sample::load_from_file(&path),
            Err(ConfigError::ParseError(_, _))
        ));
    }

    #[test]
    fn default_search_paths_prefer_current_directory() {
        let paths = Sample::default_search_paths();
        assert_eq!(paths[0], PathBuf::from("sample.toml"));
    }
}
