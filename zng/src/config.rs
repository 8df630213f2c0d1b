//! Engine configuration, loaded from TOML.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::{Error, Result, context::Limits};

/// Environment variable overriding the configuration file location.
pub const ENV_CONFIG_PATH: &str = "ZNG_CONFIG_PATH";

/// What the top of a pipeline does with error-typed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Silently discard error records.
    Drop,
    /// Log error records at warn level, then discard them.
    Log,
    /// Pass error records through to the output.
    #[default]
    Emit,
}

impl ErrorPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        ErrorPolicy::iter().find(|p| p.to_str() == s)
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            ErrorPolicy::Drop => "drop",
            ErrorPolicy::Log => "log",
            ErrorPolicy::Emit => "emit",
        }
    }
}

fn default_limit() -> u64 {
    100_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub error_policy: ErrorPolicy,

    /// Maximum record width accepted in a type value.
    #[serde(default = "default_limit")]
    pub max_columns: u64,

    #[serde(default = "default_limit")]
    pub max_union_types: u64,

    #[serde(default = "default_limit")]
    pub max_enum_symbols: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            max_columns: default_limit(),
            max_union_types: default_limit(),
            max_enum_symbols: default_limit(),
        }
    }
}

impl EngineConfig {
    /// Location of the configuration file.
    ///
    /// `ZNG_CONFIG_PATH` wins if set; otherwise `$XDG_CONFIG_HOME/zng/config.toml`
    /// or `$HOME/.config/zng/config.toml`.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            path.push(xdg_config_home);
        } else if let Ok(home) = std::env::var("HOME") {
            path.push(home);
            path.push(".config");
        }
        path.push("zng");
        path.push("config.toml");
        path
    }

    /// Load the configuration at `path`, or at [`Self::default_path`] when
    /// `path` is `None`. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_toml(path),
            None => {
                let path = Self::default_path();
                if path.is_file() {
                    Self::load_from_toml(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)?;
        Self::from_toml_str(&toml_str).map_err(|e| match e {
            Error::ConfigParse { source, .. } => Error::ConfigParse {
                source,
                file: path.display().to_string(),
            },
            e => e,
        })
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::ConfigParse {
            source: e,
            file: String::from("<string>"),
        })
    }

    pub fn save_to_toml(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string(self).map_err(|e| {
            Error::ConfigSerialize(format!(
                "failed during serialization of TOML to path `{}`: {}",
                path.display(),
                e
            ))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Decode bounds for a [`TypeContext`](crate::TypeContext).
    pub fn limits(&self) -> Limits {
        Limits {
            max_columns: self.max_columns,
            max_union_types: self.max_union_types,
            max_enum_symbols: self.max_enum_symbols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg = EngineConfig::from_toml_str("error_policy = \"log\"\n").unwrap();
        assert_eq!(cfg.error_policy, ErrorPolicy::Log);
        assert_eq!(cfg.max_columns, 100_000);
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        assert!(EngineConfig::from_toml_str("error_policy = \"explode\"").unwrap_err().is_config_parse());
        assert!(EngineConfig::from_toml_str("max_columns = [").unwrap_err().is_config_parse());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("zng-config-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let cfg = EngineConfig {
            error_policy: ErrorPolicy::Drop,
            max_union_types: 7,
            ..EngineConfig::default()
        };
        cfg.save_to_toml(&path).unwrap();
        assert_eq!(EngineConfig::load(Some(&path)).unwrap(), cfg);
        assert_eq!(EngineConfig::load_from_toml(&path).unwrap().limits().max_union_types, 7);
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(EngineConfig::load_from_toml(&path).unwrap_err().is_io());
    }

    #[test]
    fn policy_names() {
        for p in ErrorPolicy::iter() {
            assert_eq!(ErrorPolicy::from_str(p.to_str()), Some(p));
        }
    }
}
