//! Tool configuration.
//!
//! Loaded once per invocation and passed explicitly to every component.
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `<config dir>/jast/config.toml` (or the file named by `JAST_CONFIG`)
//! 3. `JAST_<SECTION>__<KEY>` environment variables (case-insensitive)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::local::ScriptLayout;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "JAST_CONFIG";
const ENV_PREFIX: &str = "JAST_";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub jamf: JamfConfig,
    pub scripts: ScriptsConfig,
    pub sync: SyncConfig,
}

/// Management server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JamfConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for JamfConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where scripts live inside the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub path: PathBuf,
    pub metadata_in_subfolder: bool,
    pub extension: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            metadata_in_subfolder: true,
            extension: "sh".to_string(),
        }
    }
}

/// Push behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Deactivate instead of destroying remote records on local deletion.
    pub soft_delete: bool,
    /// Category deactivated scripts are moved to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_delete_category: Option<String>,
    pub history_policy: HistoryPolicy,
}

/// What a failed history-note append does to the push that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryPolicy {
    /// Collect the failure, report it, keep pushing.
    #[default]
    BestEffort,
    /// Abort the push.
    Strict,
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPolicy::BestEffort => write!(f, "best-effort"),
            HistoryPolicy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            other => Err(format!("expected best-effort or strict, got '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

impl Config {
    /// `$JAST_CONFIG`, else `<config dir>/jast/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("jast").join("config.toml"))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Parse the file at `path`. A missing file yields the defaults so that a
    /// purely environment-driven setup works.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File at [`Config::default_path`] with process environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_at(&Self::default_path()?)?;
        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to `path` via a `.tmp` sibling and `rename`.
    pub fn save_at(&self, path: &Path) -> Result<(), ConfigError> {
        let io = |path: &Path, source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io(dir, e))?;
        }
        let text = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, text).map_err(|e| io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| io(path, e))?;
        Ok(())
    }

    /// Apply `JAST_<SECTION>__<KEY>` overrides from `vars`. Unknown keys
    /// under the prefix are ignored.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let upper = key.to_ascii_uppercase();
            let Some(name) = upper.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "JAMF__URL" => self.jamf.url = value,
                "JAMF__USER" => self.jamf.user = value,
                "JAMF__PASSWORD" => self.jamf.password = value,
                "JAMF__TIMEOUT_SECS" => self.jamf.timeout_secs = parse_value(&key, &value)?,
                "SCRIPTS__PATH" => self.scripts.path = PathBuf::from(value),
                "SCRIPTS__METADATA_IN_SUBFOLDER" => {
                    self.scripts.metadata_in_subfolder = parse_bool(&key, &value)?
                }
                "SCRIPTS__EXTENSION" => self.scripts.extension = value,
                "SYNC__SOFT_DELETE" => self.sync.soft_delete = parse_bool(&key, &value)?,
                "SYNC__SOFT_DELETE_CATEGORY" => {
                    self.sync.soft_delete_category = Some(value).filter(|v| !v.is_empty())
                }
                "SYNC__HISTORY_POLICY" => self.sync.history_policy = parse_value(&key, &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Checks that hold for every command, remote or not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scripts.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid {
                key: "scripts.extension".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.jamf.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "jamf.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Checks required before any call to the management server.
    pub fn require_remote(&self) -> Result<(), ConfigError> {
        if self.jamf.url.trim().is_empty() {
            return Err(ConfigError::MissingCredential("jamf.url", "JAMF__URL"));
        }
        if self.jamf.user.is_empty() {
            return Err(ConfigError::MissingCredential("jamf.user", "JAMF__USER"));
        }
        if self.jamf.password.is_empty() {
            return Err(ConfigError::MissingCredential("jamf.password", "JAMF__PASSWORD"));
        }
        let url = self.jamf.url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                key: "jamf.url".to_string(),
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }
        Ok(())
    }

    /// Script layout rooted at `repo_root`.
    pub fn layout(&self, repo_root: &Path) -> ScriptLayout {
        let scripts = repo_root.join(&self.scripts.path);
        let metadata = if self.scripts.metadata_in_subfolder {
            scripts.join("metadata")
        } else {
            scripts.clone()
        };
        ScriptLayout::new(repo_root, scripts, metadata, self.scripts.extension.clone())
    }

    /// Flattened `section.key = value` pairs with the password masked.
    pub fn display_entries(&self) -> Vec<(String, String)> {
        let masked = if self.jamf.password.is_empty() {
            String::new()
        } else {
            "********".to_string()
        };
        vec![
            ("jamf.url".into(), self.jamf.url.clone()),
            ("jamf.user".into(), self.jamf.user.clone()),
            ("jamf.password".into(), masked),
            ("jamf.timeout_secs".into(), self.jamf.timeout_secs.to_string()),
            ("scripts.path".into(), self.scripts.path.display().to_string()),
            (
                "scripts.metadata_in_subfolder".into(),
                self.scripts.metadata_in_subfolder.to_string(),
            ),
            ("scripts.extension".into(), self.scripts.extension.clone()),
            ("sync.soft_delete".into(), self.sync.soft_delete.to_string()),
            (
                "sync.soft_delete_category".into(),
                self.sync.soft_delete_category.clone().unwrap_or_default(),
            ),
            ("sync.history_policy".into(), self.sync.history_policy.to_string()),
        ]
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.scripts.path, PathBuf::from("."));
        assert!(config.scripts.metadata_in_subfolder);
        assert_eq!(config.scripts.extension, "sh");
        assert!(!config.sync.soft_delete);
        assert_eq!(config.sync.history_policy, HistoryPolicy::BestEffort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_at(&tmp.path().join("absent.toml")).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[jamf]\nurl = \"https://jss.example.com\"\n\n[sync]\nsoft_delete = true\nhistory_policy = \"strict\"\n",
        )
        .unwrap();
        let config = Config::load_at(&path).expect("load");
        assert_eq!(config.jamf.url, "https://jss.example.com");
        assert_eq!(config.jamf.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.sync.soft_delete);
        assert_eq!(config.sync.history_policy, HistoryPolicy::Strict);
        assert_eq!(config.scripts.extension, "sh");
    }

    #[test]
    fn corrupt_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[jamf\nurl = ").unwrap();
        let err = Config::load_at(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn env_overrides_are_case_insensitive() {
        let mut config = Config::default();
        config
            .apply_env_overrides(vars(&[
                ("jast_jamf__user", "api"),
                ("JAST_JAMF__PASSWORD", "secret"),
                ("JAST_SYNC__SOFT_DELETE", "yes"),
                ("JAST_SCRIPTS__METADATA_IN_SUBFOLDER", "false"),
                ("UNRELATED", "x"),
            ]))
            .expect("apply");
        assert_eq!(config.jamf.user, "api");
        assert_eq!(config.jamf.password, "secret");
        assert!(config.sync.soft_delete);
        assert!(!config.scripts.metadata_in_subfolder);
    }

    #[test]
    fn env_override_rejects_bad_bool() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(vars(&[("JAST_SYNC__SOFT_DELETE", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn require_remote_names_the_missing_credential() {
        let mut config = Config::default();
        config.jamf.url = "https://jss.example.com".into();
        config.jamf.user = "api".into();
        let err = config.require_remote().unwrap_err();
        assert!(err.to_string().contains("jamf.password"));

        config.jamf.password = "secret".into();
        assert!(config.require_remote().is_ok());

        config.jamf.url = "jss.example.com".into();
        assert!(matches!(
            config.require_remote().unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }

    #[test]
    fn layout_honours_metadata_subfolder() {
        let mut config = Config::default();
        config.scripts.path = PathBuf::from("scripts");
        let nested = config.layout(Path::new("/repo"));
        assert_eq!(nested.metadata_dir(), PathBuf::from("/repo/scripts/metadata"));

        config.scripts.metadata_in_subfolder = false;
        let flat = config.layout(Path::new("/repo"));
        assert_eq!(flat.metadata_dir(), PathBuf::from("/repo/scripts"));
    }

    #[test]
    fn save_roundtrip_and_masked_display() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.jamf.password = "hunter2".into();
        config.save_at(&path).expect("save");
        assert_eq!(Config::load_at(&path).expect("load"), config);

        let entries = config.display_entries();
        let (_, shown) = entries
            .iter()
            .find(|(k, _)| k == "jamf.password")
            .expect("password row");
        assert_eq!(shown, "********");
    }
}
