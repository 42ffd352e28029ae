use directories::BaseDirs;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const AUTH_URL_ENV: &str = "ATELIER_AUTH_URL";
pub const DATA_DIR_ENV: &str = "ATELIER_DATA_DIR";

/// Resolved runtime settings for the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtelierConfig {
    pub auth_base_url: String,
    pub data_dir: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Atelier not configured—create atelier.yaml with an auth base_url.")]
    Missing,
    #[error("Atelier configuration invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Missing => {
                "Atelier not configured—create atelier.yaml with an auth base_url.".to_string()
            }
            Self::Invalid(detail) => {
                format!("Atelier not configured—{detail}. Update atelier.yaml.")
            }
        }
    }
}

impl AtelierConfig {
    /// Reads `atelier.yaml` and applies `ATELIER_*` overrides, including any
    /// found in a local `.env` file.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let file = match locate_config_file() {
            Some(path) => {
                let contents = fs::read_to_string(&path).map_err(|err| {
                    ConfigError::Invalid(format!("failed to read {}: {err}", path.display()))
                })?;
                serde_yaml::from_str(&contents)
                    .map_err(|err| ConfigError::Invalid(format!("invalid atelier.yaml: {err}")))?
            }
            None => AtelierFile::default(),
        };
        let overrides = EnvOverrides {
            auth_base_url: std::env::var(AUTH_URL_ENV).ok(),
            data_dir: std::env::var(DATA_DIR_ENV).ok(),
        };
        resolve(file, overrides)
    }
}

#[derive(Debug, Default)]
struct EnvOverrides {
    auth_base_url: Option<String>,
    data_dir: Option<String>,
}

fn resolve(file: AtelierFile, overrides: EnvOverrides) -> Result<AtelierConfig, ConfigError> {
    let auth = file.auth.unwrap_or_default();
    let storage = file.storage.unwrap_or_default();

    let auth_base_url = overrides
        .auth_base_url
        .filter(|url| !url.trim().is_empty())
        .or(auth.base_url)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or(ConfigError::Missing)?;
    if !(auth_base_url.starts_with("http://") || auth_base_url.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!(
            "auth base_url must be an http(s) URL, got `{auth_base_url}`"
        )));
    }

    let data_dir = match overrides.data_dir.or(storage.data_dir) {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        Some(_) => {
            return Err(ConfigError::Invalid(
                "storage data_dir cannot be empty".to_string(),
            ))
        }
        None => default_data_dir()?,
    };

    Ok(AtelierConfig {
        auth_base_url,
        data_dir,
    })
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    BaseDirs::new()
        .map(|base| base.data_dir().join("atelier"))
        .ok_or_else(|| {
            ConfigError::Invalid("no home directory to place atelier data in".to_string())
        })
}

fn locate_config_file() -> Option<PathBuf> {
    atelier_yaml_candidates()
        .into_iter()
        .find(|path| path.exists())
}

fn atelier_yaml_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("atelier.yaml"), PathBuf::from("atelier.yml")];
    if let Some(base) = BaseDirs::new() {
        let config_dir = base.config_dir().join("atelier");
        paths.push(config_dir.join("atelier.yaml"));
        paths.push(config_dir.join("atelier.yml"));
        let home_dir = base.home_dir();
        paths.push(home_dir.join(".atelier").join("atelier.yaml"));
        paths.push(home_dir.join(".atelier").join("atelier.yml"));
    }
    paths
}

#[derive(Debug, Default, Deserialize)]
struct AtelierFile {
    auth: Option<AuthSection>,
    storage: Option<StorageSection>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthSection {
    #[serde(default)]
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    #[serde(default)]
    data_dir: Option<String>,
}
