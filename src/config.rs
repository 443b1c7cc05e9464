use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::error::{require_non_blank, Error, Result};

pub const DEFAULT_CONFIG_NAME: &str = "makeSnapshot";

const SAMPLE_CONFIG: &str = r#"---
baseURL: "https://your.base.url"
tenant: "your tenant name"
domain: "your domain name"
username: "your username without domain"
password: "your password"
...
"#;

pub fn default_config_path() -> PathBuf {
    PathBuf::from(format!("{}.yaml", DEFAULT_CONFIG_NAME))
}

/// Raw contents of the YAML config file. Every key may be missing until validated.
#[derive(Debug, Default)]
pub struct Config {
    pub(crate) base_url: Option<String>,
    pub(crate) tenant: Option<String>,
    pub(crate) domain: Option<String>,
    pub(crate) user_name: Option<String>,
    pub(crate) password: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&raw).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Using config file: {}", path.display());
        Ok(config)
    }

    /// Keys are matched case-insensitively, so `baseURL`, `BaseURL` and `baseurl` are equal.
    pub fn from_yaml(raw: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a map
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }

        let mapping: Mapping = serde_yaml::from_str(raw)?;
        let mut keys: BTreeMap<String, String> = mapping
            .iter()
            .filter_map(|(key, value)| Some((key.as_str()?.to_lowercase(), scalar(value)?)))
            .collect();

        Ok(Config {
            base_url: keys.remove("baseurl"),
            tenant: keys.remove("tenant"),
            domain: keys.remove("domain"),
            user_name: keys.remove("username"),
            password: keys.remove("password"),
        })
    }

    pub fn override_domain(&mut self, domain: Option<String>) {
        if let Some(domain) = domain {
            debug!("Login domain overridden from the command line");
            self.domain = Some(domain);
        }
    }

    pub fn into_credentials(self) -> Result<Credentials> {
        let base_url = required("baseURL", self.base_url)?;
        let tenant = required("tenant", self.tenant)?;
        let domain = required("domain", self.domain)?;
        let user_name = required("userName", self.user_name)?;
        let password = required("password", self.password)?;

        Ok(Credentials {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            tenant,
            domain,
            user_name,
            password,
        })
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String> {
    let value = value.unwrap_or_default();
    require_non_blank(name, &value)?;
    Ok(value)
}

/// Validated login data for one run.
#[derive(Clone)]
pub struct Credentials {
    pub(crate) base_url: String,
    pub(crate) tenant: String,
    pub(crate) domain: String,
    pub(crate) user_name: String,
    pub(crate) password: String,
}

impl Credentials {
    /// The identity service wants `user@domain`.
    pub fn login_name(&self) -> String {
        format!("{}@{}", self.user_name, self.domain)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("tenant", &self.tenant)
            .field("domain", &self.domain)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub fn write_sample_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::ConfigExists(path.to_path_buf()));
    }

    let write_err = |source: std::io::Error| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(SAMPLE_CONFIG.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    info!("Created config file {:?}", path);
    Ok(())
}
