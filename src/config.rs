use crate::errors::{BackendError, BackendResult};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEVICE_URI_VAR: &str = "DEVICE_URI";
pub const CONFIG_PATH_VAR: &str = "CUPS_FILE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cups/cups-file.toml";

#[derive(Debug, Clone)]
pub struct Config {
    pub device_uri: String,
    pub settings: Settings,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub identity: Identity,
    pub limits: Limits,
    pub output: Output,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Identity {
    pub root_fallback: String,
}
impl Default for Identity {
    fn default() -> Self { Self { root_fallback: "nobody".to_string() } }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Limits {
    /// PATH_MAX less the terminator.
    pub max_path_len: usize,
    /// LOGIN_NAME_MAX less the terminator.
    pub max_user_len: usize,
}
impl Default for Limits {
    fn default() -> Self { Self { max_path_len: 4095, max_user_len: 255 } }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Output {
    pub create_dirs: bool,
    pub mode: String,
}
impl Default for Output {
    fn default() -> Self { Self { create_dirs: false, mode: "0600".to_string() } }
}

impl Output {
    pub fn mode_bits(&self) -> anyhow::Result<u32> {
        u32::from_str_radix(self.mode.trim_start_matches("0o"), 8)
            .with_context(|| format!("invalid output mode {:?}", self.mode))
    }
}

impl Config {
    /// Builds the configuration from an environment lookup, so callers can supply their own.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BackendResult<Self> {
        let device_uri = lookup(DEVICE_URI_VAR)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BackendError::Config("No Device URI supplied!".into()))?;

        let settings_path = match lookup(CONFIG_PATH_VAR) {
            Some(p) => Some(PathBuf::from(p)),
            None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.is_file()),
        };
        let settings = match settings_path {
            Some(path) => Settings::load(&path)
                .with_context(|| format!("loading {}", path.display()))
                .map_err(|e| BackendError::Config(format!("{e:#}")))?,
            None => Settings::default(),
        };
        settings.validate().map_err(|e| BackendError::Config(format!("{e:#}")))?;

        Ok(Self { device_uri, settings })
    }
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let fallback = self.identity.root_fallback.trim();
        if fallback.is_empty() { anyhow::bail!("root_fallback must not be empty"); }
        if fallback == "root" { anyhow::bail!("root_fallback must name an unprivileged account"); }
        if self.limits.max_path_len == 0 { anyhow::bail!("max_path_len must be > 0"); }
        if self.limits.max_user_len == 0 { anyhow::bail!("max_user_len must be > 0"); }
        self.output.mode_bits()?;
        Ok(())
    }
}
