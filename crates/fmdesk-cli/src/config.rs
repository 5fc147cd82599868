// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use fmdesk_api::ApiContext;
use fmdesk_app::{DEFAULT_PAGE_SIZE, MAX_SEARCH_DEBOUNCE};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const APP_NAME: &str = "fmdesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_SEARCH_DEBOUNCE: &str = "500ms";

pub const CONFIG_PATH_ENV: &str = "FMDESK_CONFIG_PATH";
pub const BASE_URL_ENV: &str = "FMDESK_BASE_URL";
pub const TOKEN_ENV: &str = "FMDESK_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub page_size: Option<i64>,
    pub search_debounce: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            page_size: Some(DEFAULT_PAGE_SIZE),
            search_debounce: Some(DEFAULT_SEARCH_DEBOUNCE.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api] and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(page_size) = self.ui.page_size
            && page_size <= 0
        {
            bail!(
                "ui.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(debounce) = &self.ui.search_debounce {
            let parsed = parse_duration(debounce)
                .with_context(|| format!("ui.search_debounce in {}", path.display()))?;
            if parsed > MAX_SEARCH_DEBOUNCE {
                bail!(
                    "ui.search_debounce in {} must be at most {:?}, got {}",
                    path.display(),
                    MAX_SEARCH_DEBOUNCE,
                    debounce
                );
            }
        }

        if let Some(base_url) = &self.api.base_url {
            fmdesk_api::normalize_base_url(base_url)
                .with_context(|| format!("api.base_url in {}", path.display()))?;
        }

        Ok(())
    }

    /// `FMDESK_BASE_URL` wins over `[api].base_url`.
    pub fn base_url(&self) -> Result<String> {
        if let Some(url) = env_value(BASE_URL_ENV) {
            debug!(env = BASE_URL_ENV, "base URL taken from environment");
            return Ok(url);
        }
        self.api
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("no backend configured -- set [api].base_url or {BASE_URL_ENV} and retry")
            })
    }

    /// `FMDESK_TOKEN` wins over `[api].token`. Empty when neither is set.
    pub fn token(&self) -> String {
        env_value(TOKEN_ENV)
            .or_else(|| self.api.token.clone())
            .unwrap_or_default()
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn page_size(&self) -> i64 {
        self.ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn search_debounce(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .search_debounce
                .as_deref()
                .unwrap_or(DEFAULT_SEARCH_DEBOUNCE),
        )
    }

    pub fn api_context(&self) -> Result<ApiContext> {
        Ok(ApiContext::new(&self.base_url()?, &self.token())?)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# fmdesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# Scheme is optional; https:// is assumed.\nbase_url = \"fm.example.com\"\n# Or set {} in the environment.\ntoken = \"\"\ntimeout = \"{}\"\n\n[ui]\npage_size = {}\nsearch_debounce = \"{}\"\n",
            path.display(),
            TOKEN_ENV,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_SEARCH_DEBOUNCE,
        )
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// `<N>ms`, `<N>s`, `<N>m` or `<N>h`; surrounding whitespace is ignored.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    const UNITS: [(&str, u64); 4] = [("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

    let trimmed = raw.trim();
    let (count, millis_per_unit) = UNITS
        .iter()
        .find_map(|(suffix, scale)| Some((trimmed.strip_suffix(suffix)?, *scale)))
        .ok_or_else(|| {
            anyhow!("duration {raw:?} has no unit -- write it as 500ms, 5s, 2m or 1h")
        })?;
    let count: u64 = count
        .trim()
        .parse()
        .with_context(|| format!("duration {raw:?} does not start with a whole number"))?;
    let millis = count
        .checked_mul(millis_per_unit)
        .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::{BASE_URL_ENV, CONFIG_PATH_ENV, Config, TOKEN_ENV, parse_duration};
    use anyhow::Result;
    use fmdesk_testkit::temp_config_path;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let (temp, path) = temp_config_path()?;
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn clear_env() {
        // SAFETY: test-only process-local env mutation, serialized by env_lock.
        unsafe {
            std::env::remove_var(BASE_URL_ENV);
            std::env::remove_var(TOKEN_ENV);
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.page_size(), 10);
        assert_eq!(config.timeout()?, Duration::from_secs(10));
        assert_eq!(config.search_debounce()?, Duration::from_millis(500));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url=\"fm.example.com\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api] and [ui]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let _guard = env_lock();
        clear_env();
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://fm.example.com/\"\ntoken = \"abc\"\ntimeout = \"3s\"\n[ui]\npage_size = 25\nsearch_debounce = \"300ms\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.base_url()?, "https://fm.example.com/");
        assert_eq!(config.token(), "abc");
        assert_eq!(config.timeout()?, Duration::from_secs(3));
        assert_eq!(config.page_size(), 25);
        assert_eq!(config.search_debounce()?, Duration::from_millis(300));
        assert_eq!(config.api_context()?.base_url(), "https://fm.example.com");
        Ok(())
    }

    #[test]
    fn broken_toml_names_the_file() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api\n")?;
        let error = Config::load(&path).expect_err("broken TOML should fail");
        let message = error.to_string();
        assert!(message.starts_with("parse TOML config"));
        assert!(message.contains("config.toml"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn non_positive_page_size_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\npage_size = 0\n")?;
        let error = Config::load(&path).expect_err("zero page size should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn oversized_search_debounce_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nsearch_debounce = \"2h\"\n")?;
        let error = Config::load(&path).expect_err("a two-hour debounce should fail");
        assert!(error.to_string().contains("must be at most"));

        let (_temp, path) = write_config("version = 1\n[ui]\nsearch_debounce = \"60s\"\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.search_debounce()?, Duration::from_secs(60));
        Ok(())
    }

    #[test]
    fn blank_base_url_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"  \"\n")?;
        let error = Config::load(&path).expect_err("blank base URL should fail");
        assert!(format!("{error:#}").contains("must not be empty"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("fmdesk/config.toml"));
        Ok(())
    }

    #[test]
    fn env_overrides_config_values() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"fm.example.com\"\ntoken = \"from-file\"\n",
        )?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(BASE_URL_ENV, "staging.example.com");
            std::env::set_var(TOKEN_ENV, "from-env");
        }
        let config = Config::load(&path)?;
        let base_url = config.base_url()?;
        let token = config.token();
        clear_env();
        assert_eq!(base_url, "staging.example.com");
        assert_eq!(token, "from-env");
        Ok(())
    }

    #[test]
    fn missing_base_url_has_remediation() -> Result<()> {
        let _guard = env_lock();
        clear_env();
        let error = Config::default()
            .base_url()
            .expect_err("no base URL anywhere");
        assert!(error.to_string().contains(BASE_URL_ENV));
        Ok(())
    }

    #[test]
    fn durations_accept_every_unit() -> Result<()> {
        assert_eq!(parse_duration("300ms")?, Duration::from_millis(300));
        assert_eq!(parse_duration(" 10s ")?, Duration::from_secs(10));
        assert_eq!(parse_duration("3m")?, Duration::from_secs(180));
        assert_eq!(parse_duration("1h")?, Duration::from_secs(3600));
        Ok(())
    }

    #[test]
    fn durations_without_unit_or_number_are_rejected() {
        let unitless = parse_duration("250").expect_err("missing unit");
        assert!(unitless.to_string().contains("has no unit"));

        let wordy = parse_duration("soon").expect_err("no number");
        assert!(wordy.to_string().contains("has no unit"));

        let fractional = parse_duration("1.5s").expect_err("fractions are not accepted");
        assert!(fractional.to_string().contains("whole number"));
    }

    #[test]
    fn example_config_includes_required_sections() -> Result<()> {
        let (_temp, path) = temp_config_path()?;
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[api]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains(TOKEN_ENV));

        let parsed: toml::Value = toml::from_str(&example)?;
        assert_eq!(parsed.get("version").and_then(toml::Value::as_integer), Some(1));
        Ok(())
    }
}
