// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use postsheet_app::RowField;
use postsheet_http::{
    AutoReplyRule, DEFAULT_ENDPOINT, DEFAULT_REPLY_MARKER, DEFAULT_REPLY_MESSAGE, DispatchConfig,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "postsheet";
pub const CONFIG_PATH_ENV: &str = "POSTSHEET_CONFIG_PATH";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TOKEN: &str = "your_api_token_here";
const DEFAULT_INITIAL_ROWS: usize = 50;
const MAX_INITIAL_ROWS: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub sheet: Sheet,
    #[serde(default)]
    pub auto_reply: AutoReply,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            http: Http::default(),
            sheet: Sheet::default(),
            auto_reply: AutoReply::default(),
            export: Export::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            endpoint: Some(DEFAULT_ENDPOINT.to_owned()),
            token: Some(DEFAULT_TOKEN.to_owned()),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sheet {
    pub initial_rows: Option<usize>,
}

impl Default for Sheet {
    fn default() -> Self {
        Self {
            initial_rows: Some(DEFAULT_INITIAL_ROWS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoReply {
    pub field: Option<String>,
    pub marker: Option<String>,
    pub message: Option<String>,
}

impl Default for AutoReply {
    fn default() -> Self {
        Self {
            field: Some(RowField::ContentA.as_str().to_owned()),
            marker: Some(DEFAULT_REPLY_MARKER.to_owned()),
            message: Some(DEFAULT_REPLY_MESSAGE.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Export {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub path: Option<String>,
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
                    "config file {} has no version. Add `version = 1` at the top and keep settings under [http], [sheet], [auto_reply], [export], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Run `postsheet --print-example-config` for the current layout",
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
        self.dispatch_config()
            .with_context(|| format!("invalid [http] section in {}", path.display()))?;

        if let Some(timeout) = &self.http.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "http.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(rows) = self.sheet.initial_rows
            && rows > MAX_INITIAL_ROWS
        {
            bail!(
                "sheet.initial_rows in {} must be at most {MAX_INITIAL_ROWS}, got {rows}",
                path.display()
            );
        }

        self.auto_reply_rule()
            .with_context(|| format!("invalid [auto_reply] section in {}", path.display()))?;

        Ok(())
    }

    pub fn dispatch_config(&self) -> Result<DispatchConfig> {
        DispatchConfig::new(
            self.http.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT),
            self.http.token.as_deref().unwrap_or(DEFAULT_TOKEN),
        )
    }

    /// `None` leaves the HTTP client on its own default.
    pub fn http_timeout(&self) -> Result<Option<Duration>> {
        self.http.timeout.as_deref().map(parse_duration).transpose()
    }

    pub fn uses_placeholder_token(&self) -> bool {
        self.http.token.as_deref().unwrap_or(DEFAULT_TOKEN) == DEFAULT_TOKEN
    }

    pub fn initial_rows(&self) -> usize {
        self.sheet.initial_rows.unwrap_or(DEFAULT_INITIAL_ROWS)
    }

    pub fn auto_reply_rule(&self) -> Result<AutoReplyRule> {
        let raw_field = self
            .auto_reply
            .field
            .as_deref()
            .unwrap_or(RowField::ContentA.as_str());
        let field = RowField::parse(raw_field).ok_or_else(|| {
            anyhow!(
                "auto_reply.field {raw_field:?} is not a column; use one of: account, business_account, label, content_a, content_b, content_c"
            )
        })?;

        let marker = self
            .auto_reply
            .marker
            .as_deref()
            .unwrap_or(DEFAULT_REPLY_MARKER);
        if marker.is_empty() {
            bail!("auto_reply.marker must not be empty; every row would match");
        }

        Ok(AutoReplyRule {
            field,
            marker: marker.to_owned(),
            message: self
                .auto_reply
                .message
                .as_deref()
                .unwrap_or(DEFAULT_REPLY_MESSAGE)
                .to_owned(),
        })
    }

    pub fn export_dir(&self) -> PathBuf {
        match &self.export.dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from("."),
        }
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].path in the config file")
        })?;
        Ok(data_root.join(APP_NAME).join(format!("{APP_NAME}.log")))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# postsheet config\n# Place this file at: {}\n\nversion = 1\n\n[http]\nendpoint = \"{}\"\ntoken = \"{}\"\n# Optional. Default is the HTTP client's own timeout.\n# timeout = \"30s\"\n\n[sheet]\ninitial_rows = {}\n\n[auto_reply]\nfield = \"content_a\"\nmarker = \"{}\"\nmessage = \"{}\"\n\n[export]\n# Optional. Default is the current directory.\n# dir = \"/path/to/exports\"\n\n[log]\n# Optional. Default is the platform data dir (for example ~/.local/share/postsheet/postsheet.log)\n# path = \"/path/to/postsheet.log\"\n",
            path.display(),
            DEFAULT_ENDPOINT,
            DEFAULT_TOKEN,
            DEFAULT_INITIAL_ROWS,
            DEFAULT_REPLY_MARKER,
            DEFAULT_REPLY_MESSAGE,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_PATH_ENV, Config, parse_duration};
    use anyhow::Result;
    use postsheet_app::RowField;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
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

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.initial_rows(), 50);
        assert_eq!(
            config.dispatch_config()?.endpoint(),
            "http://localhost:8080/post"
        );
        assert!(config.uses_placeholder_token());
        assert_eq!(config.http_timeout()?, None);
        assert_eq!(config.export_dir(), PathBuf::from("."));
        assert_eq!(config.auto_reply_rule()?.marker, "reply");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[http]\ntoken = \"abc\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[http], [sheet]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[http]\nendpoint = \"https://api.example.com/post/\"\ntoken = \"secret\"\ntimeout = \"2s\"\n[sheet]\ninitial_rows = 5\n[auto_reply]\nfield = \"label\"\nmarker = \"ask\"\nmessage = \"On it\"\n[export]\ndir = \"/tmp/out\"\n[log]\npath = \"/tmp/postsheet.log\"\n",
        )?;

        let config = Config::load(&path)?;
        let dispatch = config.dispatch_config()?;
        assert_eq!(dispatch.endpoint(), "https://api.example.com/post");
        assert_eq!(dispatch.token(), "secret");
        assert!(!config.uses_placeholder_token());
        assert_eq!(config.http_timeout()?, Some(Duration::from_secs(2)));
        assert_eq!(config.initial_rows(), 5);

        let rule = config.auto_reply_rule()?;
        assert_eq!(rule.field, RowField::Label);
        assert_eq!(rule.marker, "ask");
        assert_eq!(rule.message, "On it");

        assert_eq!(config.export_dir(), PathBuf::from("/tmp/out"));
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/postsheet.log"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
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
    fn non_http_endpoint_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[http]\nendpoint = \"ftp://host/post\"\n")?;
        let error = Config::load(&path).expect_err("ftp endpoint should fail");
        let message = format!("{error:#}");
        assert!(message.contains("invalid [http] section"), "{message}");
        assert!(message.contains("http or https"), "{message}");
        Ok(())
    }

    #[test]
    fn empty_token_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[http]\ntoken = \"  \"\n")?;
        let error = Config::load(&path).expect_err("blank token should fail");
        assert!(format!("{error:#}").contains("http.token must not be empty"));
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn timeout_rejects_invalid_duration() {
        let error = parse_duration("soon").expect_err("invalid duration should fail");
        let message = error.to_string();
        assert!(
            message.contains("invalid duration") || message.contains("invalid timeout duration"),
            "unexpected message: {message}"
        );
    }

    #[test]
    fn timeout_rejects_zero_in_config() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[http]\ntimeout = \"0ms\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn initial_rows_is_capped() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[sheet]\ninitial_rows = 10001\n")?;
        let error = Config::load(&path).expect_err("too many rows should fail");
        assert!(error.to_string().contains("must be at most 10000"));

        let (_temp, path) = write_config("version = 1\n[sheet]\ninitial_rows = 0\n")?;
        assert_eq!(Config::load(&path)?.initial_rows(), 0);
        Ok(())
    }

    #[test]
    fn auto_reply_section_is_validated() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[auto_reply]\nmarker = \"\"\n")?;
        let error = Config::load(&path).expect_err("empty marker should fail");
        assert!(format!("{error:#}").contains("marker must not be empty"));

        let (_temp, path) = write_config("version = 1\n[auto_reply]\nfield = \"notes\"\n")?;
        let error = Config::load(&path).expect_err("unknown field should fail");
        assert!(format!("{error:#}").contains("is not a column"));
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
    fn default_log_path_lives_under_app_dir() -> Result<()> {
        let config = Config::default();
        let path = config.log_path()?;
        assert!(path.ends_with("postsheet/postsheet.log"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        for section in ["[http]", "[sheet]", "[auto_reply]", "[export]", "[log]"] {
            assert!(example.contains(section), "missing {section}");
        }

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.initial_rows(), 50);
        assert!(config.uses_placeholder_token());
        Ok(())
    }
}
