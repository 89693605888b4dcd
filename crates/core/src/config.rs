use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub secrets: SecretsConfig,
    pub verification: VerificationConfig,
    pub ack: AckConfig,
    pub dispatch: DispatchConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub api_base_url: String,
    pub command: String,
    pub request_timeout_secs: u64,
}

/// Where the signing secret and bot token are read from. Only names live here;
/// values are fetched per invocation through a `SecretStore`.
#[derive(Clone, Debug)]
pub struct SecretsConfig {
    pub backend: SecretsBackend,
    pub secret_name: String,
    pub signing_secret_key: String,
    pub bot_token_key: String,
    pub file_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct VerificationConfig {
    pub freshness_window_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AckConfig {
    pub budget_ms: u64,
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub retry_attempts: u32,
    pub max_event_age_secs: u64,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub queue_capacity: usize,
    pub worker_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretsBackend {
    Env,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub slack_api_base_url: Option<String>,
    pub secrets_backend: Option<SecretsBackend>,
    pub secrets_file_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                api_base_url: "https://slack.com/api".to_string(),
                command: "/select".to_string(),
                request_timeout_secs: 10,
            },
            secrets: SecretsConfig {
                backend: SecretsBackend::Env,
                secret_name: "Selector".to_string(),
                signing_secret_key: "slackSigningSecret".to_string(),
                bot_token_key: "slackBotToken".to_string(),
                file_path: None,
            },
            verification: VerificationConfig { freshness_window_secs: 300 },
            ack: AckConfig { budget_ms: 3_000 },
            dispatch: DispatchConfig {
                retry_attempts: 2,
                max_event_age_secs: 120,
                retry_base_delay_ms: 1_000,
                retry_max_delay_ms: 30_000,
                queue_capacity: 64,
                worker_timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for SecretsBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "file" => Ok(Self::File),
            other => Err(ConfigError::Validation(format!(
                "unsupported secrets backend `{other}` (expected env|file)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("selector.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
            if let Some(command) = slack.command {
                self.slack.command = command;
            }
            if let Some(request_timeout_secs) = slack.request_timeout_secs {
                self.slack.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(secrets) = patch.secrets {
            if let Some(backend) = secrets.backend {
                self.secrets.backend = backend;
            }
            if let Some(secret_name) = secrets.secret_name {
                self.secrets.secret_name = secret_name;
            }
            if let Some(signing_secret_key) = secrets.signing_secret_key {
                self.secrets.signing_secret_key = signing_secret_key;
            }
            if let Some(bot_token_key) = secrets.bot_token_key {
                self.secrets.bot_token_key = bot_token_key;
            }
            if let Some(file_path) = secrets.file_path {
                self.secrets.file_path = Some(file_path);
            }
        }

        if let Some(verification) = patch.verification {
            if let Some(freshness_window_secs) = verification.freshness_window_secs {
                self.verification.freshness_window_secs = freshness_window_secs;
            }
        }

        if let Some(ack) = patch.ack {
            if let Some(budget_ms) = ack.budget_ms {
                self.ack.budget_ms = budget_ms;
            }
        }

        if let Some(dispatch) = patch.dispatch {
            if let Some(retry_attempts) = dispatch.retry_attempts {
                self.dispatch.retry_attempts = retry_attempts;
            }
            if let Some(max_event_age_secs) = dispatch.max_event_age_secs {
                self.dispatch.max_event_age_secs = max_event_age_secs;
            }
            if let Some(retry_base_delay_ms) = dispatch.retry_base_delay_ms {
                self.dispatch.retry_base_delay_ms = retry_base_delay_ms;
            }
            if let Some(retry_max_delay_ms) = dispatch.retry_max_delay_ms {
                self.dispatch.retry_max_delay_ms = retry_max_delay_ms;
            }
            if let Some(queue_capacity) = dispatch.queue_capacity {
                self.dispatch.queue_capacity = queue_capacity;
            }
            if let Some(worker_timeout_secs) = dispatch.worker_timeout_secs {
                self.dispatch.worker_timeout_secs = worker_timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SELECTOR_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }
        if let Some(value) = read_env("SELECTOR_SLACK_COMMAND") {
            self.slack.command = value;
        }
        if let Some(value) = read_env("SELECTOR_SLACK_REQUEST_TIMEOUT_SECS") {
            self.slack.request_timeout_secs =
                parse_u64("SELECTOR_SLACK_REQUEST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SELECTOR_SECRETS_BACKEND") {
            self.secrets.backend = value.parse()?;
        }
        if let Some(value) = read_env("SELECTOR_SECRETS_SECRET_NAME") {
            self.secrets.secret_name = value;
        }
        if let Some(value) = read_env("SELECTOR_SECRETS_SIGNING_SECRET_KEY") {
            self.secrets.signing_secret_key = value;
        }
        if let Some(value) = read_env("SELECTOR_SECRETS_BOT_TOKEN_KEY") {
            self.secrets.bot_token_key = value;
        }
        if let Some(value) = read_env("SELECTOR_SECRETS_FILE_PATH") {
            self.secrets.file_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("SELECTOR_VERIFICATION_FRESHNESS_WINDOW_SECS") {
            self.verification.freshness_window_secs =
                parse_u64("SELECTOR_VERIFICATION_FRESHNESS_WINDOW_SECS", &value)?;
        }
        if let Some(value) = read_env("SELECTOR_ACK_BUDGET_MS") {
            self.ack.budget_ms = parse_u64("SELECTOR_ACK_BUDGET_MS", &value)?;
        }

        if let Some(value) = read_env("SELECTOR_DISPATCH_RETRY_ATTEMPTS") {
            self.dispatch.retry_attempts = parse_u32("SELECTOR_DISPATCH_RETRY_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("SELECTOR_DISPATCH_MAX_EVENT_AGE_SECS") {
            self.dispatch.max_event_age_secs =
                parse_u64("SELECTOR_DISPATCH_MAX_EVENT_AGE_SECS", &value)?;
        }
        if let Some(value) = read_env("SELECTOR_DISPATCH_RETRY_BASE_DELAY_MS") {
            self.dispatch.retry_base_delay_ms =
                parse_u64("SELECTOR_DISPATCH_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("SELECTOR_DISPATCH_RETRY_MAX_DELAY_MS") {
            self.dispatch.retry_max_delay_ms =
                parse_u64("SELECTOR_DISPATCH_RETRY_MAX_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("SELECTOR_DISPATCH_QUEUE_CAPACITY") {
            self.dispatch.queue_capacity =
                parse_usize("SELECTOR_DISPATCH_QUEUE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("SELECTOR_DISPATCH_WORKER_TIMEOUT_SECS") {
            self.dispatch.worker_timeout_secs =
                parse_u64("SELECTOR_DISPATCH_WORKER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SELECTOR_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SELECTOR_SERVER_PORT") {
            self.server.port = parse_u16("SELECTOR_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SELECTOR_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SELECTOR_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("SELECTOR_LOGGING_LEVEL").or_else(|| read_env("SELECTOR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SELECTOR_LOGGING_FORMAT").or_else(|| read_env("SELECTOR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(api_base_url) = overrides.slack_api_base_url {
            self.slack.api_base_url = api_base_url;
        }
        if let Some(backend) = overrides.secrets_backend {
            self.secrets.backend = backend;
        }
        if let Some(file_path) = overrides.secrets_file_path {
            self.secrets.file_path = Some(file_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_secrets(&self.secrets)?;
        validate_verification(&self.verification)?;
        validate_ack(&self.ack)?;
        validate_dispatch(&self.dispatch)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Explicit path if it exists, otherwise the first of `selector.toml`, `config/selector.toml`.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("selector.toml"), PathBuf::from("config/selector.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let base_url = slack.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if !slack.command.starts_with('/') || slack.command.len() < 2 {
        return Err(ConfigError::Validation(
            "slack.command must be a slash command such as `/select`".to_string(),
        ));
    }

    if slack.request_timeout_secs == 0 || slack.request_timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "slack.request_timeout_secs must be in range 1..=60".to_string(),
        ));
    }

    Ok(())
}

fn validate_secrets(secrets: &SecretsConfig) -> Result<(), ConfigError> {
    if secrets.secret_name.trim().is_empty() {
        return Err(ConfigError::Validation("secrets.secret_name must not be empty".to_string()));
    }
    if secrets.signing_secret_key.trim().is_empty() || secrets.bot_token_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "secrets.signing_secret_key and secrets.bot_token_key must not be empty".to_string(),
        ));
    }

    if secrets.backend == SecretsBackend::File && secrets.file_path.is_none() {
        return Err(ConfigError::Validation(
            "secrets.file_path is required when secrets.backend = \"file\"".to_string(),
        ));
    }

    Ok(())
}

fn validate_verification(verification: &VerificationConfig) -> Result<(), ConfigError> {
    if verification.freshness_window_secs == 0 || verification.freshness_window_secs > 3_600 {
        return Err(ConfigError::Validation(
            "verification.freshness_window_secs must be in range 1..=3600".to_string(),
        ));
    }
    Ok(())
}

fn validate_ack(ack: &AckConfig) -> Result<(), ConfigError> {
    if ack.budget_ms == 0 || ack.budget_ms > 3_000 {
        return Err(ConfigError::Validation(
            "ack.budget_ms must be in range 1..=3000; the caller gives up after 3 seconds"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_dispatch(dispatch: &DispatchConfig) -> Result<(), ConfigError> {
    if dispatch.retry_attempts > 10 {
        return Err(ConfigError::Validation(
            "dispatch.retry_attempts must be at most 10".to_string(),
        ));
    }

    if dispatch.max_event_age_secs == 0 {
        return Err(ConfigError::Validation(
            "dispatch.max_event_age_secs must be greater than zero".to_string(),
        ));
    }

    if dispatch.retry_base_delay_ms > dispatch.retry_max_delay_ms {
        return Err(ConfigError::Validation(
            "dispatch.retry_base_delay_ms must not exceed dispatch.retry_max_delay_ms".to_string(),
        ));
    }

    if dispatch.queue_capacity == 0 {
        return Err(ConfigError::Validation(
            "dispatch.queue_capacity must be greater than zero".to_string(),
        ));
    }

    if dispatch.worker_timeout_secs == 0 || dispatch.worker_timeout_secs > 900 {
        return Err(ConfigError::Validation(
            "dispatch.worker_timeout_secs must be in range 1..=900".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    secrets: Option<SecretsPatch>,
    verification: Option<VerificationPatch>,
    ack: Option<AckPatch>,
    dispatch: Option<DispatchPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    api_base_url: Option<String>,
    command: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SecretsPatch {
    backend: Option<SecretsBackend>,
    secret_name: Option<String>,
    signing_secret_key: Option<String>,
    bot_token_key: Option<String>,
    file_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct VerificationPatch {
    freshness_window_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AckPatch {
    budget_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchPatch {
    retry_attempts: Option<u32>,
    max_event_age_secs: Option<u64>,
    retry_base_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
    queue_capacity: Option<usize>,
    worker_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, SecretsBackend};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn missing_path() -> Option<PathBuf> {
        Some(PathBuf::from("/nonexistent/selector-test.toml"))
    }

    #[test]
    fn defaults_match_provider_contract() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: missing_path(), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.ack.budget_ms == 3_000, "ack budget should default to 3000ms")?;
        ensure(
            config.verification.freshness_window_secs == 300,
            "freshness window should default to five minutes",
        )?;
        ensure(config.dispatch.retry_attempts == 2, "two retries by default")?;
        ensure(config.dispatch.max_event_age_secs == 120, "two minute max event age")?;
        ensure(config.dispatch.worker_timeout_secs == 30, "thirty second worker timeout")?;
        ensure(config.slack.command == "/select", "default command should be /select")?;
        ensure(config.secrets.backend == SecretsBackend::Env, "env secrets by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SELECTOR_SECRETS_FILE", "/run/secrets/selector.json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("selector.toml");
            fs::write(
                &path,
                r#"
[secrets]
backend = "file"
file_path = "${TEST_SELECTOR_SECRETS_FILE}"
secret_name = "SelectorProd"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.secrets.backend == SecretsBackend::File, "backend should be file")?;
            ensure(
                config.secrets.file_path.as_deref()
                    == Some(std::path::Path::new("/run/secrets/selector.json")),
                "file path should be interpolated from the environment",
            )?;
            ensure(config.secrets.secret_name == "SelectorProd", "secret name from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_SELECTOR_SECRETS_FILE"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SELECTOR_LOG_LEVEL", "warn");
        env::set_var("SELECTOR_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                config_path: missing_path(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SELECTOR_LOG_LEVEL", "SELECTOR_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SELECTOR_SERVER_PORT", "9090");
        env::set_var("SELECTOR_DISPATCH_RETRY_ATTEMPTS", "1");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("selector.toml");
            fs::write(
                &path,
                r#"
[server]
port = 7070
bind_address = "0.0.0.0"

[dispatch]
retry_attempts = 5
queue_capacity = 16

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    bind_address: Some("127.0.0.2".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 9090, "env port should win over file")?;
            ensure(config.dispatch.retry_attempts == 1, "env retries should win over file")?;
            ensure(config.dispatch.queue_capacity == 16, "file capacity should win over default")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.bind_address == "127.0.0.2", "override bind address should win")?;
            Ok(())
        })();

        clear_vars(&["SELECTOR_SERVER_PORT", "SELECTOR_DISPATCH_RETRY_ATTEMPTS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SELECTOR_ACK_BUDGET_MS", "5000");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions {
                config_path: missing_path(),
                ..LoadOptions::default()
            }) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("ack.budget_ms")
            );
            ensure(has_message, "validation failure should mention ack.budget_ms")
        })();

        clear_vars(&["SELECTOR_ACK_BUDGET_MS"]);
        result
    }

    #[test]
    fn file_backend_requires_a_path() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            config_path: missing_path(),
            overrides: ConfigOverrides {
                secrets_backend: Some(SecretsBackend::File),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(
            matches!(
                result,
                Err(ConfigError::Validation(ref message)) if message.contains("secrets.file_path")
            ),
            "file backend without a path should be rejected",
        )
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SELECTOR_DISPATCH_QUEUE_CAPACITY", "lots");

        let result = AppConfig::load(LoadOptions {
            config_path: missing_path(),
            ..LoadOptions::default()
        });

        clear_vars(&["SELECTOR_DISPATCH_QUEUE_CAPACITY"]);
        ensure(
            matches!(
                result,
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "SELECTOR_DISPATCH_QUEUE_CAPACITY"
            ),
            "non-numeric capacity should be an invalid override",
        )
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            config_path: missing_path(),
            require_file: true,
            ..LoadOptions::default()
        });
        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }
}
