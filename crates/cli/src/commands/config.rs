use std::env;
use std::fs;
use std::path::Path;

use selector_core::config::{resolve_config_path, AppConfig, LoadOptions, SecretsBackend};
use selector_core::secrets::env_var_name;
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, env_key: &str, value: String| {
        lines.push(render_line(key, &value, source(key, env_key)));
    };

    push("slack.api_base_url", "SELECTOR_SLACK_API_BASE_URL", config.slack.api_base_url.clone());
    push("slack.command", "SELECTOR_SLACK_COMMAND", config.slack.command.clone());
    push(
        "slack.request_timeout_secs",
        "SELECTOR_SLACK_REQUEST_TIMEOUT_SECS",
        config.slack.request_timeout_secs.to_string(),
    );

    push("secrets.backend", "SELECTOR_SECRETS_BACKEND", format!("{:?}", config.secrets.backend));
    push("secrets.secret_name", "SELECTOR_SECRETS_SECRET_NAME", config.secrets.secret_name.clone());
    push(
        "secrets.signing_secret_key",
        "SELECTOR_SECRETS_SIGNING_SECRET_KEY",
        config.secrets.signing_secret_key.clone(),
    );
    push(
        "secrets.bot_token_key",
        "SELECTOR_SECRETS_BOT_TOKEN_KEY",
        config.secrets.bot_token_key.clone(),
    );
    push(
        "secrets.file_path",
        "SELECTOR_SECRETS_FILE_PATH",
        config
            .secrets
            .file_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unset>".to_string()),
    );

    push(
        "verification.freshness_window_secs",
        "SELECTOR_VERIFICATION_FRESHNESS_WINDOW_SECS",
        config.verification.freshness_window_secs.to_string(),
    );
    push("ack.budget_ms", "SELECTOR_ACK_BUDGET_MS", config.ack.budget_ms.to_string());

    push(
        "dispatch.retry_attempts",
        "SELECTOR_DISPATCH_RETRY_ATTEMPTS",
        config.dispatch.retry_attempts.to_string(),
    );
    push(
        "dispatch.max_event_age_secs",
        "SELECTOR_DISPATCH_MAX_EVENT_AGE_SECS",
        config.dispatch.max_event_age_secs.to_string(),
    );
    push(
        "dispatch.retry_base_delay_ms",
        "SELECTOR_DISPATCH_RETRY_BASE_DELAY_MS",
        config.dispatch.retry_base_delay_ms.to_string(),
    );
    push(
        "dispatch.retry_max_delay_ms",
        "SELECTOR_DISPATCH_RETRY_MAX_DELAY_MS",
        config.dispatch.retry_max_delay_ms.to_string(),
    );
    push(
        "dispatch.queue_capacity",
        "SELECTOR_DISPATCH_QUEUE_CAPACITY",
        config.dispatch.queue_capacity.to_string(),
    );
    push(
        "dispatch.worker_timeout_secs",
        "SELECTOR_DISPATCH_WORKER_TIMEOUT_SECS",
        config.dispatch.worker_timeout_secs.to_string(),
    );

    push("server.bind_address", "SELECTOR_SERVER_BIND_ADDRESS", config.server.bind_address.clone());
    push("server.port", "SELECTOR_SERVER_PORT", config.server.port.to_string());
    push(
        "server.graceful_shutdown_secs",
        "SELECTOR_SERVER_GRACEFUL_SHUTDOWN_SECS",
        config.server.graceful_shutdown_secs.to_string(),
    );

    push("logging.level", "SELECTOR_LOGGING_LEVEL", config.logging.level.clone());
    push("logging.format", "SELECTOR_LOGGING_FORMAT", format!("{:?}", config.logging.format));

    if config.secrets.backend == SecretsBackend::Env {
        for key in [&config.secrets.signing_secret_key, &config.secrets.bot_token_key] {
            let var = env_var_name(&config.secrets.secret_name, key);
            let state = redact_secret(env::var(&var).ok().as_deref());
            lines.push(format!("- secret {key} = {state} (source: env ({var}))"));
        }
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(value: Option<&str>) -> String {
    let Some(trimmed) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return "<unset>".to_string();
    };

    let token_prefix = trimmed.split_once('-').filter(|(prefix, _)| prefix.starts_with("xox"));
    if let Some((prefix, _)) = token_prefix {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
