use chrono::Utc;
use selector_core::config::{AppConfig, LoadOptions};
use selector_core::secrets::store_from_config;
use selector_core::verify::{sign, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use serde_json::json;

use super::{read_secret, CommandResult};

const COMMAND: &str = "sign";

pub fn run(options: LoadOptions, body: &str, timestamp: Option<i64>) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
        }
    };

    let store = store_from_config(&config.secrets);
    let secret = match read_secret(
        store.as_ref(),
        &config.secrets.secret_name,
        &config.secrets.signing_secret_key,
    ) {
        Ok(secret) => secret,
        Err(error) => {
            return CommandResult::failure(COMMAND, "secret_unavailable", error.to_string(), 3)
        }
    };

    let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp()).to_string();
    match sign(&secret, &timestamp, body.as_bytes()) {
        Ok(signature) => CommandResult::success(
            COMMAND,
            "request signed",
            Some(json!({
                "headers": {
                    SIGNATURE_HEADER: signature,
                    TIMESTAMP_HEADER: timestamp,
                }
            })),
        ),
        Err(error) => CommandResult::failure(COMMAND, "signing", error.to_string(), 1),
    }
}
