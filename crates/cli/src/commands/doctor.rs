use selector_core::config::{AppConfig, LoadOptions};
use selector_core::secrets::{store_from_config, SecretStore};
use serde::Serialize;

use super::{read_secret, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 3] =
    ["signing_secret_readiness", "bot_token_readiness", "slack_api_base_url"];

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let store = store_from_config(&config.secrets);
            checks.push(check_secret(
                "signing_secret_readiness",
                store.as_ref(),
                &config,
                &config.secrets.signing_secret_key,
            ));
            checks.push(check_secret(
                "bot_token_readiness",
                store.as_ref(),
                &config,
                &config.secrets.bot_token_key,
            ));
            checks.push(check_api_base_url(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_secret(
    name: &'static str,
    store: &dyn SecretStore,
    config: &AppConfig,
    key: &str,
) -> DoctorCheck {
    let secret_name = &config.secrets.secret_name;
    match read_secret(store, secret_name, key) {
        Ok(_) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!(
                "`{secret_name}/{key}` present in {:?} store",
                config.secrets.backend
            ),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() },
    }
}

fn check_api_base_url(config: &AppConfig) -> DoctorCheck {
    let base = config.slack.api_base_url.trim_end_matches('/');
    if base.starts_with("https://") && base.ends_with("/api") {
        return DoctorCheck {
            name: "slack_api_base_url",
            status: CheckStatus::Pass,
            details: format!("Web API calls go to `{base}`"),
        };
    }

    DoctorCheck {
        name: "slack_api_base_url",
        status: CheckStatus::Fail,
        details: format!("`{base}` is not an https URL ending in `/api`"),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
