use lotbridge_agent::{BackendInvoker, LotRegistryClient, LotTool};
use lotbridge_core::config::{AppConfig, LoadOptions, TransportMode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::json;

use super::CommandResult;

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

const DEPENDENT_CHECKS: [&str; 3] = ["llm_credentials", "backend_reachability", "transport_readiness"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_credentials(&config));
            checks.push(check_backend_reachability(&config));
            checks.push(check_transport(&config));
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

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    if config.llm.api_key.expose_secret().trim().is_empty() {
        return DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Fail,
            details: "llm.api_key is empty".to_string(),
        };
    }

    DoctorCheck {
        name: "llm_credentials",
        status: CheckStatus::Pass,
        details: format!("api key present for model `{}` at {}", config.llm.model, config.llm.base_url),
    }
}

/// Issues one read-only `get_all_lots` call against the registry.
fn check_backend_reachability(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let client = LotRegistryClient::from_config(&config.backend)
            .map_err(|error| format!("failed to build backend client: {error}"))?;
        client
            .invoke(LotTool::GetAllLots, &json!({}))
            .await
            .map_err(|error| format!("lot registry call failed: {error}"))
    });

    match result {
        Ok(lots) => {
            let count = lots.as_array().map(Vec::len).map_or_else(
                || "a non-list body".to_string(),
                |count| format!("{count} lot(s)"),
            );
            DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Pass,
                details: format!("{} answered get_all_lots with {count}", config.backend.base_url),
            }
        }
        Err(error) => {
            DoctorCheck { name: "backend_reachability", status: CheckStatus::Fail, details: error }
        }
    }
}

fn check_transport(config: &AppConfig) -> DoctorCheck {
    let details = match (config.agent.transport_mode, config.agent.mailbox_url.as_deref()) {
        (TransportMode::Mailbox, Some(mailbox_url)) => {
            format!("mailbox delivery via {mailbox_url}")
        }
        (TransportMode::Mailbox, None) => {
            return DoctorCheck {
                name: "transport_readiness",
                status: CheckStatus::Fail,
                details: "mailbox mode requires agent.mailbox_url".to_string(),
            };
        }
        (TransportMode::Direct, _) => format!(
            "direct delivery; listening on {}:{} as {}",
            config.agent.bind_address, config.agent.port, config.agent.address
        ),
    };

    DoctorCheck { name: "transport_readiness", status: CheckStatus::Pass, details }
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
