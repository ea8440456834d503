use serde::Serialize;

use crate::commands::CommandResult;
use matchday_core::config::{AppConfig, LoadOptions};
use matchday_db::connect_with_settings;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

pub fn run(json: bool) -> CommandResult {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "ok",
                detail: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "error",
                detail: error.to_string(),
            });
            None
        }
    };

    if let Some(config) = &config {
        checks.push(database_check(config));
        checks.push(DoctorCheck {
            name: "classifier",
            status: "ok",
            detail: format!(
                "configured as `{} {}` with a {}s deadline",
                config.classifier.command, config.classifier.script, config.classifier.timeout_secs
            ),
        });
    }

    let healthy = checks.iter().all(|check| check.status == "ok");
    let report =
        DoctorReport { status: if healthy { "ready" } else { "degraded" }, checks };

    let output = if json {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"status\":\"error\",\"message\":\"{error}\"}}"))
    } else {
        render_text(&report)
    };

    CommandResult { exit_code: if healthy { 0 } else { 1 }, output }
}

fn database_check(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database",
                status: "error",
                detail: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| error.to_string())?;
        matchday_db::ping(&pool).await.map_err(|error| error.to_string())?;
        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database",
            status: "ok",
            detail: format!("connected to {}", config.database.url),
        },
        Err(detail) => DoctorCheck { name: "database", status: "error", detail },
    }
}

fn render_text(report: &DoctorReport) -> String {
    let mut lines = vec![format!("overall: {}", report.status)];
    for check in &report.checks {
        lines.push(format!("  {:<12} {:<6} {}", check.name, check.status, check.detail));
    }
    lines.join("\n")
}
