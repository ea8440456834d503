use secrecy::ExposeSecret;
use serde::Serialize;

use matchday_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    database: DatabaseView,
    chat: ChatView,
    classifier: ClassifierView,
    scheduler: SchedulerView,
    server: ServerView,
    logging: LoggingView,
}

#[derive(Debug, Serialize)]
struct DatabaseView {
    url: String,
    max_connections: u32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatView {
    bot_token: &'static str,
    client_id: String,
}

#[derive(Debug, Serialize)]
struct ClassifierView {
    command: String,
    script: String,
    timeout_secs: u64,
    extra_args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SchedulerView {
    channel_id: String,
    poll_quorum: u32,
    max_clarification_turns: u32,
    fallback_times: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ServerView {
    bind_address: String,
    health_check_port: u16,
    graceful_shutdown_secs: u64,
}

#[derive(Debug, Serialize)]
struct LoggingView {
    level: String,
    format: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("configuration issue: {error}"),
    };

    let view = EffectiveConfig {
        database: DatabaseView {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            timeout_secs: config.database.timeout_secs,
        },
        chat: ChatView {
            bot_token: redact(config.chat.bot_token.expose_secret()),
            client_id: config.chat.client_id.clone(),
        },
        classifier: ClassifierView {
            command: config.classifier.command.clone(),
            script: config.classifier.script.clone(),
            timeout_secs: config.classifier.timeout_secs,
            extra_args: config.classifier.extra_args.clone(),
        },
        scheduler: SchedulerView {
            channel_id: config.scheduler.channel_id.clone(),
            poll_quorum: config.scheduler.poll_quorum,
            max_clarification_turns: config.scheduler.max_clarification_turns,
            fallback_times: config.scheduler.fallback_times.clone(),
        },
        server: ServerView {
            bind_address: config.server.bind_address.clone(),
            health_check_port: config.server.health_check_port,
            graceful_shutdown_secs: config.server.graceful_shutdown_secs,
        },
        logging: LoggingView {
            level: config.logging.level.clone(),
            format: format!("{:?}", config.logging.format).to_lowercase(),
        },
    };

    serde_json::to_string_pretty(&view)
        .unwrap_or_else(|error| format!("could not render configuration: {error}"))
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn secrets_never_render() {
        assert_eq!(redact("token-abc"), "<redacted>");
        assert_eq!(redact(""), "<unset>");
    }
}
