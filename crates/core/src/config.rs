use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialog::states::DialogPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
    pub classifier: ClassifierConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_token: SecretString,
    /// The bot's own platform user id, used to strip self-mentions and
    /// ignore self-authored messages.
    pub client_id: String,
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub command: String,
    pub script: String,
    pub timeout_secs: u64,
    pub extra_args: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Channel where time-proposal polls are posted.
    pub channel_id: String,
    pub poll_quorum: u32,
    pub max_clarification_turns: u32,
    pub fallback_times: Vec<String>,
    pub greeting: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub chat_bot_token: Option<String>,
    pub chat_client_id: Option<String>,
    pub scheduler_channel_id: Option<String>,
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
            database: DatabaseConfig {
                url: "sqlite://matchday.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            chat: ChatConfig { bot_token: String::new().into(), client_id: String::new() },
            classifier: ClassifierConfig {
                command: "python3".to_string(),
                script: "model.py".to_string(),
                timeout_secs: 60,
                extra_args: Vec::new(),
            },
            scheduler: SchedulerConfig {
                channel_id: String::new(),
                poll_quorum: 3,
                max_clarification_turns: 3,
                fallback_times: vec![
                    "Tuesday 7pm".to_string(),
                    "Wednesday 5pm".to_string(),
                    "Friday 9pm".to_string(),
                ],
                greeting: "Hi!\nI'm the matchday bot for the home team.\nI handle scheduling and \
                           we're due to play your squad this week.\nYou may suggest a time or I \
                           can give you some options."
                    .to_string(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("matchday.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// The slice of configuration the dialog engine needs.
    pub fn dialog_policy(&self) -> DialogPolicy {
        DialogPolicy {
            poll_quorum: self.scheduler.poll_quorum,
            max_clarification_turns: self.scheduler.max_clarification_turns,
            fallback_times: self.scheduler.fallback_times.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(bot_token_value) = chat.bot_token {
                self.chat.bot_token = secret_value(bot_token_value);
            }
            if let Some(client_id) = chat.client_id {
                self.chat.client_id = client_id;
            }
        }

        if let Some(classifier) = patch.classifier {
            if let Some(command) = classifier.command {
                self.classifier.command = command;
            }
            if let Some(script) = classifier.script {
                self.classifier.script = script;
            }
            if let Some(timeout_secs) = classifier.timeout_secs {
                self.classifier.timeout_secs = timeout_secs;
            }
            if let Some(extra_args) = classifier.extra_args {
                self.classifier.extra_args = extra_args;
            }
        }

        if let Some(scheduler) = patch.scheduler {
            if let Some(channel_id) = scheduler.channel_id {
                self.scheduler.channel_id = channel_id;
            }
            if let Some(poll_quorum) = scheduler.poll_quorum {
                self.scheduler.poll_quorum = poll_quorum;
            }
            if let Some(max_clarification_turns) = scheduler.max_clarification_turns {
                self.scheduler.max_clarification_turns = max_clarification_turns;
            }
            if let Some(fallback_times) = scheduler.fallback_times {
                self.scheduler.fallback_times = fallback_times;
            }
            if let Some(greeting) = scheduler.greeting {
                self.scheduler.greeting = greeting;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
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
        if let Some(value) = read_env("MATCHDAY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MATCHDAY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("MATCHDAY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MATCHDAY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("MATCHDAY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MATCHDAY_CHAT_BOT_TOKEN") {
            self.chat.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("MATCHDAY_CHAT_CLIENT_ID") {
            self.chat.client_id = value;
        }

        if let Some(value) = read_env("MATCHDAY_CLASSIFIER_COMMAND") {
            self.classifier.command = value;
        }
        if let Some(value) = read_env("MATCHDAY_CLASSIFIER_SCRIPT") {
            self.classifier.script = value;
        }
        if let Some(value) = read_env("MATCHDAY_CLASSIFIER_TIMEOUT_SECS") {
            self.classifier.timeout_secs = parse_u64("MATCHDAY_CLASSIFIER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MATCHDAY_SCHEDULER_CHANNEL_ID") {
            self.scheduler.channel_id = value;
        }
        if let Some(value) = read_env("MATCHDAY_SCHEDULER_POLL_QUORUM") {
            self.scheduler.poll_quorum = parse_u32("MATCHDAY_SCHEDULER_POLL_QUORUM", &value)?;
        }
        if let Some(value) = read_env("MATCHDAY_SCHEDULER_MAX_CLARIFICATION_TURNS") {
            self.scheduler.max_clarification_turns =
                parse_u32("MATCHDAY_SCHEDULER_MAX_CLARIFICATION_TURNS", &value)?;
        }

        if let Some(value) = read_env("MATCHDAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MATCHDAY_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("MATCHDAY_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("MATCHDAY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("MATCHDAY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("MATCHDAY_LOGGING_LEVEL").or_else(|| read_env("MATCHDAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MATCHDAY_LOGGING_FORMAT").or_else(|| read_env("MATCHDAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.chat_bot_token {
            self.chat.bot_token = secret_value(bot_token);
        }
        if let Some(client_id) = overrides.chat_client_id {
            self.chat.client_id = client_id;
        }
        if let Some(channel_id) = overrides.scheduler_channel_id {
            self.scheduler.channel_id = channel_id;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_chat(&self.chat)?;
        validate_classifier(&self.classifier)?;
        validate_scheduler(&self.scheduler)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("matchday.toml"), PathBuf::from("config/matchday.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.bot_token is required. Use the bot token from your platform's developer portal"
                .to_string(),
        ));
    }

    if chat.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.client_id is required (the bot's own user id; used to strip self-mentions)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_classifier(classifier: &ClassifierConfig) -> Result<(), ConfigError> {
    if classifier.command.trim().is_empty() {
        return Err(ConfigError::Validation(
            "classifier.command must name the interpreter to launch".to_string(),
        ));
    }

    if classifier.script.trim().is_empty() {
        return Err(ConfigError::Validation(
            "classifier.script must name the classifier entry point".to_string(),
        ));
    }

    if classifier.timeout_secs == 0 || classifier.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "classifier.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_scheduler(scheduler: &SchedulerConfig) -> Result<(), ConfigError> {
    if scheduler.channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "scheduler.channel_id is required (the channel where polls are posted)".to_string(),
        ));
    }

    if scheduler.poll_quorum == 0 {
        return Err(ConfigError::Validation(
            "scheduler.poll_quorum must be greater than zero".to_string(),
        ));
    }

    if scheduler.max_clarification_turns == 0 {
        return Err(ConfigError::Validation(
            "scheduler.max_clarification_turns must be greater than zero".to_string(),
        ));
    }

    if scheduler.fallback_times.is_empty() {
        return Err(ConfigError::Validation(
            "scheduler.fallback_times must list at least one option".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    chat: Option<ChatPatch>,
    classifier: Option<ClassifierPatch>,
    scheduler: Option<SchedulerPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    bot_token: Option<String>,
    client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifierPatch {
    command: Option<String>,
    script: Option<String>,
    timeout_secs: Option<u64>,
    extra_args: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerPatch {
    channel_id: Option<String>,
    poll_quorum: Option<u32>,
    max_clarification_turns: Option<u32>,
    fallback_times: Option<Vec<String>>,
    greeting: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
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
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

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

    fn required_overrides() -> ConfigOverrides {
        ConfigOverrides {
            chat_bot_token: Some("token-test".to_string()),
            chat_client_id: Some("B0T".to_string()),
            scheduler_channel_id: Some("C-SCHED".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_MATCHDAY_BOT_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("matchday.toml");
            fs::write(
                &path,
                r#"
[chat]
bot_token = "${TEST_MATCHDAY_BOT_TOKEN}"
client_id = "B0T"

[scheduler]
channel_id = "C-SCHED"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.chat.bot_token.expose_secret() == "token-from-env",
                "bot token should be loaded from environment",
            )?;
            ensure(config.scheduler.channel_id == "C-SCHED", "channel id should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_MATCHDAY_BOT_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MATCHDAY_LOG_LEVEL", "warn");
        env::set_var("MATCHDAY_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: required_overrides(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env",
            )?;
            Ok(())
        })();

        clear_vars(&["MATCHDAY_LOG_LEVEL", "MATCHDAY_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MATCHDAY_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("MATCHDAY_CHAT_BOT_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("matchday.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[chat]
bot_token = "token-from-file"
client_id = "B0T"

[scheduler]
channel_id = "C-SCHED"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.chat.bot_token.expose_secret() == "token-from-env",
                "env bot token should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["MATCHDAY_DATABASE_URL", "MATCHDAY_CHAT_BOT_TOKEN"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                chat_bot_token: Some("token-test".to_string()),
                chat_client_id: Some("B0T".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but load succeeded".to_string()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("scheduler.channel_id")
        );
        ensure(has_message, "validation failure should mention scheduler.channel_id")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                chat_bot_token: Some("token-secret-value".to_string()),
                ..required_overrides()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;
        let debug = format!("{config:?}");

        ensure(
            !debug.contains("token-secret-value"),
            "debug output should not contain the bot token",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn dialog_policy_mirrors_scheduler_settings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: required_overrides(),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        let policy = config.dialog_policy();
        ensure(policy.poll_quorum == config.scheduler.poll_quorum, "quorum should match")?;
        ensure(
            policy.fallback_times == config.scheduler.fallback_times,
            "fallback times should match",
        )
    }
}
