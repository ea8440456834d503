use std::sync::Arc;

use async_trait::async_trait;
use matchday_chat::api::{ChatApi, MessageId, TransportError};
use matchday_chat::router::{InteractionRouter, RouterConfig};
use matchday_chat::socket::{NoopEventSource, ReconnectPolicy, SocketRunner};
use matchday_chat::widgets::ButtonGroup;
use matchday_classifier::SubprocessClassifier;
use matchday_core::config::{AppConfig, ConfigError, LoadOptions};
use matchday_core::DialogEngine;
use matchday_db::{connect_with_settings, migrations, DbPool, SqlConversationStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub router: Arc<InteractionRouter>,
    pub runner: SocketRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        user_id = "unknown",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        user_id = "unknown",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        user_id = "unknown",
        "database migrations applied"
    );

    let router = Arc::new(InteractionRouter::new(
        Arc::new(UnconfiguredChatApi),
        Arc::new(SqlConversationStore::new(db_pool.clone())),
        Arc::new(SubprocessClassifier::from_config(&config.classifier)),
        DialogEngine::new(config.dialog_policy()),
        RouterConfig {
            channel_id: config.scheduler.channel_id.clone(),
            greeting: config.scheduler.greeting.clone(),
            bot_user_id: config.chat.client_id.clone(),
        },
    ));

    // The concrete platform connection plugs in as an EventSource +
    // ChatApi pair; without one the runner idles on the noop source.
    let runner =
        SocketRunner::new(Arc::new(NoopEventSource), Arc::clone(&router), ReconnectPolicy::default());

    Ok(Application { config, db_pool, router, runner })
}

/// Placeholder outbound transport used until a platform client is wired
/// in; every delivery reports a transport failure.
struct UnconfiguredChatApi;

#[async_trait]
impl ChatApi for UnconfiguredChatApi {
    async fn send_direct_message(
        &self,
        _user_id: &str,
        _text: &str,
        _buttons: Option<&ButtonGroup>,
    ) -> Result<MessageId, TransportError> {
        Err(TransportError::DirectMessage("no platform transport configured".to_owned()))
    }

    async fn reply_channel(
        &self,
        _channel_id: &str,
        _text: &str,
        _buttons: Option<&ButtonGroup>,
    ) -> Result<MessageId, TransportError> {
        Err(TransportError::Channel("no platform transport configured".to_owned()))
    }

    async fn edit_message(
        &self,
        _message_id: &MessageId,
        _buttons: &ButtonGroup,
    ) -> Result<(), TransportError> {
        Err(TransportError::Edit("no platform transport configured".to_owned()))
    }

    async fn react(&self, _message_id: &MessageId, _emoji: &str) -> Result<(), TransportError> {
        Err(TransportError::React("no platform transport configured".to_owned()))
    }
}
