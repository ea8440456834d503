use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::events::{EventContext, EventEnvelope};
use crate::router::InteractionRouter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Inbound side of the transport: a stream of acknowledged envelopes.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn connect(&self) -> Result<(), SourceError>;
    async fn next_envelope(&self) -> Result<Option<EventEnvelope>, SourceError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), SourceError>;
    async fn disconnect(&self) -> Result<(), SourceError>;
}

/// Source that yields nothing; lets the process run without a platform
/// connection configured.
#[derive(Default)]
pub struct NoopEventSource;

#[async_trait]
impl EventSource for NoopEventSource {
    async fn connect(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<EventEnvelope>, SourceError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), SourceError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Event pump: receives envelopes, acknowledges them, and hands each one
/// to the router on its own task so one slow classifier run never blocks
/// other users' events. Reconnects with exponential backoff and degrades
/// to a no-op instead of crashing when retries are exhausted.
pub struct SocketRunner {
    source: Arc<dyn EventSource>,
    router: Arc<InteractionRouter>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketRunner {
    pub fn new(
        source: Arc<dyn EventSource>,
        router: Arc<InteractionRouter>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { source, router, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(source_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %source_error,
                        "event source failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "event source retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), SourceError> {
        info!(attempt, "opening event source connection");
        self.source.connect().await?;
        info!(attempt, "event source connected");

        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            let Some(envelope) = self.source.next_envelope().await? else {
                info!(attempt, "event source stream closed");
                self.source.disconnect().await?;
                // Finish what was already accepted before returning.
                while in_flight.join_next().await.is_some() {}
                return Ok(());
            };

            info!(
                event_name = "ingress.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = envelope.event.kind(),
                correlation_id = %envelope.envelope_id,
                user_id = envelope.event.acting_user().unwrap_or("unknown"),
                "received envelope"
            );

            if let Err(error) = self.source.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.ack_failed",
                    envelope_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    "acknowledged envelope"
                );
            }

            let router = Arc::clone(&self.router);
            in_flight.spawn(async move {
                let ctx = EventContext { correlation_id: envelope.envelope_id.clone() };
                if let Err(error) = router.handle(&envelope.event, &ctx).await {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        error = %error,
                        "event handling failed; event dropped"
                    );
                }
            });

            // Reap completed handlers so the set stays bounded.
            while in_flight.try_join_next().is_some() {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use matchday_core::{
        Classification, ClassifierError, ClassifyFields, DialogEngine, DialogPolicy,
        IntentClassifier,
    };
    use matchday_db::InMemoryConversationStore;
    use tokio::sync::Mutex;

    use super::{EventSource, NoopEventSource, ReconnectPolicy, SocketRunner, SourceError};
    use crate::api::{ChatApi, MessageId, TransportError};
    use crate::events::{ChatEvent, EventEnvelope};
    use crate::router::{InteractionRouter, RouterConfig};
    use crate::widgets::ButtonGroup;

    struct SilentChatApi;

    #[async_trait]
    impl ChatApi for SilentChatApi {
        async fn send_direct_message(
            &self,
            _user_id: &str,
            _text: &str,
            _buttons: Option<&ButtonGroup>,
        ) -> Result<MessageId, TransportError> {
            Ok(MessageId("m-0".to_owned()))
        }

        async fn reply_channel(
            &self,
            _channel_id: &str,
            _text: &str,
            _buttons: Option<&ButtonGroup>,
        ) -> Result<MessageId, TransportError> {
            Ok(MessageId("m-0".to_owned()))
        }

        async fn edit_message(
            &self,
            _message_id: &MessageId,
            _buttons: &ButtonGroup,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn react(
            &self,
            _message_id: &MessageId,
            _emoji: &str,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl IntentClassifier for FailingClassifier {
        async fn classify(
            &self,
            _fields: &ClassifyFields,
        ) -> Result<Classification, ClassifierError> {
            Err(ClassifierError::Protocol("not scripted".to_owned()))
        }
    }

    fn router() -> Arc<InteractionRouter> {
        Arc::new(InteractionRouter::new(
            Arc::new(SilentChatApi),
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(FailingClassifier),
            DialogEngine::new(DialogPolicy::default()),
            RouterConfig {
                channel_id: "C-sched".to_owned(),
                greeting: "hi".to_owned(),
                bot_user_id: "B0T".to_owned(),
            },
        ))
    }

    #[derive(Default)]
    struct ScriptedSource {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), SourceError>>,
        envelopes: VecDeque<Result<Option<EventEnvelope>, SourceError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
        disconnect_calls: usize,
    }

    impl ScriptedSource {
        fn with_script(
            connect_results: Vec<Result<(), SourceError>>,
            envelopes: Vec<Result<Option<EventEnvelope>, SourceError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn connect(&self) -> Result<(), SourceError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<EventEnvelope>, SourceError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), SourceError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), SourceError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            Ok(())
        }
    }

    fn unsupported_envelope(id: &str) -> EventEnvelope {
        EventEnvelope {
            envelope_id: id.to_owned(),
            event: ChatEvent::Unsupported { event_type: "typing_start".to_owned() },
        }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let source = Arc::new(ScriptedSource::with_script(
            vec![Err(SourceError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(unsupported_envelope("env-1"))), Ok(None)],
        ));

        let runner = SocketRunner::new(
            source.clone(),
            router(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should not fail");

        assert_eq!(source.connect_attempts().await, 2);
        assert_eq!(source.acknowledgements().await, vec!["env-1"]);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let source = Arc::new(ScriptedSource::with_script(
            vec![
                Err(SourceError::Connect("fail-1".to_owned())),
                Err(SourceError::Connect("fail-2".to_owned())),
                Err(SourceError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner = SocketRunner::new(
            source.clone(),
            router(),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(source.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn handler_failures_do_not_stop_the_pump() {
        // A failing store makes the schedule command error out inside the
        // handler; the pump must log it and keep consuming.
        let failing_router = Arc::new(InteractionRouter::new(
            Arc::new(SilentChatApi),
            Arc::new(InMemoryConversationStore::failing()),
            Arc::new(FailingClassifier),
            DialogEngine::new(DialogPolicy::default()),
            RouterConfig {
                channel_id: "C-sched".to_owned(),
                greeting: "hi".to_owned(),
                bot_user_id: "B0T".to_owned(),
            },
        ));

        let command = EventEnvelope {
            envelope_id: "env-cmd".to_owned(),
            event: ChatEvent::Command(crate::commands::ScheduleCommandPayload {
                command: "/schedule".to_owned(),
                text: "<@U-captain>".to_owned(),
                channel_id: "C-admin".to_owned(),
                invoker_id: "U-coach".to_owned(),
                request_id: "req-1".to_owned(),
            }),
        };
        let source = Arc::new(ScriptedSource::with_script(
            vec![Ok(())],
            vec![Ok(Some(command)), Ok(Some(unsupported_envelope("env-2"))), Ok(None)],
        ));

        let runner = SocketRunner::new(source.clone(), failing_router, ReconnectPolicy::default());
        runner.start().await.expect("runner should survive handler failures");

        assert_eq!(source.acknowledgements().await, vec!["env-cmd", "env-2"]);
    }

    #[tokio::test]
    async fn noop_source_runs_to_completion() {
        let runner =
            SocketRunner::new(Arc::new(NoopEventSource), router(), ReconnectPolicy::default());
        runner.start().await.expect("noop source should terminate cleanly");
    }
}
