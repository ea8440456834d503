use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use matchday_core::config::ClassifierConfig;
use matchday_core::{Classification, ClassifierError, ClassifyFields, IntentClassifier};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::protocol;

/// Invokes the external classifier as a child process, passing each field
/// as a `--name=value` argument and reading one JSON object from stdout.
/// A slow model run is bounded by the configured timeout; expiry kills
/// the child.
pub struct SubprocessClassifier {
    command: String,
    script: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl SubprocessClassifier {
    pub fn new(
        command: impl Into<String>,
        script: impl Into<String>,
        extra_args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self { command: command.into(), script: script.into(), extra_args, timeout }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            &config.command,
            &config.script,
            config.extra_args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl IntentClassifier for SubprocessClassifier {
    async fn classify(&self, fields: &ClassifyFields)
        -> Result<Classification, ClassifierError> {
        let mut command = Command::new(&self.command);
        command.arg(&self.script);
        for arg in &self.extra_args {
            command.arg(arg);
        }
        for (name, value) in fields.iter() {
            command.arg(format!("--{name}={value}"));
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            event_name = "classifier.invocation_started",
            command = %self.command,
            script = %self.script,
            "spawning classifier process"
        );

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(ClassifierError::Spawn)?,
            Err(_) => {
                warn!(
                    event_name = "classifier.invocation_timed_out",
                    timeout_secs = self.timeout.as_secs(),
                    "classifier exceeded its deadline; child killed"
                );
                return Err(ClassifierError::Timeout { elapsed_secs: self.timeout.as_secs() });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(
                event_name = "classifier.invocation_failed",
                exit_code,
                "classifier exited non-zero"
            );
            return Err(ClassifierError::Failure { exit_code, stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        protocol::parse_output(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use matchday_core::{ClassifierError, ClassifyFields, Intent, IntentClassifier};

    use super::SubprocessClassifier;

    // `sh -c <script>` stands in for the real interpreter + model script;
    // the classifier fields land after the script and are ignored by it.
    fn scripted(script: &str, timeout: Duration) -> SubprocessClassifier {
        SubprocessClassifier::new("sh", "-c", vec![script.to_owned()], timeout)
    }

    #[tokio::test]
    async fn successful_invocation_parses_the_reply() {
        let classifier = scripted(
            r#"echo '{"answer": "Monday might work, let me check with the team.",
                "score": 0.95, "question": "Can we play Monday at 9pm?",
                "intent": "suggestion", "poll": "Monday/9pm"}'"#,
            Duration::from_secs(5),
        );

        let classification = classifier
            .classify(&ClassifyFields::direct_message("Monday at 9pm", "initiated"))
            .await
            .expect("classification should succeed");

        assert_eq!(classification.intent, Intent::Suggestion);
        assert!(classification.proposes_time());
    }

    #[tokio::test]
    async fn non_zero_exit_surfaces_captured_stderr() {
        let classifier = scripted("echo 'model load failed' >&2; exit 3", Duration::from_secs(5));

        let error = classifier
            .classify(&ClassifyFields::mention("hello"))
            .await
            .expect_err("non-zero exit should fail");

        match error {
            ClassifierError::Failure { exit_code, stderr } => {
                assert_eq!(exit_code, 3);
                assert!(stderr.contains("model load failed"));
            }
            other => panic!("expected Failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_stdout_is_a_protocol_error() {
        let classifier = scripted("echo 'not json'", Duration::from_secs(5));

        let error = classifier
            .classify(&ClassifyFields::mention("hello"))
            .await
            .expect_err("malformed output should fail");
        assert!(matches!(error, ClassifierError::Protocol(_)));
    }

    #[tokio::test]
    async fn slow_invocations_hit_the_deadline() {
        let classifier = scripted("sleep 5", Duration::from_millis(200));

        let error = classifier
            .classify(&ClassifyFields::mention("hello"))
            .await
            .expect_err("deadline should expire");
        assert!(matches!(error, ClassifierError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_spawn_error() {
        let classifier = SubprocessClassifier::new(
            "definitely-not-a-real-binary",
            "model.py",
            Vec::new(),
            Duration::from_secs(5),
        );

        let error = classifier
            .classify(&ClassifyFields::mention("hello"))
            .await
            .expect_err("spawn should fail");
        assert!(matches!(error, ClassifierError::Spawn(_)));
    }
}
