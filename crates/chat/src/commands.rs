use thiserror::Error;

/// Raw `/schedule` invocation as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub invoker_id: String,
    pub request_id: String,
}

/// Normalized admin command: open scheduling with one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleCommand {
    pub target_user_id: String,
    pub channel_id: String,
    pub invoker_id: String,
    pub request_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),
    #[error("schedule requires a user argument, e.g. `/schedule <@captain>`")]
    MissingUser,
}

pub fn parse_schedule_command(
    payload: ScheduleCommandPayload,
) -> Result<ScheduleCommand, CommandParseError> {
    if payload.command != "/schedule" {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let target = payload
        .text
        .split_whitespace()
        .next()
        .and_then(parse_user_token)
        .ok_or(CommandParseError::MissingUser)?;

    Ok(ScheduleCommand {
        target_user_id: target,
        channel_id: payload.channel_id,
        invoker_id: payload.invoker_id,
        request_id: payload.request_id,
    })
}

/// Accepts `<@123>`, `<@!123>`, or a bare id.
fn parse_user_token(token: &str) -> Option<String> {
    let inner = token
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(token);

    let inner = inner.trim();
    (!inner.is_empty()).then(|| inner.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{parse_schedule_command, CommandParseError, ScheduleCommandPayload};

    fn payload(command: &str, text: &str) -> ScheduleCommandPayload {
        ScheduleCommandPayload {
            command: command.to_owned(),
            text: text.to_owned(),
            channel_id: "C-admin".to_owned(),
            invoker_id: "U-coach".to_owned(),
            request_id: "req-1".to_owned(),
        }
    }

    #[test]
    fn mention_argument_resolves_to_the_user_id() {
        let command = parse_schedule_command(payload("/schedule", "<@U-captain>"))
            .expect("parse should succeed");
        assert_eq!(command.target_user_id, "U-captain");
        assert_eq!(command.channel_id, "C-admin");
    }

    #[test]
    fn nickname_mention_and_bare_id_are_accepted() {
        let nicked =
            parse_schedule_command(payload("/schedule", "<@!U-captain> next week")).expect("parse");
        assert_eq!(nicked.target_user_id, "U-captain");

        let bare = parse_schedule_command(payload("/schedule", "U-captain")).expect("parse");
        assert_eq!(bare.target_user_id, "U-captain");
    }

    #[test]
    fn missing_user_argument_is_rejected() {
        let error = parse_schedule_command(payload("/schedule", "   ")).expect_err("reject");
        assert_eq!(error, CommandParseError::MissingUser);
    }

    #[test]
    fn other_commands_are_rejected() {
        let error = parse_schedule_command(payload("/standings", "U-1")).expect_err("reject");
        assert!(matches!(error, CommandParseError::UnsupportedCommand(_)));
    }
}
