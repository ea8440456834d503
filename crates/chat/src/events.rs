use crate::commands::ScheduleCommandPayload;

/// One delivery from the platform transport, acknowledged by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

/// Closed inbound event model, built once at the transport boundary and
/// matched exhaustively by the router. Payload fields are already
/// normalized (mentions stripped, ids resolved).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    DirectMessage { user_id: String, text: String },
    ChannelMention { channel_id: String, user_id: String, text: String },
    ButtonClick { message_id: String, component_id: String, user_id: String },
    ReactionAdded { message_id: String, user_id: String, emoji: String },
    ReactionRemoved { message_id: String, user_id: String, emoji: String },
    Command(ScheduleCommandPayload),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectMessage { .. } => "direct_message",
            Self::ChannelMention { .. } => "channel_mention",
            Self::ButtonClick { .. } => "button_click",
            Self::ReactionAdded { .. } => "reaction_added",
            Self::ReactionRemoved { .. } => "reaction_removed",
            Self::Command(_) => "command",
            Self::Unsupported { .. } => "unsupported",
        }
    }

    pub fn acting_user(&self) -> Option<&str> {
        match self {
            Self::DirectMessage { user_id, .. }
            | Self::ChannelMention { user_id, .. }
            | Self::ButtonClick { user_id, .. }
            | Self::ReactionAdded { user_id, .. }
            | Self::ReactionRemoved { user_id, .. } => Some(user_id),
            Self::Command(payload) => Some(&payload.invoker_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// Removes `<@id>` / `<@!id>` self-mentions from channel text so the
/// classifier sees only the user's words.
pub fn strip_bot_mention(text: &str, bot_user_id: &str) -> String {
    let plain = format!("<@{bot_user_id}>");
    let nicked = format!("<@!{bot_user_id}>");
    text.replace(&plain, "").replace(&nicked, "").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::{strip_bot_mention, ChatEvent};

    #[test]
    fn mention_tokens_are_stripped_in_both_forms() {
        assert_eq!(strip_bot_mention("<@99> when do we play?", "99"), "when do we play?");
        assert_eq!(strip_bot_mention("hey <@!99>, poll time", "99"), "hey , poll time");
        assert_eq!(strip_bot_mention("<@42> untouched", "99"), "<@42> untouched");
    }

    #[test]
    fn acting_user_resolves_per_variant() {
        let event = ChatEvent::ButtonClick {
            message_id: "m-1".to_owned(),
            component_id: "confirm".to_owned(),
            user_id: "U-1".to_owned(),
        };
        assert_eq!(event.acting_user(), Some("U-1"));
        assert_eq!(event.kind(), "button_click");

        let unsupported = ChatEvent::Unsupported { event_type: "typing_start".to_owned() };
        assert_eq!(unsupported.acting_user(), None);
    }
}
