use std::collections::BTreeMap;

use matchday_core::{Classification, ClassifierError, Intent, TimeSlots};
use serde::Deserialize;

/// Wire shape of one classifier reply (protocol v1, flat). The classifier
/// prints exactly one JSON object on stdout; anything else is a protocol
/// error, including the historical nested `{"response": {...}}` shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireClassification {
    pub answer: String,
    pub score: f64,
    pub question: String,
    pub intent: String,
    #[serde(default)]
    pub intent_scores: BTreeMap<String, f64>,
    /// Concrete proposal as a `"day/time"` string, present only for
    /// time-bearing replies.
    #[serde(default)]
    pub poll: Option<String>,
    // Linguistic attributes the model also reports; carried so the strict
    // field check stays honest about what v1 actually emits.
    #[serde(default)]
    pub has_date: Option<bool>,
    #[serde(default)]
    pub has_time: Option<bool>,
    #[serde(default)]
    pub is_wh_question: Option<bool>,
    #[serde(default)]
    pub has_auxiliary_verb: Option<bool>,
    #[serde(default)]
    pub has_inversion: Option<bool>,
    #[serde(default)]
    pub uncorrected_words: Option<BTreeMap<String, Option<String>>>,
}

impl WireClassification {
    pub fn into_classification(self) -> Classification {
        let slots = self.poll.as_deref().and_then(parse_poll_slots);
        Classification {
            intent: Intent::from_tag(&self.intent),
            score: self.score.clamp(0.0, 1.0),
            answer: self.answer,
            question: self.question,
            intent_scores: self.intent_scores,
            slots,
        }
    }
}

pub fn parse_output(stdout: &str) -> Result<Classification, ClassifierError> {
    let wire: WireClassification = serde_json::from_str(stdout.trim())
        .map_err(|error| ClassifierError::Protocol(error.to_string()))?;
    Ok(wire.into_classification())
}

fn parse_poll_slots(poll: &str) -> Option<TimeSlots> {
    let (day, time) = poll.split_once('/')?;
    let day = day.trim();
    let time = time.trim();
    if day.is_empty() || time.is_empty() {
        return None;
    }
    Some(TimeSlots { day: day.to_owned(), time: time.to_owned() })
}

#[cfg(test)]
mod tests {
    use matchday_core::{ClassifierError, Intent};

    use super::parse_output;

    #[test]
    fn flat_v1_reply_parses_into_a_classification() {
        let stdout = r#"
        {
            "answer": "Monday might work, let me check with the team.",
            "score": 1.0,
            "question": "Can we play Monday at 9pm?",
            "intent": "suggestion",
            "intent_scores": {"suggestion": 0.91, "request": 0.44},
            "poll": "Monday/9pm",
            "has_date": true,
            "has_time": true
        }
        "#;

        let classification = parse_output(stdout).expect("parse");
        assert_eq!(classification.intent, Intent::Suggestion);
        assert!(classification.proposes_time());
        let slots = classification.slots.expect("slots");
        assert_eq!(slots.day, "Monday");
        assert_eq!(slots.time, "9pm");
        assert_eq!(classification.intent_scores.len(), 2);
    }

    #[test]
    fn reply_without_poll_carries_no_slots() {
        let stdout = r#"{"answer": "When suits you?", "score": 0.62,
            "question": "What time works?", "intent": "request"}"#;

        let classification = parse_output(stdout).expect("parse");
        assert_eq!(classification.intent, Intent::Request);
        assert_eq!(classification.slots, None);
        assert!(!classification.proposes_time());
    }

    #[test]
    fn nested_legacy_shape_is_a_protocol_error() {
        let stdout = r#"{"response": {"answer": "hello", "score": 0.9}, "question": "hi"}"#;
        let error = parse_output(stdout).expect_err("nested shape must be rejected");
        assert!(matches!(error, ClassifierError::Protocol(_)));
    }

    #[test]
    fn non_json_output_is_a_protocol_error() {
        let error = parse_output("Traceback (most recent call last):").expect_err("reject");
        assert!(matches!(error, ClassifierError::Protocol(_)));
    }

    #[test]
    fn scores_are_clamped_and_unknown_intents_collapse() {
        let stdout = r#"{"answer": "ok", "score": 7.5, "question": "ok",
            "intent": "banter", "poll": "Friday/"}"#;

        let classification = parse_output(stdout).expect("parse");
        assert_eq!(classification.score, 1.0);
        assert_eq!(classification.intent, Intent::Other);
        // A malformed poll string degrades to "no slots", not an error.
        assert_eq!(classification.slots, None);
    }
}
