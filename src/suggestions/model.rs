//! Suggestion data model: agent-proposed calendar mutations.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::api::EventMove;
use crate::error::FlowError;

/// Default length of a moved event when the agent gives no end.
pub const DEFAULT_MOVE_DURATION: TimeDelta = TimeDelta::hours(1);

/// What the agent proposes for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    /// Reschedule the event.
    Move,
    /// Leave it; display only.
    Keep,
}

impl std::fmt::Display for SuggestionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Keep => write!(f, "keep"),
        }
    }
}

/// One proposed calendar mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub event_id: String,
    #[serde(default)]
    pub event_title: String,
    pub action: SuggestionAction,
    #[serde(default, with = "crate::timestamp::option")]
    pub new_start: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::option")]
    pub new_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: String,
}

/// Identity of a suggestion across fetches: `(event_id, new_start, new_end)`
/// as received, before any end-time derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuggestionKey {
    pub event_id: String,
    pub new_start: Option<DateTime<Utc>>,
    pub new_end: Option<DateTime<Utc>>,
}

impl std::fmt::Display for SuggestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_ts = |ts: &Option<DateTime<Utc>>| {
            ts.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
        };
        write!(
            f,
            "{}@{}..{}",
            self.event_id,
            fmt_ts(&self.new_start),
            fmt_ts(&self.new_end)
        )
    }
}

impl Suggestion {
    pub fn key(&self) -> SuggestionKey {
        SuggestionKey {
            event_id: self.event_id.clone(),
            new_start: self.new_start,
            new_end: self.new_end,
        }
    }

    /// Whether the suggestion can be sent as a calendar move.
    pub fn is_applicable(&self) -> bool {
        self.action == SuggestionAction::Move
            && self.new_start.is_some()
            && self.effective_end().is_some()
    }

    /// The end to send: the given one, or one hour after the new start.
    /// `None` when there is no start or the derived end is out of range.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.new_end.or_else(|| {
            self.new_start
                .and_then(|start| start.checked_add_signed(DEFAULT_MOVE_DURATION))
        })
    }

    /// Build the calendar mutation for this suggestion.
    pub fn to_move(&self) -> Result<EventMove, FlowError> {
        if self.action == SuggestionAction::Keep {
            return Err(FlowError::NotApplicable {
                event_id: self.event_id.clone(),
                reason: "keep suggestions are display-only".to_string(),
            });
        }
        let Some(new_start) = self.new_start else {
            return Err(FlowError::NotApplicable {
                event_id: self.event_id.clone(),
                reason: "no new start time".to_string(),
            });
        };
        let Some(new_end) = self.effective_end() else {
            return Err(FlowError::NotApplicable {
                event_id: self.event_id.clone(),
                reason: "end time out of range".to_string(),
            });
        };
        Ok(EventMove {
            event_id: self.event_id.clone(),
            new_start,
            new_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, h, 0, 0).unwrap()
    }

    fn moving(id: &str, start: u32, end: Option<u32>) -> Suggestion {
        Suggestion {
            event_id: id.into(),
            event_title: "Exam".into(),
            action: SuggestionAction::Move,
            new_start: Some(ts(start)),
            new_end: end.map(ts),
            reason: "later fits better".into(),
        }
    }

    #[test]
    fn missing_end_defaults_to_one_hour() {
        let s = moving("e1", 10, None);
        let mv = s.to_move().unwrap();
        assert_eq!(mv.new_start, ts(10));
        assert_eq!(mv.new_end, ts(11));
        // The key keeps the end as received.
        assert_eq!(s.key().new_end, None);
    }

    #[test]
    fn explicit_end_is_kept() {
        let mv = moving("e1", 10, Some(13)).to_move().unwrap();
        assert_eq!(mv.new_end, ts(13));
    }

    #[test]
    fn keep_is_not_applicable() {
        let keep = Suggestion {
            action: SuggestionAction::Keep,
            new_start: None,
            ..moving("e2", 9, None)
        };
        assert!(!keep.is_applicable());
        assert!(matches!(keep.to_move(), Err(FlowError::NotApplicable { .. })));
    }

    #[test]
    fn move_without_start_is_not_applicable() {
        let s = Suggestion {
            new_start: None,
            ..moving("e3", 9, None)
        };
        assert!(!s.is_applicable());
        assert!(s.to_move().is_err());
    }

    #[test]
    fn derived_end_past_max_date_is_not_applicable() {
        let s = Suggestion {
            new_start: Some(DateTime::<Utc>::MAX_UTC),
            ..moving("e4", 9, None)
        };
        assert!(s.effective_end().is_none());
        assert!(!s.is_applicable());
        assert!(matches!(s.to_move(), Err(FlowError::NotApplicable { .. })));
    }

    #[test]
    fn keys_compare_by_value() {
        let a = moving("e1", 10, Some(11));
        let mut b = a.clone();
        b.reason = "different words".into();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), moving("e1", 12, Some(13)).key());
    }

    #[test]
    fn wire_format_from_agent() {
        let s: Suggestion = serde_json::from_str(
            r#"{"event_id": "abc", "event_title": "Drinks", "action": "move",
                "new_start": "2024-01-05T19:00:00", "new_end": null,
                "reason": "Move it out of menstrual phase"}"#,
        )
        .unwrap();
        assert_eq!(s.action, SuggestionAction::Move);
        assert_eq!(s.new_start, Some(ts(19)));
        assert!(s.new_end.is_none());

        let keep: Suggestion = serde_json::from_str(
            r#"{"event_id": "no-events", "action": "keep", "reason": "Nothing to do"}"#,
        )
        .unwrap();
        assert_eq!(keep.event_title, "");
    }
}
