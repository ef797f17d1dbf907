//! Plan event: evaluate one task against the cycle, then book it at the
//! original or the suggested time.

use chrono::{DateTime, TimeDelta, Utc};

use crate::api::{NewEvent, PlanCategory, PlanSuggestion, PlanTask};
use crate::error::FlowError;

pub const DEFAULT_DURATION_HOURS: f64 = 1.0;
/// Longest event the form books.
pub const MAX_DURATION_HOURS: f64 = 24.0;

/// In-progress plan-event form.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEventForm {
    pub title: String,
    pub category: PlanCategory,
    pub start: Option<DateTime<Utc>>,
    pub duration_hours: f64,
}

impl Default for PlanEventForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: PlanCategory::default(),
            start: None,
            duration_hours: DEFAULT_DURATION_HOURS,
        }
    }
}

fn incomplete(field: &str) -> FlowError {
    FlowError::ValidationIncomplete {
        step: 1,
        field: field.to_string(),
    }
}

impl PlanEventForm {
    /// Validate the form into the task sent for evaluation.
    pub fn to_task(&self) -> Result<PlanTask, FlowError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(incomplete("title"));
        }
        let start_time = self.start.ok_or_else(|| incomplete("start time"))?;
        if !(self.duration_hours.is_finite()
            && self.duration_hours > 0.0
            && self.duration_hours <= MAX_DURATION_HOURS)
        {
            return Err(incomplete("a duration between 0 and 24 hours"));
        }
        Ok(PlanTask {
            title: title.to_string(),
            category: self.category,
            start_time,
            duration_hours: self.duration_hours,
        })
    }
}

/// Which slot to book after evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChoice {
    Original,
    Suggested,
}

/// A task together with the backend's verdict on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub task: PlanTask,
    pub suggestion: PlanSuggestion,
}

impl Evaluation {
    pub fn has_suggested_slot(&self) -> bool {
        self.suggestion.suggested_start.is_some()
    }

    pub fn slot_start(&self, choice: SlotChoice) -> Result<DateTime<Utc>, FlowError> {
        match choice {
            SlotChoice::Original => Ok(self.suggestion.original_start),
            SlotChoice::Suggested => self
                .suggestion
                .suggested_start
                .ok_or(FlowError::NoSuggestedSlot),
        }
    }

    /// The calendar event to create for `choice`; it lasts the task's
    /// duration from the chosen start.
    pub fn event_for(&self, choice: SlotChoice) -> Result<NewEvent, FlowError> {
        let start = self.slot_start(choice)?;
        let end = duration(self.task.duration_hours)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or_else(|| incomplete("a duration that ends within the calendar range"))?;
        Ok(NewEvent {
            title: self.task.title.clone(),
            start,
            end,
            description: format!("Category: {}. Planned via cycle planner.", self.task.category),
        })
    }
}

fn duration(hours: f64) -> Option<TimeDelta> {
    if !(hours.is_finite() && hours > 0.0 && hours <= MAX_DURATION_HOURS) {
        return None;
    }
    TimeDelta::try_milliseconds((hours * 3_600_000.0).round() as i64)
}
