//! Six-step onboarding quiz.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::profile::WorkoutIntensity;

use super::{MultiSelect, WizardForm};

/// Symptoms offered by the quiz. Free-form values are accepted too.
pub const SYMPTOM_OPTIONS: &[&str] = &[
    "Cramps",
    "Fatigue",
    "Headache",
    "Bloating",
    "Mood swings",
    "Acne",
    "Back pain",
    "Breast tenderness",
];

const CYCLE_LENGTH_RANGE: std::ops::RangeInclusive<u32> = 15..=60;
const BLEED_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=14;

/// In-progress onboarding answers.
#[derive(Debug, Clone, Default)]
pub struct OnboardingQuiz {
    pub last_period_start: Option<NaiveDate>,
    pub cycle_length: Option<u32>,
    pub menstruation_phase_duration: Option<u32>,
    pub symptoms: MultiSelect,
    pub medication: String,
    pub workout_intensity: Option<WorkoutIntensity>,
}

/// Body of "submit onboarding profile" (without the user id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingPayload {
    pub last_period_start: NaiveDate,
    pub cycle_length: u32,
    pub menstruation_phase_duration: u32,
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,
    pub workout_intensity: WorkoutIntensity,
}

fn incomplete(step: usize, field: &str) -> FlowError {
    FlowError::ValidationIncomplete {
        step,
        field: field.to_string(),
    }
}

impl WizardForm for OnboardingQuiz {
    type Payload = OnboardingPayload;
    const STEPS: usize = 6;

    fn step_title(&self, step: usize) -> &'static str {
        match step {
            1 => "When did your last period start?",
            2 => "How long is your cycle on average?",
            3 => "How many days does your period usually last?",
            4 => "Which symptoms do you usually notice?",
            5 => "Do you take any medication?",
            6 => "How intense do you like your workouts?",
            _ => "",
        }
    }

    fn missing_field(&self, step: usize) -> Option<&'static str> {
        match step {
            1 if self.last_period_start.is_none() => Some("last period start"),
            2 if !self
                .cycle_length
                .is_some_and(|n| CYCLE_LENGTH_RANGE.contains(&n)) =>
            {
                Some("cycle length (15-60 days)")
            }
            3 if !self
                .menstruation_phase_duration
                .is_some_and(|n| BLEED_DAYS_RANGE.contains(&n)) =>
            {
                Some("period length (1-14 days)")
            }
            6 if self.workout_intensity.is_none() => Some("workout intensity"),
            _ => None,
        }
    }

    fn assemble(&self) -> Result<OnboardingPayload, FlowError> {
        let medication = self.medication.trim();
        Ok(OnboardingPayload {
            last_period_start: self
                .last_period_start
                .ok_or_else(|| incomplete(1, "last period start"))?,
            cycle_length: self.cycle_length.ok_or_else(|| incomplete(2, "cycle length"))?,
            menstruation_phase_duration: self
                .menstruation_phase_duration
                .ok_or_else(|| incomplete(3, "period length"))?,
            symptoms: self.symptoms.iter().map(str::to_string).collect(),
            medication: (!medication.is_empty()).then(|| medication.to_string()),
            workout_intensity: self
                .workout_intensity
                .ok_or_else(|| incomplete(6, "workout intensity"))?,
        })
    }
}
