//! Request and response shapes of the backend operations.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::{PartialProfile, WorkoutIntensity};

/// Result of "register".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user_id: String,
    pub email: String,
}

/// Result of "login": identity plus whatever cycle data the backend has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProfile {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub last_period_start: Option<NaiveDate>,
    #[serde(default)]
    pub cycle_length: Option<u32>,
    #[serde(default)]
    pub menstruation_phase_duration: Option<u32>,
    #[serde(default)]
    pub workout_intensity: Option<WorkoutIntensity>,
    #[serde(default)]
    pub symptoms: Option<Vec<String>>,
    #[serde(default)]
    pub medication: Option<String>,
}

impl LoginProfile {
    pub fn into_patch(self) -> PartialProfile {
        PartialProfile {
            user_id: Some(self.user_id),
            email: Some(self.email),
            username: None,
            last_period_start: self.last_period_start,
            cycle_length: self.cycle_length,
            menstruation_phase_duration: self.menstruation_phase_duration,
            workout_intensity: self.workout_intensity,
            symptoms: self.symptoms.map(|s| s.into_iter().collect::<BTreeSet<_>>()),
            medication: self.medication,
        }
    }
}

/// Normalized cycle fields returned by "submit onboarding profile". These
/// are authoritative and overwrite whatever the client entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProfile {
    pub last_period_start: NaiveDate,
    pub cycle_length: u32,
    #[serde(default)]
    pub menstruation_phase_duration: Option<u32>,
    #[serde(default)]
    pub symptoms: Option<Vec<String>>,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub workout_intensity: Option<WorkoutIntensity>,
}

impl CycleProfile {
    pub fn into_patch(self) -> PartialProfile {
        PartialProfile {
            last_period_start: Some(self.last_period_start),
            cycle_length: Some(self.cycle_length),
            menstruation_phase_duration: self.menstruation_phase_duration,
            symptoms: self.symptoms.map(|s| s.into_iter().collect()),
            medication: self.medication,
            workout_intensity: self.workout_intensity,
            ..Default::default()
        }
    }
}

/// How the last cycle felt, asked by the monthly check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleEnergy {
    Stable,
    Mixed,
    Low,
    High,
}

impl std::str::FromStr for CycleEnergy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Self::Stable),
            "mixed" => Ok(Self::Mixed),
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown energy level: {}", s)),
        }
    }
}

/// Body of "submit monthly check-in" (without the user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCheckIn {
    pub last_month_energy: CycleEnergy,
}

/// Short advice for the current phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTips {
    pub headline: String,
    #[serde(default, rename = "do")]
    pub do_list: Vec<String>,
    #[serde(default)]
    pub avoid: Vec<String>,
}

/// Result of "get cycle summary".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_day: u32,
    pub phase: String,
    pub phase_label: String,
    #[serde(default)]
    pub tips: PhaseTips,
}

/// Category of a planned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    Work,
    Uni,
    Social,
    Sport,
}

impl Default for PlanCategory {
    fn default() -> Self {
        Self::Work
    }
}

impl std::fmt::Display for PlanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Uni => write!(f, "uni"),
            Self::Social => write!(f, "social"),
            Self::Sport => write!(f, "sport"),
        }
    }
}

impl std::str::FromStr for PlanCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Self::Work),
            "uni" | "study" => Ok(Self::Uni),
            "social" => Ok(Self::Social),
            "sport" | "workout" => Ok(Self::Sport),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// One task to evaluate against the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    pub title: String,
    pub category: PlanCategory,
    #[serde(rename = "start_iso", with = "crate::timestamp")]
    pub start_time: DateTime<Utc>,
    pub duration_hours: f64,
}

/// The backend's verdict on one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSuggestion {
    pub is_ideal: bool,
    pub reason: String,
    #[serde(rename = "original_start_iso", with = "crate::timestamp")]
    pub original_start: DateTime<Utc>,
    #[serde(
        rename = "suggested_start_iso",
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub suggested_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub phase_at_original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_phase: Option<String>,
}

/// Body of "move calendar event".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMove {
    pub event_id: String,
    #[serde(with = "crate::timestamp")]
    pub new_start: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub new_end: DateTime<Utc>,
}

/// Body of "create calendar event".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(rename = "start_iso", with = "crate::timestamp")]
    pub start: DateTime<Utc>,
    #[serde(rename = "end_iso", with = "crate::timestamp")]
    pub end: DateTime<Utc>,
    pub description: String,
}

/// Result of "create calendar event".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    #[serde(alias = "id")]
    pub event_id: String,
}
