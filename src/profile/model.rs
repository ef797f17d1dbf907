//! User profile data model.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Preferred workout intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutIntensity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for WorkoutIntensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for WorkoutIntensity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown workout intensity: {}", s)),
        }
    }
}

/// Accumulated user record. Identity fields come from registration, login
/// or a Flo import; cycle fields are the backend's latest normalized values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Identity of a profile created by a Flo import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_period_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menstruation_phase_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_intensity: Option<WorkoutIntensity>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub symptoms: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,
}

impl UserProfile {
    /// Whether the profile carries any identity (user or imported profile).
    pub fn has_identity(&self) -> bool {
        self.user_id.is_some() || self.profile_id.is_some()
    }

    /// Whether the cycle data needed by the dashboard is present.
    pub fn has_cycle_data(&self) -> bool {
        self.last_period_start.is_some()
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.email.as_deref())
            .unwrap_or("there")
    }
}

/// A fragment of a profile produced by one step. Absent fields are left
/// untouched by a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialProfile {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub last_period_start: Option<NaiveDate>,
    pub cycle_length: Option<u32>,
    pub menstruation_phase_duration: Option<u32>,
    pub workout_intensity: Option<WorkoutIntensity>,
    pub symptoms: Option<BTreeSet<String>>,
    pub medication: Option<String>,
}

impl PartialProfile {
    /// Identity fragment from registration or login.
    pub fn identity(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        if !username.trim().is_empty() {
            self.username = Some(username.trim().to_string());
        }
        self
    }
}
