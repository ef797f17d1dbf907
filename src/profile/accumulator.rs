//! Profile accumulator: folds partial fragments into one record.
//!
//! All functions are pure: they take the current profile by reference and
//! return a new one, so a failed merge never touches the caller's copy.

use tracing::{info, warn};

use crate::error::FlowError;

use super::model::{PartialProfile, UserProfile};

/// Which merge contract a transition uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePath {
    /// Registration or login: may set identity.
    Identity,
    /// Onboarding quiz and check-ins: requires an existing `user_id`.
    CycleUpdate,
    /// Flo import: may create a profile keyed by the import's profile id.
    FloImport { profile_id: String },
}

/// Merge `patch` over `current`. Present fields overwrite, absent fields are
/// kept. `user_id` is set once and never overwritten afterwards.
pub fn merge(current: Option<&UserProfile>, patch: &PartialProfile) -> UserProfile {
    let mut profile = current.cloned().unwrap_or_default();

    match (&profile.user_id, &patch.user_id) {
        (None, Some(id)) => profile.user_id = Some(id.clone()),
        (Some(existing), Some(id)) if existing != id => {
            warn!(
                user_id = %existing,
                ignored = %id,
                "Ignoring attempt to overwrite user identity"
            );
        }
        _ => {}
    }

    if let Some(ref email) = patch.email {
        profile.email = Some(email.clone());
    }
    if let Some(ref username) = patch.username {
        profile.username = Some(username.clone());
    }
    if let Some(date) = patch.last_period_start {
        profile.last_period_start = Some(date);
    }
    if let Some(length) = patch.cycle_length {
        profile.cycle_length = Some(length);
    }
    if let Some(days) = patch.menstruation_phase_duration {
        profile.menstruation_phase_duration = Some(days);
    }
    if let Some(intensity) = patch.workout_intensity {
        profile.workout_intensity = Some(intensity);
    }
    if let Some(ref symptoms) = patch.symptoms {
        profile.symptoms = symptoms.clone();
    }
    if let Some(ref medication) = patch.medication {
        profile.medication = Some(medication.clone());
    }

    profile
}

/// Merge for registration and login. Another account signing in replaces
/// the profile wholesale; the same account merges as usual.
pub fn merge_identity(current: Option<&UserProfile>, patch: &PartialProfile) -> UserProfile {
    let existing = current.and_then(|p| p.user_id.as_deref());
    match (existing, patch.user_id.as_deref()) {
        (Some(old), Some(new)) if old != new => {
            info!(previous = %old, user_id = %new, "Switching to another account");
            merge(None, patch)
        }
        _ => merge(current, patch),
    }
}

/// Merge for steps that only run after registration or login.
pub fn merge_with_identity(
    current: Option<&UserProfile>,
    patch: &PartialProfile,
) -> Result<UserProfile, FlowError> {
    match current {
        Some(profile) if profile.user_id.is_some() => Ok(merge(current, patch)),
        _ => Err(FlowError::MissingIdentity),
    }
}

/// Merge a Flo import result. Creates the profile when none exists yet.
pub fn merge_flo_import(
    current: Option<&UserProfile>,
    profile_id: &str,
    patch: &PartialProfile,
) -> UserProfile {
    let mut profile = merge(current, patch);
    profile.profile_id = Some(profile_id.to_string());
    profile
}

/// Dispatch on the merge contract.
pub fn apply(
    path: &MergePath,
    current: Option<&UserProfile>,
    patch: &PartialProfile,
) -> Result<UserProfile, FlowError> {
    match path {
        MergePath::Identity => Ok(merge_identity(current, patch)),
        MergePath::CycleUpdate => merge_with_identity(current, patch),
        MergePath::FloImport { profile_id } => Ok(merge_flo_import(current, profile_id, patch)),
    }
}
