//! Backend operations consumed by the client.
//!
//! `PlannerApi` is the seam every screen talks through; `HttpPlannerApi`
//! is the production implementation, tests substitute scripted mocks.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::suggestions::Suggestion;
use crate::wizard::{OnboardingPayload, WeeklyCheckIn};

pub use http::HttpPlannerApi;
pub use types::{
    CreatedEvent, CycleEnergy, CycleProfile, CycleSummary, EventMove, LoginProfile,
    MonthlyCheckIn, NewEvent, PhaseTips, PlanCategory, PlanSuggestion, PlanTask, RegisteredUser,
};

/// Remote operations of the scheduling backend.
#[async_trait]
pub trait PlannerApi: Send + Sync {
    async fn register(&self, email: &str) -> Result<RegisteredUser, ApiError>;

    async fn login(&self, email: &str) -> Result<LoginProfile, ApiError>;

    /// Returns the backend's normalized cycle fields.
    async fn submit_onboarding(
        &self,
        user_id: &str,
        payload: &OnboardingPayload,
    ) -> Result<CycleProfile, ApiError>;

    async fn submit_weekly_checkin(
        &self,
        user_id: &str,
        answers: &WeeklyCheckIn,
    ) -> Result<(), ApiError>;

    async fn submit_monthly_checkin(
        &self,
        user_id: &str,
        answers: &MonthlyCheckIn,
    ) -> Result<(), ApiError>;

    async fn cycle_summary(&self, user_id: &str) -> Result<CycleSummary, ApiError>;

    async fn evaluate_plan(&self, user_id: &str, task: &PlanTask)
    -> Result<PlanSuggestion, ApiError>;

    /// Ask the agent for a fresh batch of suggestions.
    async fn weekly_reorg(&self, user_id: &str) -> Result<Vec<Suggestion>, ApiError>;

    async fn move_event(&self, user_id: &str, change: &EventMove) -> Result<(), ApiError>;

    async fn create_event(&self, user_id: &str, event: &NewEvent)
    -> Result<CreatedEvent, ApiError>;

    /// URL to send the user to for the external calendar consent.
    async fn calendar_auth_url(&self, user_id: &str) -> Result<String, ApiError>;
}
