//! Scripted in-memory backend for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::ApiError;
use crate::suggestions::Suggestion;
use crate::wizard::{OnboardingPayload, WeeklyCheckIn};

use super::PlannerApi;
use super::types::*;

/// Holds `move_event` until released. `entered` fires once the call is
/// inside the backend.
#[derive(Clone, Default)]
pub(crate) struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub(crate) struct MockApi {
    /// Operation names in call order.
    pub calls: Mutex<Vec<String>>,
    pub login_profile: Mutex<Option<LoginProfile>>,
    pub reorg: Mutex<VecDeque<Result<Vec<Suggestion>, ApiError>>>,
    pub plan: Mutex<Option<PlanSuggestion>>,
    pub moves: Mutex<Vec<EventMove>>,
    pub created: Mutex<Vec<NewEvent>>,
    pub onboarding: Mutex<Vec<(String, OnboardingPayload)>>,
    pub weekly: Mutex<Vec<WeeklyCheckIn>>,
    pub monthly: Mutex<Vec<MonthlyCheckIn>>,
    pub move_gate: Option<Gate>,
    pub fail_moves: AtomicBool,
    /// Every call fails with a network error while set.
    pub offline: AtomicBool,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated(gate: Gate) -> Arc<Self> {
        Arc::new(Self {
            move_gate: Some(gate),
            ..Default::default()
        })
    }

    pub fn push_reorg(&self, result: Result<Vec<Suggestion>, ApiError>) {
        self.reorg.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| *c == operation).count()
    }

    fn record(&self, operation: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Network {
                operation: operation.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlannerApi for MockApi {
    async fn register(&self, email: &str) -> Result<RegisteredUser, ApiError> {
        self.record("register")?;
        Ok(RegisteredUser {
            user_id: "u1".into(),
            email: email.into(),
        })
    }

    async fn login(&self, email: &str) -> Result<LoginProfile, ApiError> {
        self.record("login")?;
        Ok(self.login_profile.lock().unwrap().clone().unwrap_or(LoginProfile {
            user_id: "u1".into(),
            email: email.into(),
            ..Default::default()
        }))
    }

    async fn submit_onboarding(
        &self,
        user_id: &str,
        payload: &OnboardingPayload,
    ) -> Result<CycleProfile, ApiError> {
        self.record("submit_onboarding")?;
        self.onboarding
            .lock()
            .unwrap()
            .push((user_id.to_string(), payload.clone()));
        Ok(CycleProfile {
            last_period_start: payload.last_period_start,
            cycle_length: payload.cycle_length,
            menstruation_phase_duration: Some(payload.menstruation_phase_duration),
            symptoms: Some(payload.symptoms.clone()),
            medication: payload.medication.clone(),
            workout_intensity: Some(payload.workout_intensity),
        })
    }

    async fn submit_weekly_checkin(
        &self,
        _user_id: &str,
        answers: &WeeklyCheckIn,
    ) -> Result<(), ApiError> {
        self.record("submit_weekly_checkin")?;
        self.weekly.lock().unwrap().push(*answers);
        Ok(())
    }

    async fn submit_monthly_checkin(
        &self,
        _user_id: &str,
        answers: &MonthlyCheckIn,
    ) -> Result<(), ApiError> {
        self.record("submit_monthly_checkin")?;
        self.monthly.lock().unwrap().push(*answers);
        Ok(())
    }

    async fn cycle_summary(&self, _user_id: &str) -> Result<CycleSummary, ApiError> {
        self.record("cycle_summary")?;
        Ok(CycleSummary {
            cycle_day: 3,
            phase: "menstrual".into(),
            phase_label: "Menstrual phase".into(),
            tips: PhaseTips {
                headline: "Take it easy".into(),
                do_list: vec!["Rest".into()],
                avoid: vec!["HIIT".into()],
            },
        })
    }

    async fn evaluate_plan(
        &self,
        _user_id: &str,
        task: &PlanTask,
    ) -> Result<PlanSuggestion, ApiError> {
        self.record("evaluate_plan")?;
        Ok(self.plan.lock().unwrap().clone().unwrap_or(PlanSuggestion {
            is_ideal: true,
            reason: "Fits well".into(),
            original_start: task.start_time,
            suggested_start: None,
            phase_at_original: Some("follicular".into()),
            suggested_phase: None,
        }))
    }

    async fn weekly_reorg(&self, _user_id: &str) -> Result<Vec<Suggestion>, ApiError> {
        self.record("weekly_reorg")?;
        self.reorg
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn move_event(&self, _user_id: &str, change: &EventMove) -> Result<(), ApiError> {
        self.record("move_event")?;
        if let Some(gate) = &self.move_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.moves.lock().unwrap().push(change.clone());
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected {
                operation: "move event".into(),
                status: 409,
                message: "Calendar conflict".into(),
            });
        }
        Ok(())
    }

    async fn create_event(&self, _user_id: &str, event: &NewEvent) -> Result<CreatedEvent, ApiError> {
        self.record("create_event")?;
        self.created.lock().unwrap().push(event.clone());
        Ok(CreatedEvent {
            event_id: "evt-1".into(),
        })
    }

    async fn calendar_auth_url(&self, user_id: &str) -> Result<String, ApiError> {
        self.record("calendar_auth_url")?;
        Ok(format!("https://accounts.example.com/o/oauth2/auth?user_id={user_id}"))
    }
}
