//! Dashboard: cycle summary, calendar hand-off, and the suggestion engine.
//!
//! Each entry onto the dashboard starts a new visit. Operations remember the
//! visit they started in; if the user has left (or left and come back) by the
//! time the result arrives, the result is not written to dashboard state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::api::{CycleSummary, PlannerApi};
use crate::error::{ApiError, Error};
use crate::suggestions::{Suggestion, SuggestionEngine};

#[derive(Debug, Default)]
struct DashboardState {
    summary: Option<CycleSummary>,
    auth_url: Option<String>,
    notice: Option<String>,
}

pub struct Dashboard {
    api: Arc<dyn PlannerApi>,
    engine: Arc<SuggestionEngine>,
    visit: AtomicU64,
    active: AtomicBool,
    state: RwLock<DashboardState>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn PlannerApi>) -> Self {
        Self {
            engine: SuggestionEngine::new(api.clone()),
            api,
            visit: AtomicU64::new(0),
            active: AtomicBool::new(false),
            state: RwLock::new(DashboardState::default()),
        }
    }

    pub fn engine(&self) -> &Arc<SuggestionEngine> {
        &self.engine
    }

    /// Start a new visit.
    pub fn enter(&self) -> u64 {
        self.active.store(true, Ordering::SeqCst);
        let visit = self.visit.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(visit, "Dashboard entered");
        visit
    }

    pub fn leave(&self) {
        self.active.store(false, Ordering::SeqCst);
        debug!("Dashboard left");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn current_visit(&self) -> u64 {
        self.visit.load(Ordering::SeqCst)
    }

    fn is_current(&self, visit: u64) -> bool {
        self.is_active() && self.current_visit() == visit
    }

    pub async fn summary(&self) -> Option<CycleSummary> {
        self.state.read().await.summary.clone()
    }

    pub async fn auth_url(&self) -> Option<String> {
        self.state.read().await.auth_url.clone()
    }

    /// Last user-visible message.
    pub async fn notice(&self) -> Option<String> {
        self.state.read().await.notice.clone()
    }

    pub async fn clear_notice(&self) {
        self.state.write().await.notice = None;
    }

    /// Write to dashboard state only if `visit` is still the live one.
    async fn settle<F>(&self, visit: u64, operation: &str, write: F) -> bool
    where
        F: FnOnce(&mut DashboardState),
    {
        if !self.is_current(visit) {
            debug!(operation, visit, "Discarding stale dashboard result");
            return false;
        }
        write(&mut *self.state.write().await);
        true
    }

    pub async fn load_summary(&self, user_id: &str) -> Result<CycleSummary, ApiError> {
        let visit = self.current_visit();
        match self.api.cycle_summary(user_id).await {
            Ok(summary) => {
                info!(user_id = %user_id, cycle_day = summary.cycle_day, phase = %summary.phase, "Cycle summary loaded");
                let stored = summary.clone();
                self.settle(visit, "cycle summary", |s| s.summary = Some(stored))
                    .await;
                Ok(summary)
            }
            Err(e) => {
                let message = e.user_message();
                self.settle(visit, "cycle summary", |s| s.notice = Some(message))
                    .await;
                Err(e)
            }
        }
    }

    /// Ask the agent for a fresh batch of suggestions.
    pub async fn refresh_suggestions(&self, user_id: &str) -> Result<Vec<Suggestion>, ApiError> {
        let visit = self.current_visit();
        let result = self.engine.fetch(user_id).await;
        let notice = match &result {
            Ok(batch) if batch.is_empty() => Some("No changes suggested this week.".to_string()),
            Ok(_) => None,
            Err(e) => Some(e.user_message()),
        };
        self.settle(visit, "weekly reorg", |s| s.notice = notice).await;
        result
    }

    pub async fn apply_suggestion(&self, user_id: &str, suggestion: &Suggestion) -> Result<usize, Error> {
        let visit = self.current_visit();
        let result = self.engine.apply(user_id, suggestion).await;
        let notice = match &result {
            Ok(_) => format!("Moved \"{}\".", suggestion.event_title),
            Err(e) => e.user_message(),
        };
        self.settle(visit, "apply suggestion", |s| s.notice = Some(notice))
            .await;
        result
    }

    /// Request the external calendar consent URL. The return trip is handled
    /// by redirect resumption on the next start.
    pub async fn connect_calendar(&self, user_id: &str) -> Result<String, ApiError> {
        let visit = self.current_visit();
        match self.api.calendar_auth_url(user_id).await {
            Ok(url) => {
                info!(user_id = %user_id, "Calendar auth URL issued");
                let stored = url.clone();
                self.settle(visit, "calendar auth url", |s| s.auth_url = Some(stored))
                    .await;
                Ok(url)
            }
            Err(e) => {
                let message = e.user_message();
                self.settle(visit, "calendar auth url", |s| s.notice = Some(message))
                    .await;
                Err(e)
            }
        }
    }
}
