//! App: wires the navigation controller to the backend, the local store
//! and the dashboard.
//!
//! Every screen action goes through here: remote calls first, then the
//! resulting event is handed to the controller, and the session snapshot is
//! written through whenever the profile changed. Remote failures come back
//! as errors carrying a user-facing message; none of them end the process.

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{CreatedEvent, CycleEnergy, LoginProfile, MonthlyCheckIn, PlannerApi};
use crate::dashboard::Dashboard;
use crate::error::{Error, FlowError, Result};
use crate::navigation::{NavEvent, NavigationController, Screen, Session, Transition};
use crate::planning::{Evaluation, PlanEventForm, SlotChoice};
use crate::profile::PartialProfile;
use crate::resume;
use crate::store::Database;
use crate::suggestions::Suggestion;
use crate::wizard::{OnboardingPayload, WeeklyCheckIn};

/// Cycle length assumed when the backend has none.
pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

/// Whether a returning user should see the monthly check-in: always when
/// no period start is known, otherwise once a full cycle has passed.
pub fn monthly_check_in_due(profile: &LoginProfile, today: NaiveDate) -> bool {
    let Some(last) = profile.last_period_start else {
        return true;
    };
    let cycle_length = profile.cycle_length.unwrap_or(DEFAULT_CYCLE_LENGTH);
    (today - last).num_days() >= i64::from(cycle_length)
}

pub struct App {
    api: Arc<dyn PlannerApi>,
    store: Arc<dyn Database>,
    nav: Mutex<NavigationController>,
    dashboard: Dashboard,
}

impl App {
    /// Restore the session and honor the calendar redirect marker in
    /// `start_url`.
    pub async fn start(
        api: Arc<dyn PlannerApi>,
        store: Arc<dyn Database>,
        start_url: Option<&str>,
    ) -> Self {
        let session = resume::resume_session(store.as_ref(), start_url).await;
        let dashboard = Dashboard::new(api.clone());
        if session.current_screen() == Screen::Dashboard {
            dashboard.enter();
        }
        info!(screen = %session.current_screen(), "App started");
        Self {
            api,
            store,
            nav: Mutex::new(NavigationController::new(session)),
            dashboard,
        }
    }

    pub async fn session(&self) -> Session {
        self.nav.lock().await.session().clone()
    }

    pub async fn screen(&self) -> Screen {
        self.nav.lock().await.current()
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    async fn user_id(&self) -> Result<String> {
        self.nav
            .lock()
            .await
            .session()
            .user_id()
            .map(str::to_string)
            .ok_or_else(|| FlowError::MissingIdentity.into())
    }

    /// Fail before any remote call when the action does not belong to the
    /// current screen.
    async fn expect_screen(&self, screen: Screen, action: &str) -> Result<()> {
        let current = self.screen().await;
        if current != screen {
            return Err(FlowError::InvalidTransition {
                from: current.to_string(),
                event: action.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Hand one event to the controller and write the snapshot through if
    /// the profile changed.
    pub async fn dispatch(&self, event: NavEvent) -> Result<Transition> {
        let (transition, session) = {
            let mut nav = self.nav.lock().await;
            let transition = nav.handle(event)?;
            (transition, nav.session().clone())
        };

        if transition.profile_changed
            && let Err(e) = resume::persist_snapshot(self.store.as_ref(), &session).await
        {
            warn!(error = %e, "Failed to persist session snapshot");
        }

        match (transition.from == Screen::Dashboard, transition.to == Screen::Dashboard) {
            (false, true) => {
                self.dashboard.enter();
            }
            (true, false) => self.dashboard.leave(),
            _ => {}
        }

        Ok(transition)
    }

    pub async fn back(&self) -> Result<Transition> {
        self.dispatch(NavEvent::Back).await
    }

    // ── Intro ───────────────────────────────────────────────────────

    pub async fn first_time(&self) -> Result<Transition> {
        self.dispatch(NavEvent::FirstTime).await
    }

    pub async fn returning(&self) -> Result<Transition> {
        self.dispatch(NavEvent::Returning).await
    }

    // ── Register / login ────────────────────────────────────────────

    /// Register by email; the optional name is kept locally for greetings.
    pub async fn register(&self, email: &str, username: Option<&str>) -> Result<Transition> {
        self.expect_screen(Screen::Register, "register").await?;
        let email = required_email(email)?;
        let user = self.api.register(email).await?;
        let mut identity = PartialProfile::identity(user.user_id, user.email);
        if let Some(name) = username {
            identity = identity.with_username(name);
        }
        self.dispatch(NavEvent::Registered(identity)).await
    }

    pub async fn login(&self, email: &str) -> Result<Transition> {
        self.expect_screen(Screen::Login, "login").await?;
        let email = required_email(email)?;
        let profile = self.api.login(email).await?;
        let monthly_check_in_due = monthly_check_in_due(&profile, Utc::now().date_naive());
        self.dispatch(NavEvent::LoggedIn {
            profile: profile.into_patch(),
            monthly_check_in_due,
        })
        .await
    }

    // ── Onboarding ──────────────────────────────────────────────────

    pub async fn choose_quiz(&self) -> Result<Transition> {
        self.dispatch(NavEvent::ChooseQuiz).await
    }

    pub async fn choose_flo_upload(&self) -> Result<Transition> {
        self.dispatch(NavEvent::ChooseFloUpload).await
    }

    /// Submit the finished onboarding quiz. The backend's normalized answer
    /// is what ends up in the profile.
    pub async fn submit_onboarding(&self, payload: &OnboardingPayload) -> Result<Transition> {
        self.expect_screen(Screen::OnboardingQuiz, "onboarding_submitted")
            .await?;
        let user_id = self.user_id().await?;
        let cycle = self.api.submit_onboarding(&user_id, payload).await?;
        self.dispatch(NavEvent::OnboardingSubmitted(cycle.into_patch()))
            .await
    }

    /// Import a Flo export. The export is only checked locally; the profile
    /// id is derived from its file name.
    pub async fn import_flo(&self, export: &Path) -> Result<Transition> {
        self.expect_screen(Screen::FloUpload, "flo_imported").await?;
        let profile_id = flo_profile_id(export).await?;
        info!(profile_id = %profile_id, "Flo export accepted");
        self.dispatch(NavEvent::FloImported {
            profile_id,
            profile: PartialProfile::default(),
        })
        .await
    }

    // ── Check-ins ───────────────────────────────────────────────────

    pub async fn submit_monthly_checkin(&self, energy: CycleEnergy) -> Result<Transition> {
        self.expect_screen(Screen::MonthlyQuiz, "monthly_check_in_done")
            .await?;
        let user_id = self.user_id().await?;
        self.api
            .submit_monthly_checkin(
                &user_id,
                &MonthlyCheckIn {
                    last_month_energy: energy,
                },
            )
            .await?;
        self.dispatch(NavEvent::MonthlyCheckInDone).await
    }

    pub async fn skip_monthly_checkin(&self) -> Result<Transition> {
        self.dispatch(NavEvent::MonthlyCheckInSkipped).await
    }

    pub async fn open_weekly_checkin(&self) -> Result<Transition> {
        self.dispatch(NavEvent::OpenWeeklyCheckIn).await
    }

    pub async fn submit_weekly_checkin(&self, answers: &WeeklyCheckIn) -> Result<Transition> {
        self.expect_screen(Screen::WeeklyQuiz, "weekly_check_in_done")
            .await?;
        let user_id = self.user_id().await?;
        self.api.submit_weekly_checkin(&user_id, answers).await?;
        self.dispatch(NavEvent::WeeklyCheckInDone).await
    }

    // ── Dashboard ───────────────────────────────────────────────────

    pub async fn load_summary(&self) -> Result<()> {
        self.expect_screen(Screen::Dashboard, "load_summary").await?;
        let user_id = self.user_id().await?;
        self.dashboard.load_summary(&user_id).await?;
        Ok(())
    }

    pub async fn refresh_suggestions(&self) -> Result<Vec<Suggestion>> {
        self.expect_screen(Screen::Dashboard, "refresh_suggestions")
            .await?;
        let user_id = self.user_id().await?;
        Ok(self.dashboard.refresh_suggestions(&user_id).await?)
    }

    pub async fn apply_suggestion(&self, suggestion: &Suggestion) -> Result<usize> {
        self.expect_screen(Screen::Dashboard, "apply_suggestion")
            .await?;
        let user_id = self.user_id().await?;
        self.dashboard.apply_suggestion(&user_id, suggestion).await
    }

    pub async fn connect_calendar(&self) -> Result<String> {
        self.expect_screen(Screen::Dashboard, "connect_calendar")
            .await?;
        let user_id = self.user_id().await?;
        Ok(self.dashboard.connect_calendar(&user_id).await?)
    }

    // ── Plan event ──────────────────────────────────────────────────

    pub async fn open_plan_event(&self) -> Result<Transition> {
        self.dispatch(NavEvent::OpenPlanEvent).await
    }

    pub async fn evaluate_plan(&self, form: &PlanEventForm) -> Result<Evaluation> {
        self.expect_screen(Screen::PlanEvent, "evaluate_plan").await?;
        let task = form.to_task()?;
        let user_id = self.user_id().await?;
        let suggestion = self.api.evaluate_plan(&user_id, &task).await?;
        info!(
            title = %task.title,
            is_ideal = suggestion.is_ideal,
            "Plan evaluated"
        );
        Ok(Evaluation { task, suggestion })
    }

    /// Book the evaluated task at the chosen slot and return to the
    /// dashboard.
    pub async fn schedule_plan(
        &self,
        evaluation: &Evaluation,
        choice: SlotChoice,
    ) -> Result<(CreatedEvent, Transition)> {
        self.expect_screen(Screen::PlanEvent, "plan_event_done").await?;
        let event = evaluation.event_for(choice)?;
        let user_id = self.user_id().await?;
        let created = self.api.create_event(&user_id, &event).await?;
        info!(event_id = %created.event_id, start = %event.start, "Event created");
        let transition = self.dispatch(NavEvent::PlanEventDone).await?;
        Ok((created, transition))
    }
}

fn required_email(email: &str) -> std::result::Result<&str, FlowError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(FlowError::ValidationIncomplete {
            step: 1,
            field: "email".to_string(),
        });
    }
    Ok(email)
}

async fn flo_profile_id(export: &Path) -> std::result::Result<String, Error> {
    let missing = || FlowError::ValidationIncomplete {
        step: 1,
        field: "Flo export file (.json or .zip)".to_string(),
    };
    let is_export = export
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("zip"));
    if !is_export {
        return Err(missing().into());
    }
    match tokio::fs::metadata(export).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(missing().into()),
    }
    let stem = export
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(missing)?;
    Ok(format!("flo-{stem}"))
}
