//! Navigation controller: one handler per screen, all session writes
//! funneled through the profile accumulator.

use tracing::{debug, info};

use crate::error::FlowError;
use crate::profile::{MergePath, PartialProfile, accumulator};

use super::screen::Screen;
use super::session::Session;

/// Events emitted by screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    FirstTime,
    Returning,
    Registered(PartialProfile),
    LoggedIn {
        profile: PartialProfile,
        monthly_check_in_due: bool,
    },
    ChooseQuiz,
    ChooseFloUpload,
    OnboardingSubmitted(PartialProfile),
    FloImported {
        profile_id: String,
        profile: PartialProfile,
    },
    MonthlyCheckInDone,
    MonthlyCheckInSkipped,
    OpenWeeklyCheckIn,
    WeeklyCheckInDone,
    OpenPlanEvent,
    PlanEventDone,
    Back,
}

impl NavEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstTime => "first_time",
            Self::Returning => "returning",
            Self::Registered(_) => "registered",
            Self::LoggedIn { .. } => "logged_in",
            Self::ChooseQuiz => "choose_quiz",
            Self::ChooseFloUpload => "choose_flo_upload",
            Self::OnboardingSubmitted(_) => "onboarding_submitted",
            Self::FloImported { .. } => "flo_imported",
            Self::MonthlyCheckInDone => "monthly_check_in_done",
            Self::MonthlyCheckInSkipped => "monthly_check_in_skipped",
            Self::OpenWeeklyCheckIn => "open_weekly_check_in",
            Self::WeeklyCheckInDone => "weekly_check_in_done",
            Self::OpenPlanEvent => "open_plan_event",
            Self::PlanEventDone => "plan_event_done",
            Self::Back => "back",
        }
    }
}

/// Outcome of one handled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Screen,
    pub to: Screen,
    /// Whether the user profile changed (callers persist the snapshot).
    pub profile_changed: bool,
}

/// What a handler decided: the next screen and the profile write it is
/// permitted to make.
struct Step {
    to: Screen,
    write: Option<(MergePath, PartialProfile)>,
    needs_identity: bool,
}

impl Step {
    fn to(to: Screen) -> Self {
        Self {
            to,
            write: None,
            needs_identity: false,
        }
    }

    fn writing(to: Screen, path: MergePath, patch: PartialProfile) -> Self {
        Self {
            to,
            write: Some((path, patch)),
            needs_identity: false,
        }
    }

    fn with_identity(mut self) -> Self {
        self.needs_identity = true;
        self
    }
}

/// Finite state machine over [`Screen`]s, owning the [`Session`].
#[derive(Debug, Default)]
pub struct NavigationController {
    session: Session,
}

impl NavigationController {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current(&self) -> Screen {
        self.session.current_screen
    }

    /// Force the calendar-connected side-channel transition.
    pub fn mark_calendar_connected(&mut self) -> bool {
        self.session.mark_calendar_connected()
    }

    /// Handle one event. On error the session is left unchanged.
    pub fn handle(&mut self, event: NavEvent) -> Result<Transition, FlowError> {
        let from = self.session.current_screen;
        let event_name = event.name();

        let step = if event == NavEvent::Back {
            self.back_step(from)
        } else {
            match from {
                Screen::Intro => Self::on_intro(event),
                Screen::Register => Self::on_register(event),
                Screen::Login => Self::on_login(event),
                Screen::OnboardingChoice => Self::on_onboarding_choice(event),
                Screen::OnboardingQuiz => Self::on_onboarding_quiz(event),
                Screen::FloUpload => Self::on_flo_upload(event),
                Screen::MonthlyQuiz => Self::on_monthly_quiz(event),
                Screen::Dashboard => Self::on_dashboard(event),
                Screen::WeeklyQuiz => Self::on_weekly_quiz(event),
                Screen::PlanEvent => Self::on_plan_event(event),
            }
            .filter(|step| from.can_transition_to(step.to))
        };

        let step = step.ok_or_else(|| FlowError::InvalidTransition {
            from: from.to_string(),
            event: event_name.to_string(),
        })?;

        if step.needs_identity && self.session.user_id().is_none() {
            return Err(FlowError::MissingIdentity);
        }

        let mut profile_changed = false;
        if let Some((path, patch)) = step.write {
            let merged = accumulator::apply(&path, self.session.user.as_ref(), &patch)?;
            profile_changed = self.session.user.as_ref() != Some(&merged);
            self.session.user = Some(merged);
        }

        self.session.current_screen = step.to;

        if from == step.to {
            debug!(screen = %from, event = event_name, "Event handled without screen change");
        } else {
            info!(from = %from, to = %step.to, event = event_name, "Screen transition");
        }

        Ok(Transition {
            from,
            to: step.to,
            profile_changed,
        })
    }

    /// Back uses the screen's own target, except that a dashboard without
    /// a user (reached through the calendar redirect) falls back to intro.
    fn back_step(&self, from: Screen) -> Option<Step> {
        if from == Screen::Dashboard && self.session.user_id().is_none() {
            return Some(Step::to(Screen::Intro));
        }
        from.back_target().map(Step::to)
    }

    // ── Handlers ────────────────────────────────────────────────────

    fn on_intro(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::FirstTime => Some(Step::to(Screen::Register)),
            NavEvent::Returning => Some(Step::to(Screen::Login)),
            _ => None,
        }
    }

    fn on_register(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::Registered(identity) => Some(Step::writing(
                Screen::OnboardingChoice,
                MergePath::Identity,
                identity,
            )),
            _ => None,
        }
    }

    fn on_login(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::LoggedIn {
                profile,
                monthly_check_in_due,
            } => {
                let to = if monthly_check_in_due {
                    Screen::MonthlyQuiz
                } else {
                    Screen::Dashboard
                };
                Some(Step::writing(to, MergePath::Identity, profile))
            }
            _ => None,
        }
    }

    fn on_onboarding_choice(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::ChooseQuiz => Some(Step::to(Screen::OnboardingQuiz)),
            NavEvent::ChooseFloUpload => Some(Step::to(Screen::FloUpload)),
            _ => None,
        }
    }

    fn on_onboarding_quiz(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::OnboardingSubmitted(cycle) => Some(Step::writing(
                Screen::Dashboard,
                MergePath::CycleUpdate,
                cycle,
            )),
            _ => None,
        }
    }

    fn on_flo_upload(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::FloImported {
                profile_id,
                profile,
            } => Some(Step::writing(
                Screen::Dashboard,
                MergePath::FloImport { profile_id },
                profile,
            )),
            _ => None,
        }
    }

    fn on_monthly_quiz(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::MonthlyCheckInDone => Some(Step::to(Screen::Dashboard).with_identity()),
            NavEvent::MonthlyCheckInSkipped => Some(Step::to(Screen::Dashboard)),
            _ => None,
        }
    }

    fn on_dashboard(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::OpenWeeklyCheckIn => Some(Step::to(Screen::WeeklyQuiz)),
            NavEvent::OpenPlanEvent => Some(Step::to(Screen::PlanEvent)),
            _ => None,
        }
    }

    fn on_weekly_quiz(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::WeeklyCheckInDone => Some(Step::to(Screen::Dashboard).with_identity()),
            _ => None,
        }
    }

    fn on_plan_event(event: NavEvent) -> Option<Step> {
        match event {
            NavEvent::PlanEventDone => Some(Step::to(Screen::Dashboard)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::profile::WorkoutIntensity;

    fn at(screen: Screen) -> NavigationController {
        NavigationController::new(Session {
            current_screen: screen,
            ..Default::default()
        })
    }

    fn registered_at(screen: Screen) -> NavigationController {
        let mut nav = at(Screen::Register);
        nav.handle(NavEvent::Registered(PartialProfile::identity("u1", "ana@example.com")))
            .unwrap();
        nav.session.current_screen = screen;
        nav
    }

    fn quiz_patch() -> PartialProfile {
        PartialProfile {
            last_period_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            cycle_length: Some(28),
            menstruation_phase_duration: Some(5),
            symptoms: Some(BTreeSet::from(["Cramps".to_string(), "Fatigue".to_string()])),
            medication: Some("ibuprofen".into()),
            workout_intensity: Some(WorkoutIntensity::Medium),
            ..Default::default()
        }
    }

    #[test]
    fn first_time_flow_reaches_dashboard() {
        let mut nav = NavigationController::default();
        assert_eq!(nav.current(), Screen::Intro);

        nav.handle(NavEvent::FirstTime).unwrap();
        let t = nav
            .handle(NavEvent::Registered(
                PartialProfile::identity("u1", "ana@example.com").with_username("Ana"),
            ))
            .unwrap();
        assert_eq!(t.to, Screen::OnboardingChoice);
        assert!(t.profile_changed);

        nav.handle(NavEvent::ChooseQuiz).unwrap();
        let t = nav.handle(NavEvent::OnboardingSubmitted(quiz_patch())).unwrap();
        assert_eq!(t.to, Screen::Dashboard);
        assert!(t.profile_changed);

        let user = nav.session().user().unwrap();
        assert_eq!(user.user_id.as_deref(), Some("u1"));
        assert_eq!(user.last_period_start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(user.cycle_length, Some(28));
        assert_eq!(user.menstruation_phase_duration, Some(5));
        assert_eq!(user.symptoms.len(), 2);
        assert_eq!(user.medication.as_deref(), Some("ibuprofen"));
        assert_eq!(user.workout_intensity, Some(WorkoutIntensity::Medium));
    }

    #[test]
    fn login_routes_on_monthly_check_in() {
        let mut nav = at(Screen::Login);
        let t = nav
            .handle(NavEvent::LoggedIn {
                profile: PartialProfile::identity("u2", "b@example.com"),
                monthly_check_in_due: true,
            })
            .unwrap();
        assert_eq!(t.to, Screen::MonthlyQuiz);
        nav.handle(NavEvent::MonthlyCheckInSkipped).unwrap();
        assert_eq!(nav.current(), Screen::Dashboard);

        let mut nav = at(Screen::Login);
        nav.handle(NavEvent::LoggedIn {
            profile: PartialProfile::identity("u2", "b@example.com"),
            monthly_check_in_due: false,
        })
        .unwrap();
        assert_eq!(nav.current(), Screen::Dashboard);
    }

    #[test]
    fn back_uses_explicit_targets() {
        for screen in Screen::ALL {
            let mut nav = registered_at(screen);
            match screen.back_target() {
                Some(target) => {
                    let t = nav.handle(NavEvent::Back).unwrap();
                    assert_eq!(t.to, target, "back from {screen}");
                    assert!(!t.profile_changed);
                }
                None => assert!(nav.handle(NavEvent::Back).is_err()),
            }
        }
    }

    #[test]
    fn back_from_dashboard_without_user_returns_to_intro() {
        let mut nav = at(Screen::Register);
        nav.session.mark_calendar_connected();
        assert_eq!(nav.current(), Screen::Dashboard);

        let t = nav.handle(NavEvent::Back).unwrap();
        assert_eq!((t.from, t.to), (Screen::Dashboard, Screen::Intro));
        assert!(nav.session().calendar_connected());

        nav.handle(NavEvent::Returning).unwrap();
        assert_eq!(nav.current(), Screen::Login);
    }

    #[test]
    fn unexpected_event_is_rejected_without_change() {
        let mut nav = at(Screen::Intro);
        let err = nav.handle(NavEvent::OpenPlanEvent).unwrap_err();
        assert!(matches!(err, FlowError::InvalidTransition { .. }));
        assert_eq!(nav.current(), Screen::Intro);

        let mut nav = at(Screen::Dashboard);
        assert!(nav.handle(NavEvent::ChooseQuiz).is_err());
        assert_eq!(nav.current(), Screen::Dashboard);
    }

    #[test]
    fn quiz_without_identity_fails_and_stays() {
        let mut nav = at(Screen::OnboardingQuiz);
        let err = nav.handle(NavEvent::OnboardingSubmitted(quiz_patch())).unwrap_err();
        assert_eq!(err, FlowError::MissingIdentity);
        assert_eq!(nav.current(), Screen::OnboardingQuiz);
        assert!(nav.session().user().is_none());
    }

    #[test]
    fn check_ins_require_identity() {
        let mut nav = at(Screen::WeeklyQuiz);
        assert_eq!(
            nav.handle(NavEvent::WeeklyCheckInDone).unwrap_err(),
            FlowError::MissingIdentity
        );

        let mut nav = registered_at(Screen::WeeklyQuiz);
        assert_eq!(nav.handle(NavEvent::WeeklyCheckInDone).unwrap().to, Screen::Dashboard);

        let mut nav = registered_at(Screen::MonthlyQuiz);
        assert_eq!(nav.handle(NavEvent::MonthlyCheckInDone).unwrap().to, Screen::Dashboard);
    }

    #[test]
    fn flo_import_creates_profile() {
        let mut nav = at(Screen::FloUpload);
        let t = nav
            .handle(NavEvent::FloImported {
                profile_id: "flo-1".into(),
                profile: PartialProfile {
                    cycle_length: Some(30),
                    ..Default::default()
                },
            })
            .unwrap();
        assert_eq!(t.to, Screen::Dashboard);
        let user = nav.session().user().unwrap();
        assert!(user.user_id.is_none());
        assert_eq!(user.profile_id.as_deref(), Some("flo-1"));
    }

    #[test]
    fn dashboard_round_trips() {
        let mut nav = registered_at(Screen::Dashboard);
        nav.handle(NavEvent::OpenPlanEvent).unwrap();
        nav.handle(NavEvent::PlanEventDone).unwrap();
        nav.handle(NavEvent::OpenWeeklyCheckIn).unwrap();
        nav.handle(NavEvent::Back).unwrap();
        assert_eq!(nav.current(), Screen::Dashboard);
        let t = nav.handle(NavEvent::Back).unwrap();
        assert_eq!((t.from, t.to), (Screen::Dashboard, Screen::Dashboard));
    }

    #[test]
    fn unchanged_profile_is_not_reported() {
        let mut nav = at(Screen::Login);
        nav.handle(NavEvent::LoggedIn {
            profile: PartialProfile::identity("u2", "b@example.com"),
            monthly_check_in_due: false,
        })
        .unwrap();
        nav.session.current_screen = Screen::Login;
        let t = nav
            .handle(NavEvent::LoggedIn {
                profile: PartialProfile::identity("u2", "b@example.com"),
                monthly_check_in_due: false,
            })
            .unwrap();
        assert!(!t.profile_changed);
    }
}
