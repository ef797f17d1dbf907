//! Screen enum: the states of the navigation machine.

use serde::{Deserialize, Serialize};

/// The named screens of the client flow.
///
/// Forward edges: Intro → {Register, Login}; Register → OnboardingChoice;
/// OnboardingChoice → {OnboardingQuiz, FloUpload}; OnboardingQuiz | FloUpload
/// → Dashboard; Login → {Dashboard, MonthlyQuiz}; MonthlyQuiz → Dashboard;
/// Dashboard ↔ WeeklyQuiz; Dashboard ↔ PlanEvent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Intro,
    Register,
    Login,
    OnboardingChoice,
    OnboardingQuiz,
    FloUpload,
    MonthlyQuiz,
    Dashboard,
    WeeklyQuiz,
    PlanEvent,
}

impl Screen {
    pub const ALL: [Screen; 10] = [
        Screen::Intro,
        Screen::Register,
        Screen::Login,
        Screen::OnboardingChoice,
        Screen::OnboardingQuiz,
        Screen::FloUpload,
        Screen::MonthlyQuiz,
        Screen::Dashboard,
        Screen::WeeklyQuiz,
        Screen::PlanEvent,
    ];

    /// Check if a forward transition from `self` to `target` is in the table.
    pub fn can_transition_to(&self, target: Screen) -> bool {
        use Screen::*;
        matches!(
            (self, target),
            (Intro, Register)
                | (Intro, Login)
                | (Register, OnboardingChoice)
                | (OnboardingChoice, OnboardingQuiz)
                | (OnboardingChoice, FloUpload)
                | (OnboardingQuiz, Dashboard)
                | (FloUpload, Dashboard)
                | (Login, Dashboard)
                | (Login, MonthlyQuiz)
                | (MonthlyQuiz, Dashboard)
                | (Dashboard, WeeklyQuiz)
                | (WeeklyQuiz, Dashboard)
                | (Dashboard, PlanEvent)
                | (PlanEvent, Dashboard)
        )
    }

    /// Where a back/cancel event leads. Each screen names its own
    /// predecessor; `Intro` has none, `Dashboard` stays put (the controller
    /// sends a dashboard without a user back to `Intro`).
    pub fn back_target(&self) -> Option<Screen> {
        use Screen::*;
        match self {
            Intro => None,
            Register => Some(Intro),
            Login => Some(Intro),
            OnboardingChoice => Some(Register),
            OnboardingQuiz => Some(OnboardingChoice),
            FloUpload => Some(OnboardingChoice),
            MonthlyQuiz => Some(Login),
            Dashboard => Some(Dashboard),
            WeeklyQuiz => Some(Dashboard),
            PlanEvent => Some(Dashboard),
        }
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::Intro
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Intro => "intro",
            Self::Register => "register",
            Self::Login => "login",
            Self::OnboardingChoice => "onboarding-choice",
            Self::OnboardingQuiz => "onboarding-quiz",
            Self::FloUpload => "flo-upload",
            Self::MonthlyQuiz => "monthly-quiz",
            Self::Dashboard => "dashboard",
            Self::WeeklyQuiz => "weekly-quiz",
            Self::PlanEvent => "plan-event",
        };
        write!(f, "{s}")
    }
}
