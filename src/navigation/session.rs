//! Session: the process-wide client state.

use serde::{Deserialize, Serialize};

use crate::profile::UserProfile;

use super::screen::Screen;

/// Client state from app start to app close.
///
/// Fields are only written by the navigation controller (through the
/// profile accumulator) and by redirect resumption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub(crate) current_screen: Screen,
    pub(crate) user: Option<UserProfile>,
    pub(crate) calendar_connected: bool,
}

impl Session {
    pub fn current_screen(&self) -> Screen {
        self.current_screen
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.user_id.as_deref())
    }

    pub fn calendar_connected(&self) -> bool {
        self.calendar_connected
    }

    /// Side-channel transition used only by the calendar redirect: marks the
    /// calendar connected and forces the dashboard. Returns whether anything
    /// changed.
    pub(crate) fn mark_calendar_connected(&mut self) -> bool {
        let changed = !self.calendar_connected || self.current_screen != Screen::Dashboard;
        self.calendar_connected = true;
        self.current_screen = Screen::Dashboard;
        changed
    }

    /// The persistable part of the session, if there is a user.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.user.as_ref().map(|user| SessionSnapshot { user: user.clone() })
    }
}

/// What is persisted under the `"session"` key. Calendar connection is not
/// part of it; it is recomputed on every start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user: UserProfile,
}
