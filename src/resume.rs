//! Redirect resumption: rebuilds the session at startup.
//!
//! Runs once before the first screen: restores the persisted user, then
//! inspects the entry URL for the calendar redirect marker. Also owns the
//! write-through of the session snapshot.

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::{DatabaseError, FlowError};
use crate::navigation::{Screen, Session, SessionSnapshot};
use crate::profile::UserProfile;
use crate::store::{Database, settings_keys};

/// Query parameter set by the backend after the calendar OAuth round-trip.
pub const CONNECTED_PARAM: &str = "connected";

/// Read the persisted snapshot. A malformed snapshot is logged, deleted and
/// treated as absent.
pub async fn load_snapshot(store: &dyn Database) -> Option<SessionSnapshot> {
    let raw = match store
        .get_setting(settings_keys::LOCAL_SCOPE, settings_keys::SESSION)
        .await
    {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(DatabaseError::Serialization(reason)) => {
            discard_snapshot(store, FlowError::MalformedPersistedState(reason)).await;
            return None;
        }
        Err(e) => {
            warn!(error = %e, "Could not read session snapshot, starting fresh");
            return None;
        }
    };

    match serde_json::from_value::<SessionSnapshot>(raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            discard_snapshot(store, FlowError::MalformedPersistedState(e.to_string())).await;
            None
        }
    }
}

async fn discard_snapshot(store: &dyn Database, error: FlowError) {
    warn!(error = %error, "Discarding session snapshot");
    if let Err(e) = store
        .delete_setting(settings_keys::LOCAL_SCOPE, settings_keys::SESSION)
        .await
    {
        warn!(error = %e, "Failed to delete malformed session snapshot");
    }
}

/// Persist the session snapshot. No-op while there is no user.
pub async fn persist_snapshot(store: &dyn Database, session: &Session) -> Result<(), DatabaseError> {
    let Some(snapshot) = session.snapshot() else {
        return Ok(());
    };
    let value = serde_json::to_value(&snapshot)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    store
        .set_setting(settings_keys::LOCAL_SCOPE, settings_keys::SESSION, &value)
        .await?;
    debug!("Session snapshot persisted");
    Ok(())
}

/// Whether the URL carries `connected=1`. Accepts absolute URLs and bare
/// query strings such as `/?connected=1`.
pub fn has_connected_marker(url: &str) -> bool {
    let parsed = Url::parse(url).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(url))
    });
    match parsed {
        Ok(url) => url
            .query_pairs()
            .any(|(key, value)| key == CONNECTED_PARAM && value == "1"),
        Err(e) => {
            debug!(error = %e, "Entry URL not parseable, ignoring");
            false
        }
    }
}

/// Apply the calendar redirect marker, if present. Forces the dashboard and
/// marks the calendar connected; applying it again changes nothing.
pub fn apply_redirect(session: &mut Session, url: Option<&str>) -> bool {
    match url {
        Some(url) if has_connected_marker(url) => {
            if session.mark_calendar_connected() {
                info!("Calendar connected via redirect");
            }
            true
        }
        _ => false,
    }
}

/// Screen to start on for a restored user, absent any redirect.
pub fn initial_screen(user: Option<&UserProfile>) -> Screen {
    match user {
        Some(u) if u.has_identity() && u.has_cycle_data() => Screen::Dashboard,
        Some(u) if u.has_identity() => Screen::OnboardingChoice,
        _ => Screen::Intro,
    }
}

/// Build the startup session from the persisted snapshot and the entry URL.
pub async fn resume_session(store: &dyn Database, start_url: Option<&str>) -> Session {
    let user = load_snapshot(store).await.map(|s| s.user);
    let mut session = Session {
        current_screen: initial_screen(user.as_ref()),
        user,
        calendar_connected: false,
    };

    if session.user.is_some() {
        info!(screen = %session.current_screen, "Session restored from snapshot");
    }

    apply_redirect(&mut session, start_url);
    session
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::store::LibSqlBackend;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn onboarded() -> UserProfile {
        UserProfile {
            user_id: Some("u1".into()),
            email: Some("ana@example.com".into()),
            last_period_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            cycle_length: Some(28),
            ..Default::default()
        }
    }

    #[test]
    fn marker_detection() {
        assert!(has_connected_marker("http://localhost:5173/?connected=1"));
        assert!(has_connected_marker("http://localhost:5173/?foo=bar&connected=1"));
        assert!(has_connected_marker("/?connected=1"));
        assert!(!has_connected_marker("http://localhost:5173/?connected=0"));
        assert!(!has_connected_marker("http://localhost:5173/"));
        assert!(!has_connected_marker("http://localhost:5173/?connected=true"));
    }

    #[test]
    fn redirect_is_idempotent() {
        let mut once = Session::default();
        apply_redirect(&mut once, Some("/?connected=1"));

        let mut twice = Session::default();
        apply_redirect(&mut twice, Some("/?connected=1"));
        apply_redirect(&mut twice, Some("/?connected=1"));

        assert_eq!(once, twice);
        assert!(once.calendar_connected());
        assert_eq!(once.current_screen(), Screen::Dashboard);
    }

    #[test]
    fn redirect_overrides_any_screen() {
        let mut session = Session {
            current_screen: Screen::Login,
            ..Default::default()
        };
        assert!(apply_redirect(&mut session, Some("/?connected=1")));
        assert_eq!(session.current_screen(), Screen::Dashboard);

        let mut session = Session::default();
        assert!(!apply_redirect(&mut session, Some("/?other=1")));
        assert!(!apply_redirect(&mut session, None));
        assert_eq!(session, Session::default());
    }

    #[test]
    fn initial_screen_selection() {
        assert_eq!(initial_screen(None), Screen::Intro);
        assert_eq!(initial_screen(Some(&UserProfile::default())), Screen::Intro);
        let registered = UserProfile {
            user_id: Some("u1".into()),
            ..Default::default()
        };
        assert_eq!(initial_screen(Some(&registered)), Screen::OnboardingChoice);
        assert_eq!(initial_screen(Some(&onboarded())), Screen::Dashboard);
    }

    #[tokio::test]
    async fn persist_then_resume() {
        let db = test_db().await;
        let session = Session {
            current_screen: Screen::Dashboard,
            user: Some(onboarded()),
            calendar_connected: true,
        };
        persist_snapshot(&db, &session).await.unwrap();

        let resumed = resume_session(&db, None).await;
        assert_eq!(resumed.user(), Some(&onboarded()));
        assert_eq!(resumed.current_screen(), Screen::Dashboard);
        // Calendar connection is recomputed per start.
        assert!(!resumed.calendar_connected());
    }

    #[tokio::test]
    async fn persist_without_user_writes_nothing() {
        let db = test_db().await;
        persist_snapshot(&db, &Session::default()).await.unwrap();
        assert!(db.get_setting("local", "session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_discarded() {
        let db = test_db().await;
        db.set_raw("local", "session", "{definitely not json").await;

        let session = resume_session(&db, None).await;
        assert_eq!(session, Session::default());
        assert!(db.get_setting("local", "session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_shape_is_discarded() {
        let db = test_db().await;
        db.set_setting("local", "session", &serde_json::json!({"user": 42}))
            .await
            .unwrap();

        let session = resume_session(&db, Some("/?connected=1")).await;
        assert!(session.user().is_none());
        assert!(session.calendar_connected());
        assert_eq!(session.current_screen(), Screen::Dashboard);
    }
}
