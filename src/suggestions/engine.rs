//! Suggestion reconciliation: the dashboard's working set of agent
//! suggestions and their single-flight application.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::api::PlannerApi;
use crate::error::{ApiError, Error, FlowError};

use super::model::{Suggestion, SuggestionKey};

/// Proof that the holder is the one apply in flight. Dropping it releases
/// the gate, including when the apply future is abandoned.
pub struct ApplyToken {
    key: SuggestionKey,
    applying: Arc<AtomicBool>,
    _permit: OwnedMutexGuard<()>,
}

impl ApplyToken {
    pub fn key(&self) -> &SuggestionKey {
        &self.key
    }
}

impl Drop for ApplyToken {
    fn drop(&mut self) {
        self.applying.store(false, Ordering::SeqCst);
    }
}

/// Working set of suggestions for one session.
pub struct SuggestionEngine {
    api: Arc<dyn PlannerApi>,
    working_set: RwLock<Vec<Suggestion>>,
    gate: Arc<Mutex<()>>,
    applying: Arc<AtomicBool>,
}

impl SuggestionEngine {
    pub fn new(api: Arc<dyn PlannerApi>) -> Arc<Self> {
        Arc::new(Self {
            api,
            working_set: RwLock::new(Vec::new()),
            gate: Arc::new(Mutex::new(())),
            applying: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Snapshot of the current working set, in agent order.
    pub async fn suggestions(&self) -> Vec<Suggestion> {
        self.working_set.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.working_set.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.working_set.read().await.is_empty()
    }

    /// Whether an apply is outstanding.
    pub fn in_flight(&self) -> bool {
        self.applying.load(Ordering::SeqCst)
    }

    /// Whether `suggestion` may be applied right now. Everything is disabled
    /// while another apply is in flight.
    pub fn is_applicable(&self, suggestion: &Suggestion) -> bool {
        suggestion.is_applicable() && !self.in_flight()
    }

    /// Fetch a fresh batch from the agent and replace the working set with
    /// it. On failure the working set is left empty.
    pub async fn fetch(&self, user_id: &str) -> Result<Vec<Suggestion>, ApiError> {
        match self.api.weekly_reorg(user_id).await {
            Ok(batch) => {
                info!(user_id = %user_id, count = batch.len(), "Suggestions fetched");
                *self.working_set.write().await = batch.clone();
                Ok(batch)
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Suggestion fetch failed");
                self.working_set.write().await.clear();
                Err(match e {
                    ApiError::AgentUnavailable { .. } => e,
                    other => ApiError::AgentUnavailable {
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Take the apply gate for `key`, or fail if another apply holds it.
    pub fn try_acquire(&self, key: SuggestionKey) -> Result<ApplyToken, FlowError> {
        let permit = self.gate.clone().try_lock_owned().map_err(|_| {
            debug!(event_id = %key.event_id, "Apply rejected, another apply in flight");
            FlowError::ApplyInFlight
        })?;
        self.applying.store(true, Ordering::SeqCst);
        Ok(ApplyToken {
            key,
            applying: self.applying.clone(),
            _permit: permit,
        })
    }

    /// Apply one suggestion as a calendar move.
    ///
    /// The move is sent for the given object even if the working set was
    /// replaced meanwhile. On success every entry with the same key is removed
    /// from whatever working set is current; returns how many were removed
    /// (zero is fine). On failure the working set is untouched and nothing is
    /// retried.
    pub async fn apply(&self, user_id: &str, suggestion: &Suggestion) -> Result<usize, Error> {
        let change = suggestion.to_move()?;
        let token = self.try_acquire(suggestion.key())?;

        info!(
            event_id = %change.event_id,
            new_start = %change.new_start,
            new_end = %change.new_end,
            "Applying suggestion"
        );

        if let Err(e) = self.api.move_event(user_id, &change).await {
            warn!(key = %token.key(), error = %e, "Suggestion apply failed");
            return Err(e.into());
        }

        let removed = {
            let mut set = self.working_set.write().await;
            let before = set.len();
            set.retain(|s| s.key() != *token.key());
            before - set.len()
        };

        info!(key = %token.key(), removed, "Suggestion applied");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::api::mock::{Gate, MockApi};
    use crate::suggestions::SuggestionAction;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, h, 0, 0).unwrap()
    }

    fn mv(id: &str, start: u32, end: Option<u32>) -> Suggestion {
        Suggestion {
            event_id: id.into(),
            event_title: format!("Event {id}"),
            action: SuggestionAction::Move,
            new_start: Some(ts(start)),
            new_end: end.map(ts),
            reason: "better phase".into(),
        }
    }

    fn keep(id: &str) -> Suggestion {
        Suggestion {
            event_id: id.into(),
            event_title: "Standup".into(),
            action: SuggestionAction::Keep,
            new_start: None,
            new_end: None,
            reason: "fine as is".into(),
        }
    }

    #[tokio::test]
    async fn fetch_replaces_working_set() {
        let api = MockApi::new();
        api.push_reorg(Ok(vec![mv("a", 9, None), mv("b", 10, None)]));
        api.push_reorg(Ok(vec![mv("c", 11, None)]));
        let engine = SuggestionEngine::new(api.clone());

        engine.fetch("u1").await.unwrap();
        assert_eq!(engine.len().await, 2);

        engine.fetch("u1").await.unwrap();
        let ids: Vec<_> = engine
            .suggestions()
            .await
            .into_iter()
            .map(|s| s.event_id)
            .collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test]
    async fn failed_fetch_empties_set_and_reports_unavailable() {
        let api = MockApi::new();
        api.push_reorg(Ok(vec![mv("a", 9, None)]));
        api.push_reorg(Err(ApiError::Network {
            operation: "weekly reorg".into(),
            reason: "connection reset".into(),
        }));
        let engine = SuggestionEngine::new(api.clone());

        engine.fetch("u1").await.unwrap();
        let err = engine.fetch("u1").await.unwrap_err();
        assert!(matches!(err, ApiError::AgentUnavailable { .. }));
        assert!(engine.is_empty().await);
    }

    #[tokio::test]
    async fn removal_matches_by_key_after_refresh() {
        let (a, b, c, d) = (
            mv("a", 9, Some(10)),
            mv("b", 10, None),
            mv("c", 11, Some(12)),
            mv("d", 13, None),
        );
        let api = MockApi::new();
        api.push_reorg(Ok(vec![a.clone(), b.clone(), c.clone()]));
        api.push_reorg(Ok(vec![b.clone(), c.clone(), d.clone()]));
        let engine = SuggestionEngine::new(api.clone());

        engine.fetch("u1").await.unwrap();
        let original_b = engine.suggestions().await[1].clone();
        engine.fetch("u1").await.unwrap();

        let removed = engine.apply("u1", &original_b).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(engine.suggestions().await, vec![c, d]);

        // The mutation was sent with the derived one-hour end.
        let moves = api.moves.lock().unwrap().clone();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].event_id, "b");
        assert_eq!(moves[0].new_end, ts(11));
    }

    #[tokio::test]
    async fn removes_every_duplicate_of_the_key() {
        let api = MockApi::new();
        api.push_reorg(Ok(vec![mv("a", 9, None), mv("a", 9, None), mv("a", 12, None)]));
        let engine = SuggestionEngine::new(api.clone());
        engine.fetch("u1").await.unwrap();

        let removed = engine.apply("u1", &mv("a", 9, None)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(engine.suggestions().await, vec![mv("a", 12, None)]);
    }

    #[tokio::test]
    async fn keep_is_rejected_without_call() {
        let api = MockApi::new();
        let engine = SuggestionEngine::new(api.clone());
        let err = engine.apply("u1", &keep("s")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Flow(FlowError::NotApplicable { .. })
        ));
        assert_eq!(api.call_count("move_event"), 0);
        assert!(!engine.is_applicable(&keep("s")));
    }

    #[tokio::test]
    async fn failed_apply_keeps_suggestion_and_does_not_retry() {
        let api = MockApi::new();
        api.push_reorg(Ok(vec![mv("a", 9, None)]));
        api.fail_moves.store(true, Ordering::SeqCst);
        let engine = SuggestionEngine::new(api.clone());
        engine.fetch("u1").await.unwrap();

        let target = engine.suggestions().await[0].clone();
        let err = engine.apply("u1", &target).await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Rejected { status: 409, .. })));
        assert_eq!(engine.len().await, 1);
        assert_eq!(api.call_count("move_event"), 1);
        assert!(!engine.in_flight());
    }

    #[tokio::test]
    async fn second_apply_is_rejected_while_one_is_in_flight() {
        let gate = Gate::default();
        let api = MockApi::gated(gate.clone());
        api.push_reorg(Ok(vec![mv("a", 9, None), mv("b", 10, None)]));
        let engine = SuggestionEngine::new(api.clone());
        engine.fetch("u1").await.unwrap();
        let set = engine.suggestions().await;

        let first = {
            let engine = engine.clone();
            let target = set[0].clone();
            tokio::spawn(async move { engine.apply("u1", &target).await })
        };
        gate.entered.notified().await;

        assert!(engine.in_flight());
        assert!(!engine.is_applicable(&set[1]));
        let err = engine.apply("u1", &set[1]).await.unwrap_err();
        assert!(matches!(err, Error::Flow(FlowError::ApplyInFlight)));
        // Rejected without side effects.
        assert_eq!(api.call_count("move_event"), 1);
        assert_eq!(engine.len().await, 2);

        gate.release.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), 1);
        assert!(!engine.in_flight());
        assert!(engine.is_applicable(&set[1]));
    }

    #[tokio::test]
    async fn fetch_during_apply_then_removal_hits_current_set() {
        let gate = Gate::default();
        let api = MockApi::gated(gate.clone());
        api.push_reorg(Ok(vec![mv("a", 9, None), mv("b", 10, None)]));
        api.push_reorg(Ok(vec![mv("x", 15, None)]));
        let engine = SuggestionEngine::new(api.clone());
        engine.fetch("u1").await.unwrap();
        let target = engine.suggestions().await[0].clone();

        let apply = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.apply("u1", &target).await })
        };
        gate.entered.notified().await;

        engine.fetch("u1").await.unwrap();
        gate.release.notify_one();

        // Key no longer present: removal is a no-op, not an error.
        assert_eq!(apply.await.unwrap().unwrap(), 0);
        assert_eq!(engine.suggestions().await, vec![mv("x", 15, None)]);
        assert_eq!(api.moves.lock().unwrap()[0].event_id, "a");
    }

    #[test]
    fn in_flight_follows_token_lifetime() {
        let engine = SuggestionEngine::new(MockApi::new());
        assert!(!engine.in_flight());

        let token = engine.try_acquire(mv("a", 9, None).key()).unwrap();
        assert!(engine.in_flight());
        // Checking the state never takes the gate itself.
        assert!(engine.in_flight());
        assert!(matches!(
            engine.try_acquire(mv("b", 10, None).key()),
            Err(FlowError::ApplyInFlight)
        ));

        drop(token);
        assert!(!engine.in_flight());
        let again = engine.try_acquire(mv("b", 10, None).key()).unwrap();
        assert_eq!(again.key().event_id, "b");
    }

    #[tokio::test]
    async fn abandoned_apply_releases_gate() {
        let gate = Gate::default();
        let api = MockApi::gated(gate.clone());
        let engine = SuggestionEngine::new(api.clone());

        let apply = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.apply("u1", &mv("a", 9, None)).await })
        };
        gate.entered.notified().await;
        assert!(engine.in_flight());

        apply.abort();
        let _ = apply.await;
        assert!(!engine.in_flight());
    }
}
