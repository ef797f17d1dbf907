//! HTTP implementation of [`PlannerApi`] over the backend's JSON routes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError};
use crate::suggestions::Suggestion;
use crate::wizard::{OnboardingPayload, WeeklyCheckIn};

use super::PlannerApi;
use super::types::{
    CreatedEvent, CycleProfile, CycleSummary, EventMove, LoginProfile, MonthlyCheckIn, NewEvent,
    PlanSuggestion, PlanTask, RegisteredUser,
};

/// Request body carrying the user id next to the operation's own fields.
#[derive(Serialize)]
struct ForUser<'a, T: Serialize> {
    user_id: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct UserOnly<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
struct EvaluateBody<'a> {
    user_id: &'a str,
    tasks: [&'a PlanTask; 1],
}

#[derive(Deserialize)]
struct SuggestionList<T> {
    #[serde(default = "Vec::new")]
    suggestions: Vec<T>,
}

#[derive(Deserialize)]
struct AuthUrl {
    auth_url: String,
}

/// `PlannerApi` over reqwest. Every exchange (send plus body read) is
/// bounded by the configured timeout.
pub struct HttpPlannerApi {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpPlannerApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.api_url).map_err(|e| ConfigError::InvalidValue {
            key: "CYCLE_PLANNER_API_URL".to_string(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                key: "CYCLE_PLANNER_API_URL".to_string(),
                message: format!("{} is not an http(s) base URL", config.api_url),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: config.request_timeout,
        })
    }

    /// Build a URL from path segments. Segments are percent-encoded, so user
    /// ids can go straight into the path.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client.request(method, self.url(segments))
    }

    /// Run one exchange and return the body of a 2xx answer.
    async fn exchange(&self, operation: &str, request: RequestBuilder) -> Result<String, ApiError> {
        let network = |e: reqwest::Error| ApiError::Network {
            operation: operation.to_string(),
            reason: e.to_string(),
        };

        let call = async {
            let response = request.send().await.map_err(network)?;
            let status = response.status();
            let body = response.text().await.map_err(network)?;
            Ok::<_, ApiError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                warn!(operation, timeout = ?self.timeout, "Backend call timed out");
                ApiError::Timeout {
                    operation: operation.to_string(),
                    timeout: self.timeout,
                }
            })??;

        if !status.is_success() {
            let message = detail_message(&body).unwrap_or_else(|| default_message(operation, status));
            warn!(operation, status = status.as_u16(), message = %message, "Backend rejected call");
            return Err(ApiError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        debug!(operation, status = status.as_u16(), "Backend call succeeded");
        Ok(body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.exchange(operation, request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }

    /// Like [`call`](Self::call) for endpoints whose answer is only an ack.
    async fn ack(&self, operation: &str, request: RequestBuilder) -> Result<(), ApiError> {
        self.exchange(operation, request).await.map(|_| ())
    }
}

/// Pull the human-readable message out of a `{"detail": ...}` error body.
/// The detail is either a string or a list of `{"msg": ...}` items.
fn detail_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

fn default_message(operation: &str, status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => format!("{operation}: not found"),
        StatusCode::CONFLICT => format!("{operation}: conflict"),
        _ => format!("{operation} failed ({status})"),
    }
}

#[async_trait]
impl PlannerApi for HttpPlannerApi {
    async fn register(&self, email: &str) -> Result<RegisteredUser, ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "register"])
            .json(&EmailBody { email });
        let user: RegisteredUser = self.call("register", request).await?;
        info!(user_id = %user.user_id, "Registered");
        Ok(user)
    }

    async fn login(&self, email: &str) -> Result<LoginProfile, ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "login"])
            .json(&EmailBody { email });
        let profile: LoginProfile = self.call("login", request).await?;
        info!(user_id = %profile.user_id, "Logged in");
        Ok(profile)
    }

    async fn submit_onboarding(
        &self,
        user_id: &str,
        payload: &OnboardingPayload,
    ) -> Result<CycleProfile, ApiError> {
        let request = self
            .request(Method::POST, &["api", "profile", "quiz"])
            .json(&ForUser { user_id, body: payload });
        self.call("submit onboarding", request).await
    }

    async fn submit_weekly_checkin(
        &self,
        user_id: &str,
        answers: &WeeklyCheckIn,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["api", "profile", "weekly-quiz"])
            .json(&ForUser { user_id, body: answers });
        self.ack("submit weekly check-in", request).await
    }

    async fn submit_monthly_checkin(
        &self,
        user_id: &str,
        answers: &MonthlyCheckIn,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["api", "profile", "monthly-quiz"])
            .json(&ForUser { user_id, body: answers });
        self.ack("submit monthly check-in", request).await
    }

    async fn cycle_summary(&self, user_id: &str) -> Result<CycleSummary, ApiError> {
        let request = self.request(Method::GET, &["api", "user", user_id, "cycle-summary"]);
        self.call("cycle summary", request).await
    }

    async fn evaluate_plan(
        &self,
        user_id: &str,
        task: &PlanTask,
    ) -> Result<PlanSuggestion, ApiError> {
        let request = self
            .request(Method::POST, &["api", "plan", "evaluate"])
            .json(&EvaluateBody {
                user_id,
                tasks: [task],
            });
        let list: SuggestionList<PlanSuggestion> = self.call("evaluate plan", request).await?;
        list.suggestions
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidResponse {
                operation: "evaluate plan".to_string(),
                reason: "no suggestion returned".to_string(),
            })
    }

    async fn weekly_reorg(&self, user_id: &str) -> Result<Vec<Suggestion>, ApiError> {
        let request = self
            .request(Method::POST, &["api", "agent", "weekly-reorg"])
            .json(&UserOnly { user_id });
        let list: SuggestionList<Suggestion> = self.call("weekly reorg", request).await?;
        Ok(list.suggestions)
    }

    async fn move_event(&self, user_id: &str, change: &EventMove) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["api", "calendar", "move-event"])
            .json(&ForUser { user_id, body: change });
        self.ack("move event", request).await
    }

    async fn create_event(&self, user_id: &str, event: &NewEvent) -> Result<CreatedEvent, ApiError> {
        let request = self
            .request(Method::POST, &["api", "calendar", "create-event"])
            .json(&ForUser { user_id, body: event });
        self.call("create event", request).await
    }

    async fn calendar_auth_url(&self, user_id: &str) -> Result<String, ApiError> {
        let request = self
            .request(Method::GET, &["api", "google", "auth-url"])
            .query(&[("user_id", user_id)]);
        let answer: AuthUrl = self.call("calendar auth url", request).await?;
        Ok(answer.auth_url)
    }
}
