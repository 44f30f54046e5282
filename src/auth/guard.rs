//! Session guard for protected pages.
//!
//! A guard starts `Pending`, makes at most one probe against `/api/dashboard/`
//! and settles into `Authorized` or `Unauthorized`. Both settled states are
//! terminal. Handlers take [`AuthorizedSession`] as an extractor; any refusal
//! turns into a redirect to the login page.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Method},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::session::SessionContext;
use crate::client::{ApiClient, ApiError};
use crate::models::DashboardResponse;
use crate::monitoring;
use crate::AppState;

/// Why the guard refused the request
#[derive(Debug)]
pub enum Denial {
    MissingToken,
    Rejected(ApiError),
}

impl Denial {
    fn label(&self) -> &'static str {
        match self {
            Denial::MissingToken => "missing_token",
            Denial::Rejected(e) => e.kind(),
        }
    }
}

#[derive(Debug)]
pub enum GuardState {
    Pending,
    Authorized(Box<DashboardResponse>),
    Unauthorized(Denial),
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Pending)
    }

    /// Move to `next`, unless this state has already settled
    pub fn settle(self, next: GuardState) -> GuardState {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }
}

/// Decide whether the session may see a protected page
pub async fn check(client: &ApiClient, session: &SessionContext) -> GuardState {
    let state = GuardState::Pending;

    let Some(token) = session.token() else {
        return state.settle(GuardState::Unauthorized(Denial::MissingToken));
    };

    let next = match client.dashboard(token).await {
        Ok(dashboard) => GuardState::Authorized(Box::new(dashboard)),
        Err(e) => GuardState::Unauthorized(Denial::Rejected(e)),
    };

    state.settle(next)
}

/// Login URL that brings the user back to `path` afterwards
pub fn login_redirect_target(path_and_query: &str) -> String {
    if path_and_query.is_empty() || path_and_query == "/" {
        "/login".to_string()
    } else {
        format!("/login?next={}", urlencoding::encode(path_and_query))
    }
}

/// A request whose token the shortener API just accepted.
///
/// Carries the dashboard payload fetched by the probe so pages do not call it twice.
#[derive(Debug)]
pub struct AuthorizedSession {
    pub token: String,
    pub dashboard: DashboardResponse,
}

impl AuthorizedSession {
    pub fn email(&self) -> &str {
        &self.dashboard.email
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthorizedSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let mut session = SessionContext::from_jar(&jar);

        match check(&state.client, &session).await {
            GuardState::Authorized(dashboard) => {
                monitoring::GUARD_DECISIONS
                    .with_label_values(&["authorized"])
                    .inc();
                Ok(AuthorizedSession {
                    token: session.token().unwrap_or_default().to_string(),
                    dashboard: *dashboard,
                })
            }
            GuardState::Unauthorized(denial) => {
                monitoring::GUARD_DECISIONS
                    .with_label_values(&[denial.label()])
                    .inc();

                // Only a GET can be replayed after login
                let target = match parts.method {
                    Method::GET => parts
                        .uri
                        .path_and_query()
                        .map(|pq| pq.as_str())
                        .unwrap_or("/"),
                    _ => "/",
                };
                let redirect = Redirect::to(&login_redirect_target(target));

                match denial {
                    Denial::Rejected(e) if e.invalidates_session() => {
                        tracing::info!(reason = e.kind(), "Session rejected, clearing cookie");
                        Err((session.clear(jar), redirect).into_response())
                    }
                    Denial::Rejected(e) => {
                        tracing::warn!(reason = e.kind(), error = %e, "Session check failed");
                        Err(redirect.into_response())
                    }
                    Denial::MissingToken => Err(redirect.into_response()),
                }
            }
            GuardState::Pending => {
                tracing::error!("Session guard returned without settling");
                Err(Redirect::to("/login").into_response())
            }
        }
    }
}
