//! Short link resolution.
//!
//! `Pending` → `Navigating(url)` when the API knows the slug and the destination is
//! a web URL, otherwise `Failed(reason)`. Either settled state is final; the page
//! layer turns `Failed` into an error view with a retry link.

use axum::http::HeaderValue;
use reqwest::Url;

use crate::client::{ApiClient, ApiError};
use crate::monitoring;

#[derive(Debug)]
pub enum ResolveFailure {
    /// The organization has no such slug
    UnknownLink,
    /// The API answered with something that is not an http(s) URL
    InvalidDestination(String),
    /// Any other upstream failure
    Upstream(ApiError),
}

impl ResolveFailure {
    fn label(&self) -> &'static str {
        match self {
            ResolveFailure::UnknownLink => "unknown_link",
            ResolveFailure::InvalidDestination(_) => "invalid_destination",
            ResolveFailure::Upstream(_) => "upstream_error",
        }
    }
}

#[derive(Debug)]
pub enum ResolveState {
    Pending,
    Navigating(String),
    Failed(ResolveFailure),
}

impl ResolveState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResolveState::Pending)
    }

    pub fn settle(self, next: ResolveState) -> ResolveState {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }
}

/// Only absolute http/https destinations may be navigated to
pub fn is_navigable(destination: &str) -> bool {
    navigable_url(destination).is_some()
}

/// The destination in the form sent as `Location`, if it is safe to navigate to
pub fn navigable_url(destination: &str) -> Option<String> {
    let destination = destination.trim();
    // The URL parser silently drops tabs and newlines, so check the raw text
    if destination
        .chars()
        .any(|c| c.is_control() || c.is_whitespace())
    {
        return None;
    }

    // "https:///host" would be normalized into a different host
    let lower = destination.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return None;
    }

    let url = Url::parse(destination).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return None;
    }

    HeaderValue::from_str(url.as_str()).ok()?;
    Some(url.into())
}

/// Resolve one organization/slug pair with a single API call
pub async fn resolve(
    client: &ApiClient,
    token: Option<&str>,
    org_slug: &str,
    slug: &str,
) -> ResolveState {
    let state = ResolveState::Pending;

    let next = match client.resolve(token, org_slug, slug).await {
        Ok(resolved) => match navigable_url(&resolved.original_url) {
            Some(destination) => ResolveState::Navigating(destination),
            None => ResolveState::Failed(ResolveFailure::InvalidDestination(
                resolved.original_url,
            )),
        },
        Err(ApiError::NotFound { .. }) => ResolveState::Failed(ResolveFailure::UnknownLink),
        Err(e) => ResolveState::Failed(ResolveFailure::Upstream(e)),
    };

    let outcome = match &next {
        ResolveState::Navigating(_) => "navigating",
        ResolveState::Failed(failure) => failure.label(),
        ResolveState::Pending => "pending",
    };
    monitoring::REDIRECTS.with_label_values(&[outcome]).inc();

    state.settle(next)
}
