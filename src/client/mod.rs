//! Typed client for the external URL-shortener API.
//!
//! Every call goes through [`ApiClient::send`], which records metrics and turns
//! the response into either the decoded body or an [`ApiError`]. Nothing here
//! retries; a failed call is reported once and the caller decides.

pub mod error;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::models::{
    AcceptInvitationRequest, CreateOrganizationRequest, CreateUrlRequest, CreatedUrl,
    DashboardResponse, Invitation, LoginRequest, LoginResponse, MessageResponse, Organization,
    RegisterRequest, ResolvedUrl, SendInvitationRequest, ShortUrl, VerifyEmailRequest,
};
use crate::monitoring;

pub use error::ApiError;

/// URL list bodies come back either bare or wrapped in a paginated envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum UrlListBody {
    Plain(Vec<ShortUrl>),
    Paged { results: Vec<ShortUrl> },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.http.get(self.url(path)), token)
    }

    fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.http.post(self.url(path)), token)
    }

    /// Session probe: fetch the user with their organizations
    pub async fn dashboard(&self, token: &str) -> Result<DashboardResponse, ApiError> {
        self.send("dashboard", self.get("/api/dashboard/", Some(token)))
            .await
    }

    pub async fn create_organization(&self, token: &str, name: &str) -> Result<(), ApiError> {
        let body = CreateOrganizationRequest {
            name: name.to_string(),
        };
        self.send_empty(
            "create_organization",
            self.post("/api/organizations/create/", Some(token)).json(&body),
        )
        .await
    }

    /// Organizations where the user is a non-admin member
    pub async fn memberships(&self, token: &str) -> Result<Vec<Organization>, ApiError> {
        self.send(
            "memberships",
            self.get("/api/organizations/memberships/", Some(token)),
        )
        .await
    }

    pub async fn list_urls(&self, token: &str, org_slug: &str) -> Result<Vec<ShortUrl>, ApiError> {
        let request = self
            .get("/api/urls/list/", Some(token))
            .query(&[("organization_slug", org_slug)]);

        let body: UrlListBody = self.send("list_urls", request).await?;
        Ok(match body {
            UrlListBody::Plain(urls) | UrlListBody::Paged { results: urls } => urls,
        })
    }

    pub async fn create_url(
        &self,
        token: &str,
        request: &CreateUrlRequest,
    ) -> Result<CreatedUrl, ApiError> {
        self.send(
            "create_url",
            self.post("/api/urls/create/", Some(token)).json(request),
        )
        .await
    }

    pub async fn delete_url(&self, token: &str, id: i64) -> Result<(), ApiError> {
        let request = authorize(
            self.http
                .delete(self.url(&format!("/api/urls/delete/{}/", id))),
            Some(token),
        );
        self.send_empty("delete_url", request).await
    }

    /// Translate an organization/slug pair into its destination.
    ///
    /// Public lookup; the bearer token is attached only when the visitor has one.
    pub async fn resolve(
        &self,
        token: Option<&str>,
        org_slug: &str,
        slug: &str,
    ) -> Result<ResolvedUrl, ApiError> {
        let request = self
            .get("/api/urls/resolve/", token)
            .query(&[("organization_slug", org_slug), ("slug", slug)]);
        self.send("resolve", request).await
    }

    pub async fn my_invitations(&self, token: &str) -> Result<Vec<Invitation>, ApiError> {
        self.send(
            "my_invitations",
            self.get("/api/invitations/my/", Some(token)),
        )
        .await
    }

    pub async fn accept_invitation(
        &self,
        token: &str,
        invitation_token: &str,
    ) -> Result<(), ApiError> {
        let body = AcceptInvitationRequest {
            token: invitation_token.to_string(),
        };
        self.send_empty(
            "accept_invitation",
            self.post("/api/invitations/accept/", Some(token)).json(&body),
        )
        .await
    }

    pub async fn send_invitation(
        &self,
        token: &str,
        request: &SendInvitationRequest,
    ) -> Result<(), ApiError> {
        self.send_empty(
            "send_invitation",
            self.post("/api/invitations/send/", Some(token)).json(request),
        )
        .await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.send("login", self.post("/users/api/login/", None).json(request))
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError> {
        self.send(
            "register",
            self.post("/users/api/registers/", None).json(request),
        )
        .await
    }

    pub async fn verify_email(
        &self,
        request: &VerifyEmailRequest,
    ) -> Result<MessageResponse, ApiError> {
        self.send(
            "verify_email",
            self.post("/users/api/verify-email/", None).json(request),
        )
        .await
    }

    /// Send a request and decode a JSON body
    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let start = Instant::now();
        let result = match dispatch(request).await {
            Ok(response) => response
                .json::<T>()
                .await
                .map_err(|e| ApiError::MalformedBody(e.to_string())),
            Err(e) => Err(e),
        };
        record(endpoint, start, &result);
        result
    }

    /// Send a request whose body (if any) is not needed
    async fn send_empty(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<(), ApiError> {
        let start = Instant::now();
        let result = dispatch(request).await.map(|_| ());
        record(endpoint, start, &result);
        result
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn dispatch(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, &body))
}

fn record<T>(endpoint: &'static str, start: Instant, result: &Result<T, ApiError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };

    monitoring::UPSTREAM_REQUESTS
        .with_label_values(&[endpoint, outcome])
        .inc();
    monitoring::UPSTREAM_LATENCY
        .with_label_values(&[endpoint])
        .observe(start.elapsed().as_secs_f64());

    match result {
        Ok(_) => tracing::debug!(endpoint, "Shortener API call succeeded"),
        Err(e @ (ApiError::Network(_) | ApiError::ServerError { .. } | ApiError::MalformedBody(_))) => {
            tracing::error!(endpoint, error = %e, "Shortener API call failed")
        }
        Err(e) => tracing::warn!(endpoint, error = %e, "Shortener API rejected request"),
    }
}
