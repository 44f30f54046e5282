use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use maud::{html, Markup};
use serde::Deserialize;
use validator::Validate;

use crate::auth::{SessionContext, SessionLifetime};
use crate::client::ApiError;
use crate::models::{LoginRequest, RegisterRequest, VerifyEmailRequest};
use crate::AppState;

use super::components::layout;
use super::{validate_redirect_url, validation_message};

const NETWORK_ERROR: &str = "Network error. Please check your connection and try again.";

/// Redirect query parameter
#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub next: Option<String>,
}

/// Login form data
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[serde(rename = "remember-me")]
    pub remember_me: Option<String>,
    pub next: Option<String>,
}

impl LoginForm {
    fn remember(&self) -> bool {
        matches!(self.remember_me.as_deref(), Some("on" | "true" | "1"))
    }
}

/// Register form data
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub uid: Option<String>,
    pub token: Option<String>,
}

/// Show login page
pub async fn login_page(Query(redirect): Query<RedirectQuery>) -> Markup {
    login_view(None, redirect.next.as_deref(), "")
}

fn login_view(error: Option<&str>, next: Option<&str>, email: &str) -> Markup {
    layout::base(
        "Login",
        html! {
            div class="min-h-screen flex items-center justify-center bg-gray-50 py-12 px-4 sm:px-6 lg:px-8" {
                div class="max-w-md w-full space-y-8" {
                    div {
                        h2 class="mt-6 text-center text-3xl font-extrabold text-gray-900" {
                            "Sign in to your account"
                        }
                        p class="mt-2 text-center text-sm text-gray-600" {
                            "Or "
                            a href="/register" class="font-medium text-primary hover:text-green-700" {
                                "create a new account"
                            }
                        }
                    }

                    @if let Some(error) = error {
                        (layout::alert(error, "error"))
                    }

                    form class="mt-8 space-y-6" action="/login" method="POST" {
                        @if let Some(next) = next {
                            input type="hidden" name="next" value=(next);
                        }

                        div class="rounded-md shadow-sm -space-y-px" {
                            div {
                                label for="email" class="sr-only" { "Email address" }
                                input
                                    id="email"
                                    name="email"
                                    type="email"
                                    autocomplete="email"
                                    required
                                    value=(email)
                                    class="appearance-none rounded-none relative block w-full px-3 py-2 border border-gray-300 placeholder-gray-500 text-gray-900 rounded-t-md focus:outline-none focus:ring-primary focus:border-primary focus:z-10 sm:text-sm"
                                    placeholder="Email address";
                            }
                            div {
                                label for="password" class="sr-only" { "Password" }
                                input
                                    id="password"
                                    name="password"
                                    type="password"
                                    autocomplete="current-password"
                                    required
                                    class="appearance-none rounded-none relative block w-full px-3 py-2 border border-gray-300 placeholder-gray-500 text-gray-900 rounded-b-md focus:outline-none focus:ring-primary focus:border-primary focus:z-10 sm:text-sm"
                                    placeholder="Password";
                            }
                        }

                        div class="flex items-center" {
                            input
                                id="remember-me"
                                name="remember-me"
                                type="checkbox"
                                class="h-4 w-4 text-primary focus:ring-primary border-gray-300 rounded";
                            label for="remember-me" class="ml-2 block text-sm text-gray-900" {
                                "Remember me"
                            }
                        }

                        div {
                            (layout::button("Sign in", "primary", "w-full"))
                        }
                    }
                }
            }
        },
    )
}

/// Handle login form submission
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Err(errors) = form.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            login_view(
                Some(&validation_message(&errors)),
                form.next.as_deref(),
                &form.email,
            ),
        )
            .into_response();
    }

    let request = LoginRequest {
        email: form.email.clone(),
        password: form.password.clone(),
    };

    let login = match state.client.login(&request).await {
        Ok(login) => login,
        Err(ApiError::Network(e)) => {
            tracing::error!("Login request failed: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                login_view(Some(NETWORK_ERROR), form.next.as_deref(), &form.email),
            )
                .into_response();
        }
        Err(e) => {
            tracing::info!(reason = e.kind(), "Login rejected for {}", form.email);
            let message = e.user_message("Login failed. Please check your credentials.");
            return (
                StatusCode::UNAUTHORIZED,
                login_view(Some(&message), form.next.as_deref(), &form.email),
            )
                .into_response();
        }
    };

    let Some(access) = login.access.filter(|token| !token.is_empty()) else {
        let message = login
            .message
            .unwrap_or_else(|| "Login failed. Please check your credentials.".to_string());
        return (
            StatusCode::UNAUTHORIZED,
            login_view(Some(&message), form.next.as_deref(), &form.email),
        )
            .into_response();
    };

    let lifetime =
        SessionLifetime::from_remember_me(form.remember(), state.settings.session_ttl_days);
    let mut session = SessionContext::default();
    let jar = session.set(jar, &access, lifetime, state.settings.session_cookie_secure);

    tracing::info!(remember = form.remember(), "User {} logged in", form.email);

    let redirect_url = form
        .next
        .as_deref()
        .map(validate_redirect_url)
        .unwrap_or_else(|| "/dashboard".to_string());

    (jar, Redirect::to(&redirect_url)).into_response()
}

/// Show register page
pub async fn register_page() -> Markup {
    register_view(None, "", "")
}

fn register_view(error: Option<&str>, email: &str, name: &str) -> Markup {
    layout::base(
        "Register",
        html! {
            div class="min-h-screen flex items-center justify-center bg-gray-50 py-12 px-4 sm:px-6 lg:px-8" {
                div class="max-w-md w-full space-y-8" {
                    div {
                        h2 class="mt-6 text-center text-3xl font-extrabold text-gray-900" {
                            "Create your account"
                        }
                        p class="mt-2 text-center text-sm text-gray-600" {
                            "Already have an account? "
                            a href="/login" class="font-medium text-primary hover:text-green-700" {
                                "Sign in"
                            }
                        }
                    }

                    @if let Some(error) = error {
                        (layout::alert(error, "error"))
                    }

                    form class="mt-8 space-y-6" action="/register" method="POST" {
                        div class="rounded-md shadow-sm space-y-4" {
                            div {
                                label for="name" class="block text-sm font-medium text-gray-700" { "Full name" }
                                input
                                    id="name"
                                    name="name"
                                    type="text"
                                    required
                                    value=(name)
                                    class="mt-1 appearance-none relative block w-full px-3 py-2 border border-gray-300 placeholder-gray-500 text-gray-900 rounded-md focus:outline-none focus:ring-primary focus:border-primary sm:text-sm"
                                    placeholder="Ada Lovelace";
                            }
                            div {
                                label for="email" class="block text-sm font-medium text-gray-700" { "Email address" }
                                input
                                    id="email"
                                    name="email"
                                    type="email"
                                    autocomplete="email"
                                    required
                                    value=(email)
                                    class="mt-1 appearance-none relative block w-full px-3 py-2 border border-gray-300 placeholder-gray-500 text-gray-900 rounded-md focus:outline-none focus:ring-primary focus:border-primary sm:text-sm"
                                    placeholder="you@example.com";
                            }
                            div {
                                label for="password1" class="block text-sm font-medium text-gray-700" { "Password" }
                                input
                                    id="password1"
                                    name="password1"
                                    type="password"
                                    autocomplete="new-password"
                                    required
                                    class="mt-1 appearance-none relative block w-full px-3 py-2 border border-gray-300 placeholder-gray-500 text-gray-900 rounded-md focus:outline-none focus:ring-primary focus:border-primary sm:text-sm"
                                    placeholder="At least 8 characters";
                            }
                            div {
                                label for="password2" class="block text-sm font-medium text-gray-700" { "Confirm password" }
                                input
                                    id="password2"
                                    name="password2"
                                    type="password"
                                    autocomplete="new-password"
                                    required
                                    class="mt-1 appearance-none relative block w-full px-3 py-2 border border-gray-300 placeholder-gray-500 text-gray-900 rounded-md focus:outline-none focus:ring-primary focus:border-primary sm:text-sm";
                            }
                        }

                        div {
                            (layout::button("Create account", "primary", "w-full"))
                        }
                    }
                }
            }
        },
    )
}

/// Handle register form submission
pub async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password1 != form.password2 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            register_view(Some("Passwords do not match"), &form.email, &form.name),
        )
            .into_response();
    }

    if let Err(errors) = form.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            register_view(Some(&validation_message(&errors)), &form.email, &form.name),
        )
            .into_response();
    }

    let request = RegisterRequest {
        email: form.email.clone(),
        name: form.name.clone(),
        password1: form.password1.clone(),
        password2: form.password2.clone(),
    };

    match state.client.register(&request).await {
        Ok(_) => {
            tracing::info!("Registered account for {}", form.email);
            layout::message_page(
                "Check your email",
                &format!(
                    "Account created. We sent a verification link to {}.",
                    form.email
                ),
                "success",
                ("/login", "Continue to sign in →"),
            )
            .into_response()
        }
        Err(ApiError::Network(e)) => {
            tracing::error!("Register request failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                register_view(Some(NETWORK_ERROR), &form.email, &form.name),
            )
                .into_response()
        }
        Err(e) => {
            let message = e.user_message("Registration failed. Please try again.");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                register_view(Some(&message), &form.email, &form.name),
            )
                .into_response()
        }
    }
}

/// Confirm an email address from the link sent after registration
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Response {
    let (Some(uid), Some(token)) = (
        query.uid.filter(|v| !v.is_empty()),
        query.token.filter(|v| !v.is_empty()),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            layout::message_page(
                "Verification failed",
                "Invalid verification link. Please check your email and try again.",
                "error",
                ("/register", "← Back to registration"),
            ),
        )
            .into_response();
    };

    match state
        .client
        .verify_email(&VerifyEmailRequest { uid, token })
        .await
    {
        Ok(_) => layout::message_page(
            "Email verified",
            "Your email has been verified successfully! You can now log in to your account.",
            "success",
            ("/login", "Continue to sign in →"),
        )
        .into_response(),
        Err(ApiError::Network(e)) => {
            tracing::error!("Verify email request failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                layout::message_page(
                    "Verification failed",
                    NETWORK_ERROR,
                    "error",
                    ("/register", "← Back to registration"),
                ),
            )
                .into_response()
        }
        Err(e) => {
            let message = e.user_message("Verification failed. The link may be expired or invalid.");
            (
                StatusCode::BAD_REQUEST,
                layout::message_page(
                    "Verification failed",
                    &message,
                    "error",
                    ("/register", "← Back to registration"),
                ),
            )
                .into_response()
        }
    }
}

/// Handle logout - clear session cookie and redirect to login
pub async fn logout_submit(jar: CookieJar) -> Response {
    let mut session = SessionContext::from_jar(&jar);
    let jar = session.clear(jar);

    (jar, Redirect::to("/login")).into_response()
}

#[cfg(test)]
mod tests {
    use crate::test_utils::helpers::{
        body_string, location, post_form, set_cookies, test_app, StubApi,
    };
    use axum::{
        body::Body,
        extract::Json as ExtractJson,
        http::{Request, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn login_api() -> Router {
        Router::new().route(
            "/users/api/login/",
            post(|ExtractJson(body): ExtractJson<Value>| async move {
                if body["password"] == "correct horse" {
                    Ok(Json(json!({"access": "issued-token", "user": {"email": body["email"]}})))
                } else {
                    Err((
                        StatusCode::BAD_REQUEST,
                        Json(json!({"message": "Invalid email or password"})),
                    ))
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_login_sets_browser_session_cookie() {
        let stub = StubApi::spawn(login_api()).await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/login",
                None,
                "email=ada%40example.com&password=correct+horse",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");

        let cookies = set_cookies(&response);
        let session = cookies
            .iter()
            .find(|c| c.starts_with("access_token=issued-token"))
            .expect("session cookie");
        assert!(!session.contains("Max-Age"));
        assert!(session.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_remember_me_persists_cookie_and_honours_next() {
        let stub = StubApi::spawn(login_api()).await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/login",
                None,
                "email=ada%40example.com&password=correct+horse&remember-me=on&next=%2Fdashboard%2Facme",
            ))
            .await
            .unwrap();

        assert_eq!(location(&response), "/dashboard/acme");
        assert!(set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("access_token=") && c.contains("Max-Age=604800")));
    }

    #[tokio::test]
    async fn test_login_rejects_offsite_next() {
        let stub = StubApi::spawn(login_api()).await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/login",
                None,
                "email=ada%40example.com&password=correct+horse&next=https%3A%2F%2Fevil.example.com",
            ))
            .await
            .unwrap();

        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn test_failed_login_shows_server_message() {
        let stub = StubApi::spawn(login_api()).await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/login",
                None,
                "email=ada%40example.com&password=wrong",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&response).is_empty());
        assert!(body_string(response)
            .await
            .contains("Invalid email or password"));
    }

    #[tokio::test]
    async fn test_unauthorized_login_shows_server_message() {
        let stub = StubApi::spawn(Router::new().route(
            "/users/api/login/",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"message": "Invalid credentials"})),
                )
            }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/login",
                None,
                "email=ada%40example.com&password=wrong",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_string(response).await;
        assert!(body.contains("Invalid credentials"));
        assert!(!body.contains("Please check your credentials"));
    }

    #[tokio::test]
    async fn test_login_without_access_token_fails() {
        let stub = StubApi::spawn(Router::new().route(
            "/users/api/login/",
            post(|| async { Json(json!({"user": {"email": "ada@example.com"}})) }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/login",
                None,
                "email=ada%40example.com&password=whatever",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response)
            .await
            .contains("Login failed. Please check your credentials."));
    }

    #[tokio::test]
    async fn test_register_password_mismatch_skips_api() {
        let stub = StubApi::spawn(Router::new()).await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/register",
                None,
                "email=ada%40example.com&name=Ada&password1=longenough1&password2=longenough2",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(response).await.contains("Passwords do not match"));
        assert!(stub.hits().is_empty());
    }

    #[tokio::test]
    async fn test_register_forwards_form() {
        let stub = StubApi::spawn(Router::new().route(
            "/users/api/registers/",
            post(|ExtractJson(body): ExtractJson<Value>| async move {
                assert_eq!(body["name"], "Ada");
                assert_eq!(body["password1"], body["password2"]);
                (StatusCode::CREATED, Json(json!({"message": "User created"})))
            }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(post_form(
                "/register",
                None,
                "email=ada%40example.com&name=Ada&password1=longenough1&password2=longenough1",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("ada@example.com"));
        assert_eq!(stub.hits(), vec!["POST /users/api/registers/"]);
    }

    #[tokio::test]
    async fn test_verify_email_requires_both_params() {
        let stub = StubApi::spawn(Router::new()).await;

        let response = test_app(&stub)
            .oneshot(
                Request::builder()
                    .uri("/verify-email?uid=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response)
            .await
            .contains("Invalid verification link"));
        assert!(stub.hits().is_empty());
    }

    #[tokio::test]
    async fn test_verify_email_shows_server_failure() {
        let stub = StubApi::spawn(Router::new().route(
            "/users/api/verify-email/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"message": "Token expired"})),
                )
            }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(
                Request::builder()
                    .uri("/verify-email?uid=abc&token=def")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Token expired"));
    }

    #[tokio::test]
    async fn test_verify_email_shows_not_found_message() {
        let stub = StubApi::spawn(Router::new().route(
            "/users/api/verify-email/",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"detail": "Verification link not recognised"})),
                )
            }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(
                Request::builder()
                    .uri("/verify-email?uid=abc&token=def")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_string(response).await;
        assert!(body.contains("Verification link not recognised"));
        assert!(!body.contains("may be expired or invalid"));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let stub = StubApi::spawn(Router::new()).await;

        let response = test_app(&stub)
            .oneshot(post_form("/logout", Some("tok"), ""))
            .await
            .unwrap();

        assert_eq!(location(&response), "/login");
        assert!(set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("access_token=;") || c.starts_with("access_token=\"\"")));
    }
}
