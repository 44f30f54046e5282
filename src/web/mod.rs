pub mod auth;
pub mod bulk_upload;
pub mod components;
pub mod dashboard;
pub mod organizations;
pub mod redirect;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use maud::{html, Markup};
use serde::Deserialize;
use validator::ValidationErrors;

use crate::AppState;

/// Browser-facing routes. The short link catch-all is registered last.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/register", get(auth::register_page).post(auth::register_submit))
        .route("/verify-email", get(auth::verify_email))
        .route("/logout", post(auth::logout_submit))
        .route("/dashboard", get(dashboard::show))
        .route("/organizations/create", post(dashboard::create_organization))
        .route("/invitations/accept", post(dashboard::accept_invitation))
        .route("/dashboard/:slug", get(organizations::show))
        .route("/dashboard/:slug/urls", post(organizations::create_url))
        .route(
            "/dashboard/:slug/urls/:id/delete",
            post(organizations::delete_url),
        )
        .route(
            "/dashboard/:slug/invitations",
            post(organizations::send_invitation),
        )
        .route("/member-organizations", get(organizations::member_list))
        .route("/member/:slug", get(organizations::member_show))
        .route(
            "/bulk-upload",
            get(bulk_upload::page).post(bulk_upload::submit),
        )
        .route("/health", get(crate::api::health_handler))
        .route("/metrics", get(crate::api::metrics_handler))
        .route("/:org_slug/:slug", get(redirect::resolve))
        .fallback(not_found)
        .with_state(state)
}

/// One-shot message shown after a form round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    OrgCreated,
    OrgCreateFailed,
    InvitationAccepted,
    InvitationAcceptFailed,
    UrlCreated,
    UrlCreateFailed,
    UrlDeleted,
    UrlDeleteFailed,
    InvitationSent,
    InvitationSendFailed,
}

impl Notice {
    const ALL: [Notice; 10] = [
        Notice::OrgCreated,
        Notice::OrgCreateFailed,
        Notice::InvitationAccepted,
        Notice::InvitationAcceptFailed,
        Notice::UrlCreated,
        Notice::UrlCreateFailed,
        Notice::UrlDeleted,
        Notice::UrlDeleteFailed,
        Notice::InvitationSent,
        Notice::InvitationSendFailed,
    ];

    /// Look up a notice by its query-string name
    pub fn parse(value: &str) -> Option<Notice> {
        Notice::ALL.into_iter().find(|notice| notice.as_str() == value)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Notice::OrgCreated => "org_created",
            Notice::OrgCreateFailed => "org_create_failed",
            Notice::InvitationAccepted => "invitation_accepted",
            Notice::InvitationAcceptFailed => "invitation_accept_failed",
            Notice::UrlCreated => "url_created",
            Notice::UrlCreateFailed => "url_create_failed",
            Notice::UrlDeleted => "url_deleted",
            Notice::UrlDeleteFailed => "url_delete_failed",
            Notice::InvitationSent => "invitation_sent",
            Notice::InvitationSendFailed => "invitation_send_failed",
        }
    }

    fn is_error(self) -> bool {
        self.as_str().ends_with("_failed")
    }

    /// Default wording when no detail came back with the redirect
    pub fn message(self) -> &'static str {
        match self {
            Notice::OrgCreated => "Organization created",
            Notice::OrgCreateFailed => "Failed to create organization. Please try again.",
            Notice::InvitationAccepted => "Invitation accepted",
            Notice::InvitationAcceptFailed => "Failed to accept invitation. Please try again.",
            Notice::UrlCreated => "Short URL created!",
            Notice::UrlCreateFailed => "Failed to create short URL. Please try again.",
            Notice::UrlDeleted => "Short URL deleted successfully",
            Notice::UrlDeleteFailed => "Failed to delete URL",
            Notice::InvitationSent => "Invitation sent",
            Notice::InvitationSendFailed => "Failed to send invitation",
        }
    }
}

/// `?notice=&detail=`; an unrecognised notice renders nothing
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    pub detail: Option<String>,
}

impl NoticeQuery {
    pub fn notice(&self) -> Option<Notice> {
        self.notice.as_deref().and_then(Notice::parse)
    }

    pub fn render(&self) -> Markup {
        let Some(notice) = self.notice() else {
            return html! {};
        };

        let message = match self.detail.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(detail) if notice.is_error() => detail.to_string(),
            Some(detail) => format!("{}: {}", notice.message(), detail),
            None => notice.message().to_string(),
        };

        let kind = if notice.is_error() { "error" } else { "success" };
        components::layout::alert(&message, kind)
    }
}

/// Redirect back to `path` carrying a notice (and optional detail) for the next render
pub fn notice_redirect(path: &str, notice: Notice, detail: Option<&str>) -> Response {
    let mut target = format!("{}?notice={}", path, notice.as_str());
    if let Some(detail) = detail {
        target.push_str("&detail=");
        target.push_str(&urlencoding::encode(detail));
    }
    Redirect::to(&target).into_response()
}

/// Flatten validator errors into one sentence, in field order
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validate redirect URL to prevent open redirect attacks.
/// Only allows relative URLs starting with /
pub fn validate_redirect_url(url: &str) -> String {
    if url.starts_with('/')
        && !url.starts_with("//")
        && !url.contains('\\')
        && !url.chars().any(|c| c.is_control() || c.is_whitespace())
    {
        url.to_string()
    } else {
        "/dashboard".to_string()
    }
}

/// Home page - landing page with login button
pub async fn home() -> Markup {
    components::layout::base(
        "Short links for teams",
        html! {
            div class="min-h-screen bg-gradient-to-br from-green-50 to-emerald-100" {
                nav class="bg-white shadow-sm" {
                    div class="max-w-7xl mx-auto px-4 sm:px-6 lg:px-8" {
                        div class="flex justify-between h-16" {
                            div class="flex items-center" {
                                span class="text-2xl font-bold text-primary" { "Linkdesk" }
                            }
                            div class="flex items-center gap-4" {
                                a href="/login" class="text-gray-700 hover:text-primary font-medium" {
                                    "Sign in"
                                }
                                a
                                    href="/register"
                                    class="inline-flex items-center px-4 py-2 border border-transparent text-sm font-medium rounded-md shadow-sm text-white bg-primary hover:bg-green-800" {
                                    "Get Started"
                                }
                            }
                        }
                    }
                }

                div class="max-w-7xl mx-auto px-4 sm:px-6 lg:px-8 pt-20 pb-16 text-center" {
                    h1 class="text-5xl font-extrabold text-gray-900 sm:text-6xl mb-8" {
                        "Short links for your whole organization"
                    }
                    p class="text-xl text-gray-600 max-w-3xl mx-auto mb-12" {
                        "Create branded short URLs per organization, invite your team with roles, "
                        "and see how often every link is clicked."
                    }
                    div class="flex justify-center gap-4" {
                        a
                            href="/register"
                            class="inline-flex items-center px-8 py-3 border border-transparent text-base font-medium rounded-md shadow-sm text-white bg-primary hover:bg-green-800" {
                            "Create an account"
                        }
                        a
                            href="/dashboard"
                            class="inline-flex items-center px-8 py-3 border border-gray-300 text-base font-medium rounded-md text-gray-700 bg-white hover:bg-gray-50" {
                            "Open dashboard"
                        }
                    }
                }

                div class="max-w-7xl mx-auto px-4 sm:px-6 lg:px-8 pb-20" {
                    div class="grid grid-cols-1 gap-8 sm:grid-cols-3" {
                        (feature_card("Organizations", "Every team gets its own namespace of short links."))
                        (feature_card("Roles", "Admins manage links and people, editors create links, viewers follow along."))
                        (feature_card("Bulk upload", "Import a CSV of destinations and get short links for all of them."))
                    }
                }
            }
        },
    )
}

fn feature_card(title: &str, description: &str) -> Markup {
    html! {
        div class="bg-white rounded-lg shadow-md p-6" {
            h3 class="text-xl font-bold text-gray-900 mb-2" {
                (title)
            }
            p class="text-gray-600" {
                (description)
            }
        }
    }
}

/// 404 Not Found page
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, not_found_page()).into_response()
}

pub fn not_found_page() -> Markup {
    components::layout::base(
        "404 Not Found",
        html! {
            div class="min-h-screen flex items-center justify-center bg-gray-50" {
                div class="text-center" {
                    h1 class="text-6xl font-bold text-gray-900 mb-4" { "404" }
                    p class="text-xl text-gray-600 mb-8" { "Page not found" }
                    a href="/" class="text-primary hover:text-green-700 underline" {
                        "Go back home"
                    }
                }
            }
        },
    )
}
