use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{html, Markup};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::auth::AuthorizedSession;
use crate::models::{display_date, CreateUrlRequest, Organization, Role, SendInvitationRequest, ShortUrl};
use crate::resolver::is_navigable;
use crate::AppState;

use super::components::layout;
use super::{not_found_page, notice_redirect, validation_message, Notice, NoticeQuery};

/// Form data for creating a short URL
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUrlForm {
    #[validate(
        url(message = "Enter a valid URL, including http:// or https://."),
        custom(function = "validate_web_url")
    )]
    pub original_url: String,
    #[serde(default)]
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
}

/// Form data for inviting someone into an organization
#[derive(Debug, Deserialize, Validate)]
pub struct InvitationForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default = "default_invite_role")]
    pub role: Role,
}

fn default_invite_role() -> Role {
    Role::Viewer
}

/// Custom slugs are optional; when given they must be URL-safe
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Ok(());
    }

    if slug.len() > 50
        || !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut error = ValidationError::new("slug");
        error.message =
            Some("Slugs may only contain letters, numbers, hyphens and underscores (max 50).".into());
        return Err(error);
    }

    Ok(())
}

fn validate_web_url(url: &str) -> Result<(), ValidationError> {
    if is_navigable(url) {
        Ok(())
    } else {
        let mut error = ValidationError::new("scheme");
        error.message = Some("Only http:// and https:// links can be shortened.".into());
        Err(error)
    }
}

/// Look up one of the user's organizations, or render the 404 page
fn find_organization<'a>(
    session: &'a AuthorizedSession,
    slug: &str,
) -> Result<&'a Organization, Response> {
    session.dashboard.organization(slug).ok_or_else(|| {
        tracing::info!("{} has no organization {:?}", session.email(), slug);
        (StatusCode::NOT_FOUND, not_found_page()).into_response()
    })
}

/// Page a form round trip returns to for this organization
fn home_path(org: &Organization) -> String {
    if org.role == Role::Admin {
        format!("/dashboard/{}", org.slug)
    } else {
        format!("/member/{}", org.slug)
    }
}

/// Admin view of one organization
pub async fn show(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Path(slug): Path<String>,
    Query(notice): Query<NoticeQuery>,
) -> Result<Markup, Response> {
    let org = find_organization(&session, &slug)?;

    if org.role != Role::Admin {
        return Err(Redirect::to(&format!("/member/{}", org.slug)).into_response());
    }

    let (urls, load_error) = load_urls(&state, &session, org).await;
    let total_clicks: i64 = urls.iter().map(|url| url.clicks).sum();

    Ok(layout::base(
        &org.name,
        layout::app_shell(
            session.email(),
            "dashboard",
            html! {
                div class="space-y-6" {
                    (org_header(org, "Manage short links and members"))

                    (notice.render())
                    @if let Some(error) = &load_error {
                        (layout::alert(error, "error"))
                    }

                    div class="grid grid-cols-1 gap-6 sm:grid-cols-2" {
                        (stat("Short links", urls.len() as i64))
                        (stat("Total clicks", total_clicks))
                    }

                    (layout::card("Create Short URL", create_url_form(org)))

                    (layout::card("Short URLs", url_table(&state, org, &urls, true)))

                    (layout::card("Invite a Member", invitation_form(org)))
                }
            },
        ),
    ))
}

async fn load_urls(
    state: &AppState,
    session: &AuthorizedSession,
    org: &Organization,
) -> (Vec<ShortUrl>, Option<String>) {
    match state.client.list_urls(&session.token, &org.slug).await {
        Ok(urls) => (urls, None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load short URLs for {}", org.slug);
            (
                Vec::new(),
                Some(e.user_message("Failed to load short URLs. Please refresh the page.")),
            )
        }
    }
}

fn org_header(org: &Organization, subtitle: &str) -> Markup {
    html! {
        div class="md:flex md:items-center md:justify-between" {
            div class="flex-1 min-w-0" {
                h1 class="text-3xl font-bold text-gray-900" { (org.name) }
                p class="mt-2 text-sm text-gray-500" {
                    span class="font-mono" { (org.slug) } " · " (subtitle)
                }
            }
            div class="mt-4 md:mt-0 md:ml-4" {
                (layout::role_badge(org.role))
            }
        }
    }
}

fn stat(label: &str, value: i64) -> Markup {
    html! {
        div class="bg-white overflow-hidden shadow rounded-lg px-4 py-5 sm:p-6" {
            dt class="text-sm font-medium text-gray-500 truncate" { (label) }
            dd class="mt-1 text-3xl font-semibold text-gray-900" { (value) }
        }
    }
}

fn create_url_form(org: &Organization) -> Markup {
    html! {
        form action=(format!("/dashboard/{}/urls", org.slug)) method="POST" class="grid grid-cols-1 gap-4 sm:grid-cols-5" {
            div class="sm:col-span-3" {
                label for="original_url" class="block text-sm font-medium text-gray-700" { "Destination URL" }
                input
                    type="url"
                    id="original_url"
                    name="original_url"
                    required
                    placeholder="https://example.com/landing-page"
                    class="mt-1 block w-full px-3 py-2 border border-gray-300 rounded-md shadow-sm focus:outline-none focus:ring-primary focus:border-primary sm:text-sm";
            }
            div class="sm:col-span-1" {
                label for="slug" class="block text-sm font-medium text-gray-700" { "Custom slug" }
                input
                    type="text"
                    id="slug"
                    name="slug"
                    pattern="[A-Za-z0-9_-]*"
                    maxlength="50"
                    placeholder="optional"
                    class="mt-1 block w-full px-3 py-2 border border-gray-300 rounded-md shadow-sm focus:outline-none focus:ring-primary focus:border-primary sm:text-sm";
            }
            div class="sm:col-span-1 flex items-end" {
                (layout::button("Shorten", "primary", "w-full"))
            }
        }
    }
}

fn url_table(state: &AppState, org: &Organization, urls: &[ShortUrl], can_delete: bool) -> Markup {
    if urls.is_empty() {
        return html! {
            p class="text-sm text-gray-500 text-center py-8" { "No short URLs yet." }
        };
    }

    html! {
        div class="overflow-x-auto" {
            table class="min-w-full divide-y divide-gray-200" {
                thead class="bg-gray-50" {
                    tr {
                        th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider" { "Short link" }
                        th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider" { "Destination" }
                        th class="px-4 py-3 text-right text-xs font-medium text-gray-500 uppercase tracking-wider" { "Clicks" }
                        th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider" { "Created" }
                        @if can_delete {
                            th class="px-4 py-3" {}
                        }
                    }
                }
                tbody class="bg-white divide-y divide-gray-200" {
                    @for url in urls {
                        @let short_link = state.settings.short_link(&org.slug, &url.slug);
                        tr {
                            td class="px-4 py-3 text-sm font-mono" {
                                a href=(short_link) class="text-primary hover:text-green-700" target="_blank" { (short_link) }
                            }
                            td class="px-4 py-3 text-sm text-gray-600 max-w-xs truncate" title=(url.original_url) {
                                (url.original_url)
                            }
                            td class="px-4 py-3 text-sm text-gray-900 text-right" { (url.clicks) }
                            td class="px-4 py-3 text-sm text-gray-500" {
                                @if let Some(created) = &url.created_at {
                                    (display_date(created))
                                }
                            }
                            @if can_delete {
                                td class="px-4 py-3 text-right" {
                                    form
                                        action=(format!("/dashboard/{}/urls/{}/delete", org.slug, url.id))
                                        method="POST"
                                        onsubmit="return confirm('Delete this short URL?');" {
                                        (layout::button("Delete", "danger", ""))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn invitation_form(org: &Organization) -> Markup {
    html! {
        form action=(format!("/dashboard/{}/invitations", org.slug)) method="POST" class="grid grid-cols-1 gap-4 sm:grid-cols-5" {
            div class="sm:col-span-3" {
                label for="invite-email" class="block text-sm font-medium text-gray-700" { "Email" }
                input
                    type="email"
                    id="invite-email"
                    name="email"
                    required
                    placeholder="Invitee email"
                    class="mt-1 block w-full px-3 py-2 border border-gray-300 rounded-md shadow-sm focus:outline-none focus:ring-primary focus:border-primary sm:text-sm";
            }
            div class="sm:col-span-1" {
                label for="invite-role" class="block text-sm font-medium text-gray-700" { "Role" }
                select
                    id="invite-role"
                    name="role"
                    class="mt-1 block w-full px-3 py-2 border border-gray-300 bg-white rounded-md shadow-sm focus:outline-none focus:ring-primary focus:border-primary sm:text-sm" {
                    option value="admin" { "Admin" }
                    option value="editor" { "Editor" }
                    option value="viewer" selected { "Viewer" }
                }
            }
            div class="sm:col-span-1 flex items-end" {
                (layout::button("Send Invitation", "primary", "w-full"))
            }
        }
    }
}

/// Create a short URL in the organization
pub async fn create_url(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Path(slug): Path<String>,
    Form(form): Form<CreateUrlForm>,
) -> Response {
    let org = match find_organization(&session, &slug) {
        Ok(org) => org,
        Err(response) => return response,
    };
    let back = home_path(org);

    if !org.role.can_manage_urls() {
        return notice_redirect(
            &back,
            Notice::UrlCreateFailed,
            Some("You do not have permission to create links in this organization."),
        );
    }

    let form = CreateUrlForm {
        original_url: form.original_url.trim().to_string(),
        slug: form.slug.trim().to_string(),
    };
    if let Err(errors) = form.validate() {
        return notice_redirect(
            &back,
            Notice::UrlCreateFailed,
            Some(&validation_message(&errors)),
        );
    }

    let request = CreateUrlRequest {
        original_url: form.original_url,
        organization_slug: org.slug.clone(),
        slug: form.slug,
    };

    match state.client.create_url(&session.token, &request).await {
        Ok(created) => {
            // Without a custom slug the server picks one, so only its answer is reliable
            let short_link = created
                .short_url
                .filter(|link| !link.is_empty())
                .or_else(|| {
                    (!request.slug.is_empty())
                        .then(|| state.settings.short_link(&org.slug, &request.slug))
                });
            tracing::info!(
                short_link = short_link.as_deref().unwrap_or("-"),
                "Short URL created in {} by {}",
                org.slug,
                session.email()
            );
            notice_redirect(&back, Notice::UrlCreated, short_link.as_deref())
        }
        Err(e) => {
            let message = e.user_message(Notice::UrlCreateFailed.message());
            notice_redirect(&back, Notice::UrlCreateFailed, Some(&message))
        }
    }
}

pub async fn delete_url(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Path((slug, id)): Path<(String, i64)>,
) -> Response {
    let org = match find_organization(&session, &slug) {
        Ok(org) => org,
        Err(response) => return response,
    };
    let back = home_path(org);

    if org.role != Role::Admin {
        return notice_redirect(
            &back,
            Notice::UrlDeleteFailed,
            Some("Only organization admins can delete short URLs."),
        );
    }

    match state.client.delete_url(&session.token, id).await {
        Ok(()) => {
            tracing::info!("Short URL {} in {} deleted by {}", id, org.slug, session.email());
            notice_redirect(&back, Notice::UrlDeleted, None)
        }
        Err(e) => {
            let message = e.user_message(Notice::UrlDeleteFailed.message());
            notice_redirect(&back, Notice::UrlDeleteFailed, Some(&message))
        }
    }
}

pub async fn send_invitation(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Path(slug): Path<String>,
    Form(form): Form<InvitationForm>,
) -> Response {
    let org = match find_organization(&session, &slug) {
        Ok(org) => org,
        Err(response) => return response,
    };
    let back = home_path(org);

    if !org.role.can_invite() {
        return notice_redirect(
            &back,
            Notice::InvitationSendFailed,
            Some("Only organization admins can invite members."),
        );
    }

    let form = InvitationForm {
        email: form.email.trim().to_string(),
        role: form.role,
    };
    if let Err(errors) = form.validate() {
        return notice_redirect(
            &back,
            Notice::InvitationSendFailed,
            Some(&validation_message(&errors)),
        );
    }

    let request = SendInvitationRequest {
        email: form.email,
        role: form.role,
        organization: org.slug.clone(),
    };

    match state.client.send_invitation(&session.token, &request).await {
        Ok(()) => {
            tracing::info!("Invitation to {} sent for {}", request.email, org.slug);
            let detail = format!("{} was invited as {}", request.email, request.role);
            notice_redirect(&back, Notice::InvitationSent, Some(&detail))
        }
        Err(e) => {
            let message = e.user_message(Notice::InvitationSendFailed.message());
            notice_redirect(&back, Notice::InvitationSendFailed, Some(&message))
        }
    }
}

/// Organizations where the user is a member but not an admin
pub async fn member_list(
    State(state): State<AppState>,
    session: AuthorizedSession,
) -> Markup {
    let (organizations, error) = match state.client.memberships(&session.token).await {
        Ok(organizations) => (organizations, None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load memberships for {}", session.email());
            (
                Vec::new(),
                Some(e.user_message("Failed to load organizations. Please refresh the page.")),
            )
        }
    };

    layout::base(
        "Member Organizations",
        layout::app_shell(
            session.email(),
            "members",
            html! {
                div class="space-y-6" {
                    div {
                        h1 class="text-3xl font-bold text-gray-900" { "Member Organizations" }
                        p class="mt-2 text-sm text-gray-500" {
                            "Organizations you belong to as an editor or viewer"
                        }
                    }

                    @if let Some(error) = &error {
                        (layout::alert(error, "error"))
                    }

                    @if organizations.is_empty() && error.is_none() {
                        p class="text-sm text-gray-500" {
                            "You are not a member of any other organization yet."
                        }
                    } @else {
                        div class="grid grid-cols-1 gap-6 sm:grid-cols-2 lg:grid-cols-3" {
                            @for org in &organizations {
                                div class="bg-white overflow-hidden shadow rounded-lg p-6" {
                                    div class="flex items-center justify-between" {
                                        h3 class="text-lg font-medium text-gray-900 truncate" { (org.name) }
                                        (layout::role_badge(org.role))
                                    }
                                    @if let Some(joined) = &org.joined_at {
                                        p class="mt-1 text-xs text-gray-400" { "Joined " (display_date(joined)) }
                                    }
                                    div class="mt-6" {
                                        a
                                            href=(format!("/member/{}", org.slug))
                                            class="text-primary hover:text-green-700 text-sm font-medium" {
                                            "View links →"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            },
        ),
    )
}

/// Member view of one organization: read-only for viewers, editors may add links
pub async fn member_show(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Path(slug): Path<String>,
    Query(notice): Query<NoticeQuery>,
) -> Result<Markup, Response> {
    let org = find_organization(&session, &slug)?;
    let (urls, load_error) = load_urls(&state, &session, org).await;

    let subtitle = if org.role.can_manage_urls() {
        "Member view"
    } else {
        "Member view (read-only)"
    };

    Ok(layout::base(
        &org.name,
        layout::app_shell(
            session.email(),
            "members",
            html! {
                div class="space-y-6" {
                    (org_header(org, subtitle))

                    (notice.render())
                    @if let Some(error) = &load_error {
                        (layout::alert(error, "error"))
                    }

                    @if org.role.can_manage_urls() {
                        (layout::card("Create Short URL", create_url_form(org)))
                    }

                    (layout::card("Organization Short URLs", url_table(&state, org, &urls, false)))
                }
            },
        ),
    ))
}
