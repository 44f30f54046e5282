use axum::{
    extract::{Form, Query, State},
    response::Response,
};
use maud::{html, Markup};
use serde::Deserialize;
use validator::Validate;

use crate::auth::AuthorizedSession;
use crate::models::{display_date, Invitation, Organization};
use crate::AppState;

use super::components::layout;
use super::{notice_redirect, validation_message, Notice, NoticeQuery};

/// Form data for creating organization
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationForm {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Organization name must be between 1 and 100 characters."
    ))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationForm {
    pub token: String,
}

/// Dashboard home: admin organizations and pending invitations
pub async fn show(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Query(notice): Query<NoticeQuery>,
) -> Markup {
    let (invitations, invitations_error) = match state.client.my_invitations(&session.token).await
    {
        Ok(invitations) => (
            invitations
                .into_iter()
                .filter(Invitation::is_pending)
                .collect::<Vec<_>>(),
            false,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load invitations for {}", session.email());
            (Vec::new(), true)
        }
    };

    let organizations: Vec<&Organization> = session.dashboard.admin_organizations().collect();

    layout::base(
        "Dashboard",
        layout::app_shell(
            session.email(),
            "dashboard",
            html! {
                div class="space-y-6" {
                    div {
                        h1 class="text-3xl font-bold text-gray-900" {
                            (session.dashboard.message)
                        }
                        p class="mt-2 text-sm text-gray-500" {
                            "Signed in as " (session.email())
                        }
                    }

                    (notice.render())

                    @if !invitations.is_empty() || invitations_error {
                        (layout::card("Pending Invitations", html! {
                            @if invitations_error {
                                (layout::alert("Could not load your invitations right now.", "warning"))
                            }
                            ul class="divide-y divide-gray-200" {
                                @for invitation in &invitations {
                                    (invitation_row(invitation))
                                }
                            }
                        }))
                    }

                    div {
                        h2 class="text-xl font-semibold text-gray-900 mb-4" { "My Organizations" }
                        @if organizations.is_empty() {
                            p class="text-sm text-gray-500" {
                                "You do not administer any organization yet. Create one below."
                            }
                        } @else {
                            div class="grid grid-cols-1 gap-6 sm:grid-cols-2 lg:grid-cols-3" {
                                @for org in &organizations {
                                    (organization_card(org))
                                }
                            }
                        }
                    }

                    (layout::card("Create Organization", html! {
                        form action="/organizations/create" method="POST" class="flex gap-3" {
                            input
                                type="text"
                                name="name"
                                required
                                maxlength="100"
                                placeholder="Organization name"
                                class="flex-1 px-3 py-2 border border-gray-300 rounded-md shadow-sm focus:outline-none focus:ring-primary focus:border-primary sm:text-sm";
                            (layout::button("Create", "primary", ""))
                        }
                    }))
                }
            },
        ),
    )
}

fn organization_card(org: &Organization) -> Markup {
    html! {
        div class="bg-white overflow-hidden shadow rounded-lg hover:shadow-md transition-shadow" {
            div class="p-6" {
                div class="flex items-center justify-between" {
                    h3 class="text-lg font-medium text-gray-900 truncate" { (org.name) }
                    (layout::role_badge(org.role))
                }
                p class="mt-1 text-sm text-gray-500" {
                    "Slug: " span class="font-mono" { (org.slug) }
                }
                @if let Some(joined) = &org.joined_at {
                    p class="mt-1 text-xs text-gray-400" { "Joined " (display_date(joined)) }
                }
                div class="mt-6" {
                    a
                        href=(format!("/dashboard/{}", org.slug))
                        class="text-primary hover:text-green-700 text-sm font-medium" {
                        "Manage links →"
                    }
                }
            }
        }
    }
}

fn invitation_row(invitation: &Invitation) -> Markup {
    html! {
        li class="py-4 flex items-center justify-between" {
            div {
                p class="text-sm font-medium text-gray-900" { (invitation.organization_name) }
                p class="text-sm text-gray-500" {
                    "Invited as " (layout::role_badge(invitation.role))
                    @if let Some(created) = &invitation.created_at {
                        " on " (display_date(created))
                    }
                }
            }
            form action="/invitations/accept" method="POST" {
                input type="hidden" name="token" value=(invitation.token);
                (layout::button("Accept", "primary", ""))
            }
        }
    }
}

/// Create a new organization owned by the current user
pub async fn create_organization(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Form(form): Form<CreateOrganizationForm>,
) -> Response {
    let form = CreateOrganizationForm {
        name: form.name.trim().to_string(),
    };

    if let Err(errors) = form.validate() {
        return notice_redirect(
            "/dashboard",
            Notice::OrgCreateFailed,
            Some(&validation_message(&errors)),
        );
    }

    match state
        .client
        .create_organization(&session.token, &form.name)
        .await
    {
        Ok(()) => {
            tracing::info!("Organization {:?} created by {}", form.name, session.email());
            notice_redirect("/dashboard", Notice::OrgCreated, Some(&form.name))
        }
        Err(e) => {
            let message = e.user_message(Notice::OrgCreateFailed.message());
            notice_redirect("/dashboard", Notice::OrgCreateFailed, Some(&message))
        }
    }
}

pub async fn accept_invitation(
    State(state): State<AppState>,
    session: AuthorizedSession,
    Form(form): Form<AcceptInvitationForm>,
) -> Response {
    match state
        .client
        .accept_invitation(&session.token, &form.token)
        .await
    {
        Ok(()) => {
            tracing::info!("Invitation accepted by {}", session.email());
            notice_redirect("/dashboard", Notice::InvitationAccepted, None)
        }
        Err(e) => {
            let message = e.user_message(Notice::InvitationAcceptFailed.message());
            notice_redirect("/dashboard", Notice::InvitationAcceptFailed, Some(&message))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::helpers::{
        body_string, get_with_session, location, post_form, sample_dashboard, test_app, StubApi,
    };
    use axum::{
        extract::Json as ExtractJson,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn api() -> Router {
        Router::new()
            .route("/api/dashboard/", get(|| async { Json(sample_dashboard()) }))
            .route(
                "/api/invitations/my/",
                get(|| async {
                    Json(json!([
                        {"id": 5, "token": "inv-pending", "organization_name": "Initech", "role": "viewer",
                         "email": "ada@example.com", "status": "pending", "created_at": "2024-06-01T00:00:00Z"},
                        {"id": 6, "token": "inv-done", "organization_name": "Umbrella", "role": "editor",
                         "email": "ada@example.com", "status": "accepted"}
                    ]))
                }),
            )
    }

    #[tokio::test]
    async fn test_unknown_notice_is_ignored() {
        let stub = StubApi::spawn(api()).await;

        let response = test_app(&stub)
            .oneshot(get_with_session("/dashboard?notice=bogus&detail=leftover-detail", "tok"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_string(response).await.contains("leftover-detail"));
    }

    #[tokio::test]
    async fn test_dashboard_lists_admin_orgs_and_pending_invitations() {
        let stub = StubApi::spawn(api()).await;

        let response = test_app(&stub)
            .oneshot(get_with_session("/dashboard", "tok"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;

        assert!(body.contains("Welcome back, Ada!"));
        assert!(body.contains("Acme Corp"));
        assert!(body.contains("/dashboard/acme"));
        // Globex is an editor membership, not listed under My Organizations
        assert!(!body.contains("/dashboard/globex"));
        assert!(body.contains("Initech"));
        assert!(body.contains("inv-pending"));
        assert!(!body.contains("Umbrella"));
    }

    #[tokio::test]
    async fn test_dashboard_survives_invitation_failure() {
        let stub = StubApi::spawn(
            Router::new()
                .route("/api/dashboard/", get(|| async { Json(sample_dashboard()) }))
                .route(
                    "/api/invitations/my/",
                    get(|| async { StatusCode::BAD_GATEWAY }),
                ),
        )
        .await;

        let response = test_app(&stub)
            .oneshot(get_with_session("/dashboard", "tok"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response)
            .await
            .contains("Could not load your invitations"));
    }

    #[tokio::test]
    async fn test_create_organization_posts_name() {
        let stub = StubApi::spawn(api().route(
            "/api/organizations/create/",
            post(|ExtractJson(body): ExtractJson<Value>| async move {
                if body["name"] == "Initech" {
                    (StatusCode::CREATED, Json(json!({"id": 3})))
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({"message": "bad name"})))
                }
            }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(post_form("/organizations/create", Some("tok"), "name=+Initech+"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/dashboard?notice=org_created&detail=Initech"
        );
    }

    #[tokio::test]
    async fn test_blank_organization_name_never_reaches_api() {
        let stub = StubApi::spawn(api()).await;

        let response = test_app(&stub)
            .oneshot(post_form("/organizations/create", Some("tok"), "name=+++"))
            .await
            .unwrap();

        assert!(location(&response).starts_with("/dashboard?notice=org_create_failed"));
        assert_eq!(stub.hit_count("/api/organizations/create/"), 0);
    }

    #[tokio::test]
    async fn test_accept_invitation_failure_carries_server_message() {
        let stub = StubApi::spawn(api().route(
            "/api/invitations/accept/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"message": "Invitation expired"})),
                )
            }),
        ))
        .await;

        let response = test_app(&stub)
            .oneshot(post_form("/invitations/accept", Some("tok"), "token=inv-pending"))
            .await
            .unwrap();

        assert_eq!(
            location(&response),
            "/dashboard?notice=invitation_accept_failed&detail=Invitation%20expired"
        );
    }
}
