use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{html, Markup};
use validator::Validate;

use crate::auth::AuthorizedSession;
use crate::models::{CreateUrlRequest, Organization};
use crate::AppState;

use super::components::layout;
use super::organizations::CreateUrlForm;
use super::validation_message;

/// Upper bound on rows accepted from one file
pub const MAX_BULK_ROWS: usize = 1000;

/// One data line of an uploaded CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRow {
    /// 1-based line number in the file
    pub line: usize,
    pub original_url: String,
    pub slug: String,
}

#[derive(Debug, Default)]
pub struct BulkReport {
    pub created: Vec<(usize, String)>,
    pub failed: Vec<(usize, String, String)>,
}

/// Parse `original_url,slug` lines. A header row and blank lines are skipped,
/// the slug column is optional.
pub fn parse_csv(content: &str) -> Result<Vec<BulkRow>, String> {
    let mut rows = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let mut columns = split_columns(line).into_iter();
        let original_url = columns.next().unwrap_or_default();
        let slug = columns.next().unwrap_or_default();

        if rows.is_empty() && is_header(&original_url) {
            continue;
        }

        rows.push(BulkRow {
            line: index + 1,
            original_url,
            slug,
        });

        if rows.len() > MAX_BULK_ROWS {
            return Err(format!(
                "A file may contain at most {} URLs.",
                MAX_BULK_ROWS
            ));
        }
    }

    if rows.is_empty() {
        return Err("The file does not contain any URLs.".to_string());
    }

    Ok(rows)
}

/// Split one CSV line on the commas outside quotes; `""` inside quotes is a literal quote
fn split_columns(line: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => columns.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    columns.push(current.trim().to_string());

    columns
}

fn is_header(first_column: &str) -> bool {
    matches!(
        first_column.to_ascii_lowercase().as_str(),
        "original_url" | "url" | "destination"
    )
}

/// Bulk upload form
pub async fn page(session: AuthorizedSession) -> Markup {
    upload_view(&session, None, None)
}

fn upload_view(session: &AuthorizedSession, error: Option<&str>, report: Option<&BulkReport>) -> Markup {
    let organizations: Vec<&Organization> = session.dashboard.admin_organizations().collect();

    layout::base(
        "Bulk Upload",
        layout::app_shell(
            session.email(),
            "bulk",
            html! {
                div class="space-y-6" {
                    div {
                        h1 class="text-3xl font-bold text-gray-900" { "Bulk Upload" }
                        p class="mt-2 text-sm text-gray-500" {
                            "Upload a CSV file to create multiple short URLs"
                        }
                    }

                    @if let Some(report) = report {
                        (report_view(report))
                    }

                    @if let Some(error) = error {
                        (layout::alert(error, "error"))
                    }

                    (layout::alert(
                        &format!(
                            "One URL per line as original_url,slug. The slug column and a header row are optional. Maximum {} URLs per upload.",
                            MAX_BULK_ROWS
                        ),
                        "info",
                    ))

                    (layout::card("Upload File", html! {
                        form action="/bulk-upload" method="POST" enctype="multipart/form-data" class="space-y-6" {
                            div {
                                label for="organization" class="block text-sm font-medium text-gray-700" { "Organization" }
                                select
                                    id="organization"
                                    name="organization"
                                    class="mt-1 block w-full px-3 py-2 border border-gray-300 bg-white rounded-md shadow-sm focus:outline-none focus:ring-primary focus:border-primary sm:text-sm" {
                                    option value="" { "Select an organization" }
                                    @for org in &organizations {
                                        option value=(org.slug) { (org.name) }
                                    }
                                }
                            }
                            div {
                                label for="file" class="block text-sm font-medium text-gray-700" { "File" }
                                input
                                    type="file"
                                    id="file"
                                    name="file"
                                    accept=".csv,text/csv"
                                    class="mt-1 block w-full text-sm text-gray-700";
                            }
                            (layout::button("Upload", "primary", ""))
                        }
                    }))
                }
            },
        ),
    )
}

fn report_view(report: &BulkReport) -> Markup {
    let kind = if report.failed.is_empty() { "success" } else { "warning" };
    let summary = format!(
        "{} short URL(s) created, {} failed",
        report.created.len(),
        report.failed.len()
    );

    html! {
        (layout::alert(&summary, kind))
        @if !report.created.is_empty() {
            (layout::card("Created", html! {
                ul class="text-sm font-mono space-y-1" {
                    @for (line, link) in &report.created {
                        li { span class="text-gray-400" { "line " (line) ": " } (link) }
                    }
                }
            }))
        }
        @if !report.failed.is_empty() {
            (layout::card("Failed", html! {
                ul class="text-sm space-y-1" {
                    @for (line, url, message) in &report.failed {
                        li {
                            span class="text-gray-400" { "line " (line) ": " }
                            span class="font-mono" { (url) }
                            " - " span class="text-red-700" { (message) }
                        }
                    }
                }
            }))
        }
    }
}

/// Handle the upload: one create call per row, in file order
pub async fn submit(
    State(state): State<AppState>,
    session: AuthorizedSession,
    mut multipart: Multipart,
) -> Response {
    let mut organization = String::new();
    let mut content: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Malformed bulk upload form: {}", e);
                return form_error(&session, "The upload could not be read. Please try again.");
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "organization" => {
                organization = field.text().await.unwrap_or_default().trim().to_string();
            }
            "file" => {
                let has_name = field.file_name().is_some_and(|name| !name.is_empty());
                match field.bytes().await {
                    Ok(bytes) if has_name || !bytes.is_empty() => {
                        content = Some(String::from_utf8_lossy(&bytes).into_owned());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("Failed to read uploaded file: {}", e);
                        return form_error(&session, "Failed to read the uploaded file.");
                    }
                }
            }
            _ => {}
        }
    }

    let Some(org) = session
        .dashboard
        .admin_organizations()
        .find(|org| !organization.is_empty() && org.slug == organization)
    else {
        return form_error(&session, "Please select an organization");
    };

    let Some(content) = content else {
        return form_error(&session, "Please select a file");
    };

    let rows = match parse_csv(&content) {
        Ok(rows) => rows,
        Err(message) => return form_error(&session, &message),
    };

    let report = create_all(&state, &session.token, org, rows).await;

    tracing::info!(
        organization = %org.slug,
        created = report.created.len(),
        failed = report.failed.len(),
        "Bulk upload by {} finished",
        session.email()
    );

    upload_view(&session, None, Some(&report)).into_response()
}

async fn create_all(
    state: &AppState,
    token: &str,
    org: &Organization,
    rows: Vec<BulkRow>,
) -> BulkReport {
    let mut report = BulkReport::default();

    for row in rows {
        let form = CreateUrlForm {
            original_url: row.original_url,
            slug: row.slug,
        };
        if let Err(errors) = form.validate() {
            report
                .failed
                .push((row.line, form.original_url, validation_message(&errors)));
            continue;
        }

        let request = CreateUrlRequest {
            original_url: form.original_url,
            organization_slug: org.slug.clone(),
            slug: form.slug,
        };

        match state.client.create_url(token, &request).await {
            Ok(created) => {
                let link = created
                    .short_url
                    .filter(|link| !link.is_empty())
                    .unwrap_or_else(|| {
                        if request.slug.is_empty() {
                            format!("{} (slug assigned by server)", request.original_url)
                        } else {
                            state.settings.short_link(&org.slug, &request.slug)
                        }
                    });
                report.created.push((row.line, link));
            }
            Err(e) => {
                let message = e.user_message("Failed to create short URL");
                report.failed.push((row.line, request.original_url, message));
            }
        }
    }

    report
}

fn form_error(session: &AuthorizedSession, message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        upload_view(session, Some(message), None),
    )
        .into_response()
}
