use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Organization role as reported by the shortener API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Parse a role, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn can_manage_urls(self) -> bool {
        matches!(self, Role::Admin | Role::Editor)
    }

    pub fn can_invite(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The API is inconsistent about casing ("admin" vs "EDITOR"); unknown roles get least privilege
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Role::parse(&value).unwrap_or_else(|| {
            tracing::warn!("Unknown organization role {:?}, treating as viewer", value);
            Role::Viewer
        }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub role: Role,
    #[serde(default)]
    pub joined_at: Option<String>,
}

/// Payload of `GET /api/dashboard/`, also the session validity probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    #[serde(default)]
    pub message: String,
    pub email: String,
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

impl DashboardResponse {
    pub fn organization(&self, slug: &str) -> Option<&Organization> {
        self.organizations.iter().find(|org| org.slug == slug)
    }

    pub fn admin_organizations(&self) -> impl Iterator<Item = &Organization> {
        self.organizations
            .iter()
            .filter(|org| org.role == Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortUrl {
    pub id: i64,
    pub original_url: String,
    pub slug: String,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub token: String,
    pub organization_name: String,
    pub role: Role,
    pub email: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.status.eq_ignore_ascii_case("pending")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUrlRequest {
    pub original_url: String,
    pub organization_slug: String,
    pub slug: String,
}

/// Response of `POST /api/urls/create/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedUrl {
    #[serde(default)]
    pub short_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedUrl {
    pub original_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendInvitationRequest {
    pub email: String,
    pub role: Role,
    pub organization: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyEmailRequest {
    pub uid: String,
    pub token: String,
}

/// Generic `{ "message": ... }` body returned by the user endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Render an API timestamp as "Mar 10, 2024", keeping the raw value if it does not parse
pub fn display_date(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%b %d, %Y").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%b %d, %Y").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ignores_case() {
        let org: Organization = serde_json::from_str(
            r#"{"id": 3, "name": "E-commerce Platform", "slug": "ecommerce", "role": "EDITOR"}"#,
        )
        .unwrap();

        assert_eq!(org.role, Role::Editor);
        assert!(org.joined_at.is_none());
    }

    #[test]
    fn test_unknown_role_is_viewer() {
        let org: Organization =
            serde_json::from_str(r#"{"id": 1, "name": "Acme", "slug": "acme", "role": "owner"}"#)
                .unwrap();

        assert_eq!(org.role, Role::Viewer);
        assert!(!org.role.can_manage_urls());
    }

    #[test]
    fn test_admin_organizations_filter() {
        let dashboard: DashboardResponse = serde_json::from_value(serde_json::json!({
            "message": "Welcome",
            "email": "ada@example.com",
            "organizations": [
                {"id": 1, "name": "Acme", "slug": "acme", "role": "admin"},
                {"id": 2, "name": "Globex", "slug": "globex", "role": "viewer"}
            ]
        }))
        .unwrap();

        let admin: Vec<&str> = dashboard
            .admin_organizations()
            .map(|org| org.slug.as_str())
            .collect();

        assert_eq!(admin, vec!["acme"]);
        assert_eq!(dashboard.organization("globex").map(|o| o.id), Some(2));
        assert!(dashboard.organization("initech").is_none());
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("2024-03-10T12:30:00Z"), "Mar 10, 2024");
        assert_eq!(display_date("2024-04-05T08:00:00.123456"), "Apr 05, 2024");
        assert_eq!(display_date("yesterday"), "yesterday");
    }
}
