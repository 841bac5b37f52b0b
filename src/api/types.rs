// Entity models for the CRM backend
//
// The backend speaks camelCase JSON. Only the fields the tables render are
// modeled here; unknown fields are ignored on decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user, as returned by `/api/auth/me` and login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /api/auth/login` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
}

/// A dashboard insight row, e.g. "open deals: 12"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub label: String,
    pub value: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_decodes_camel_case() {
        let lead: Lead = serde_json::from_value(json!({
            "id": "l-1",
            "name": "Ada",
            "createdAt": "2026-02-01T10:00:00Z",
            "pluginField": "ignored"
        }))
        .unwrap();
        assert_eq!(lead.name, "Ada");
        assert!(lead.created_at.is_some());
        assert!(lead.company.is_none());
    }

    #[test]
    fn test_deal_optional_fields_default() {
        let deal: Deal = serde_json::from_value(json!({
            "id": "d-1",
            "title": "Renewal"
        }))
        .unwrap();
        assert!(deal.value.is_none());
        assert!(deal.stage.is_none());
    }
}
