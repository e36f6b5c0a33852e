// src/models/lead.rs

use std::{fmt, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Minimum digits for a phone number to count as a contact.
pub const PHONE_DIGITS_MIN: usize = 10;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

// Maps CREATE TYPE lead_source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Chat,
    Form,
}

// Maps CREATE TYPE lead_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    InProgress,
    Done,
}

// --- CONTACT ---

/// A contact that passed the minimal format check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    /// National format, `+7XXXXXXXXXX`, or `+<digits>` for longer numbers.
    Phone(String),
    Email(String),
}

impl Contact {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.contains('@') && EMAIL_RE.is_match(raw) {
            return Some(Contact::Email(raw.to_lowercase()));
        }

        normalize_phone(raw).map(Contact::Phone)
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contact::Phone(p) => f.write_str(p),
            Contact::Email(e) => f.write_str(e),
        }
    }
}

/// Keeps the digits only. Ten digits are a national number; eleven starting
/// with 7 or 8 carry the trunk prefix; up to fifteen are kept as international.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        n if n < PHONE_DIGITS_MIN => None,
        10 => Some(format!("+7{digits}")),
        11 if digits.starts_with('7') || digits.starts_with('8') => Some(format!("+7{}", &digits[1..])),
        n if n <= 15 => Some(format!("+{digits}")),
        _ => None,
    }
}

// --- PAYLOADS ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryItem {
    pub role: MessageRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadSource {
    ChatWidget,
}

/// Body of `POST /api/lead`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadPayload {
    #[serde(default)]
    #[schema(example = "+7 916 123-45-67")]
    pub contact: String,
    #[schema(example = "На улице")]
    pub location: Option<String>,
    #[schema(example = "Реклама")]
    pub purpose: Option<String>,
    #[schema(example = "5–20 м²")]
    pub size: Option<String>,
    #[schema(example = "1–3 месяца")]
    pub timeline: Option<String>,
    /// Malformed entries are dropped rather than rejecting the lead.
    #[schema(value_type = Option<Vec<HistoryItem>>)]
    pub history: Option<Vec<Value>>,
    pub page_url: Option<String>,
    pub page_title: Option<String>,
    pub source: Option<PayloadSource>,
}

impl LeadPayload {
    pub fn valid_history(&self) -> Vec<HistoryItem> {
        self.history
            .iter()
            .flatten()
            .filter_map(|item| serde_json::from_value::<HistoryItem>(item.clone()).ok())
            .collect()
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Поле обязательно для заполнения.".into());
        return Err(err);
    }
    Ok(())
}

/// Body of `POST /api/request` (form-encoded).
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct RequestFormPayload {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "Введите имя."))]
    #[schema(example = "Мария")]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Укажите корректный email."))]
    #[schema(example = "maria@example.ru")]
    pub email: String,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default, rename = "productName")]
    pub product_name: Option<String>,

    #[serde(default, rename = "productId")]
    pub product_id: Option<String>,

    /// Checkbox value; must be `on`.
    #[serde(default)]
    pub consent: Option<String>,
}

impl RequestFormPayload {
    pub fn has_consent(&self) -> bool {
        self.consent.as_deref() == Some("on")
    }

    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            comment: self.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            product_name: self.product_name.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            product_id: self.product_id.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            consent: self.consent,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLeadStatusPayload {
    pub status: LeadStatus,
}

// --- STORED LEAD ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub message: String,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLead {
    pub name: String,
    pub contact: String,
    pub message: String,
    pub source: LeadSource,
}

// --- RESPONSES ---

#[derive(Debug, Serialize, ToSchema)]
pub struct LeadResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Integrations {
    pub smtp_ready: bool,
    pub telegram_ready: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestResponse {
    pub ok: bool,
    pub integrations: Integrations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_is_normalized_to_national_format() {
        assert_eq!(normalize_phone("8 (916) 123-45-67").as_deref(), Some("+79161234567"));
        assert_eq!(normalize_phone("+7 916 123 45 67").as_deref(), Some("+79161234567"));
        assert_eq!(normalize_phone("9161234567").as_deref(), Some("+79161234567"));
        assert_eq!(normalize_phone("123-45"), None);
    }

    #[test]
    fn contact_accepts_phone_or_email() {
        assert_eq!(
            Contact::parse(" Sales@Example.ru "),
            Some(Contact::Email("sales@example.ru".into()))
        );
        assert_eq!(Contact::parse("not@mail"), None);
        assert_eq!(Contact::parse("   "), None);
        assert_eq!(
            Contact::parse("звоните 8-916-123-45-67").map(|c| c.to_string()).as_deref(),
            Some("+79161234567")
        );
    }

    #[test]
    fn phone_is_found_next_to_a_broken_email() {
        assert_eq!(
            Contact::parse("тел 89161234567, почта a@b"),
            Some(Contact::Phone("+79161234567".into()))
        );
        assert_eq!(Contact::parse("a@b, 123"), None);
    }

    #[test]
    fn malformed_history_entries_are_dropped() {
        let payload: LeadPayload = serde_json::from_value(serde_json::json!({
            "contact": "+79161234567",
            "history": [
                { "role": "user", "text": "Нужен экран" },
                { "role": "robot", "text": "??" },
                "garbage",
                { "role": "bot", "text": "Где установка?" }
            ]
        }))
        .unwrap();

        let history = payload.valid_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, MessageRole::Bot);
    }

    #[test]
    fn request_form_requires_name_and_valid_email() {
        let form = RequestFormPayload {
            name: "  ".into(),
            email: "broken".into(),
            consent: Some("on".into()),
            ..Default::default()
        }
        .trimmed();

        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(form.has_consent());
    }
}
