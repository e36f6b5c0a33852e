// src/models/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::lead::{HistoryItem, MessageRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChatStep {
    Location,
    Purpose,
    Size,
    SizeCustom,
    Timeline,
    Contact,
    Submitted,
}

/// The four questionnaire answers collected before the contact step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionnaireAnswers {
    pub location: String,
    pub purpose: String,
    pub size: String,
    pub timeline: String,
}

/// Dialogue state. Each variant carries exactly the answers collected so far,
/// so a `Submitted` session can only exist with the full answer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ChatState {
    Location,
    Purpose {
        location: String,
    },
    Size {
        location: String,
        purpose: String,
    },
    SizeCustom {
        location: String,
        purpose: String,
    },
    Timeline {
        location: String,
        purpose: String,
        size: String,
    },
    Contact {
        answers: QuestionnaireAnswers,
        /// Last contact the visitor entered; kept when a submission fails or
        /// when contact details are reopened for editing.
        #[serde(default)]
        contact: Option<String>,
    },
    Submitted {
        answers: QuestionnaireAnswers,
        contact: String,
        submitted_at: DateTime<Utc>,
    },
}

impl ChatState {
    pub fn step(&self) -> ChatStep {
        match self {
            ChatState::Location => ChatStep::Location,
            ChatState::Purpose { .. } => ChatStep::Purpose,
            ChatState::Size { .. } => ChatStep::Size,
            ChatState::SizeCustom { .. } => ChatStep::SizeCustom,
            ChatState::Timeline { .. } => ChatStep::Timeline,
            ChatState::Contact { .. } => ChatStep::Contact,
            ChatState::Submitted { .. } => ChatStep::Submitted,
        }
    }

    /// Flat view of the answers, one optional field per step.
    pub fn answers(&self) -> ChatAnswers {
        match self {
            ChatState::Location => ChatAnswers::default(),
            ChatState::Purpose { location } => ChatAnswers {
                location: Some(location.clone()),
                ..Default::default()
            },
            ChatState::Size { location, purpose } | ChatState::SizeCustom { location, purpose } => {
                ChatAnswers {
                    location: Some(location.clone()),
                    purpose: Some(purpose.clone()),
                    ..Default::default()
                }
            }
            ChatState::Timeline { location, purpose, size } => ChatAnswers {
                location: Some(location.clone()),
                purpose: Some(purpose.clone()),
                size: Some(size.clone()),
                ..Default::default()
            },
            ChatState::Contact { answers, contact } => ChatAnswers::from_questionnaire(answers, contact.clone()),
            ChatState::Submitted { answers, contact, .. } => {
                ChatAnswers::from_questionnaire(answers, Some(contact.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatAnswers {
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub size: Option<String>,
    pub timeline: Option<String>,
    pub contact: Option<String>,
}

impl ChatAnswers {
    fn from_questionnaire(answers: &QuestionnaireAnswers, contact: Option<String>) -> Self {
        Self {
            location: Some(answers.location.clone()),
            purpose: Some(answers.purpose.clone()),
            size: Some(answers.size.clone()),
            timeline: Some(answers.timeline.clone()),
            contact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Everything persisted for one visitor's chat widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub state: ChatState,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn step(&self) -> ChatStep {
        self.state.step()
    }

    pub fn push(&mut self, role: MessageRole, text: impl Into<String>, at: DateTime<Utc>) {
        self.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            at,
        });
        self.updated_at = at;
    }

    /// The last `n` transcript entries, oldest first.
    pub fn history_tail(&self, n: usize) -> Vec<HistoryItem> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..]
            .iter()
            .map(|m| HistoryItem {
                role: m.role,
                text: m.text.clone(),
            })
            .collect()
    }
}

// --- Events ---

/// Why a lead submission did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitFailure {
    RateLimited,
    Rejected,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Answer(String),
    StartOver,
    EditContact,
    SubmissionSucceeded { at: DateTime<Utc> },
    SubmissionFailed(SubmitFailure),
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Answer(_) => "answer",
            ChatEvent::StartOver => "start_over",
            ChatEvent::EditContact => "edit_contact",
            ChatEvent::SubmissionSucceeded { .. } => "submission_succeeded",
            ChatEvent::SubmissionFailed(_) => "submission_failed",
        }
    }
}

// --- Views ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionView {
    pub session_id: Uuid,
    pub storage_key: String,
    pub step: ChatStep,
    pub prompt: String,
    pub options: Vec<String>,
    pub answers: ChatAnswers,
    pub messages: Vec<ChatMessage>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
