// src/services/chat_flow.rs
//
// The scripted questionnaire behind the chat widget:
//
//   location -> purpose -> size (-> size_custom) -> timeline -> contact -> submitted
//
// `transition` is a pure function of (state, event); the service around it
// owns persistence and lead submission.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    chat::{
        ChatEvent, ChatSession, ChatSessionView, ChatState, ChatStep, QuestionnaireAnswers,
        SubmitFailure,
    },
    lead::{Contact, MessageRole},
};

/// Quick reply that switches the size step to free-text entry.
pub const SIZE_CUSTOM_OPTION: &str = "Указать точный размер";
pub const START_OVER_OPTION: &str = "Начать заново";
pub const EDIT_CONTACT_OPTION: &str = "Изменить контакты";

/// Transcript entries attached to a submitted lead.
pub const HISTORY_TAIL: usize = 6;

const WELCOME: &str =
    "Привет! Я Алсу, онлайн-консультант Sapphire LED. Помогу подобрать экран и передам запрос инженеру.";
const SUBMITTED_REPLY: &str = "Заявка отправлена. Инженер свяжется с вами.";
const INVALID_CONTACT_REPLY: &str = "Укажите телефон (минимум 10 цифр) или e-mail.";
const RATE_LIMITED_REPLY: &str = "Слишком много запросов. Попробуйте позже.";
const RETRY_REPLY: &str = "Не удалось отправить, попробуйте ещё раз.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("'{event}' is not allowed at step {step:?}")]
    InvalidTransition { step: ChatStep, event: &'static str },
}

/// Everything a step needs to be shown to the visitor.
pub fn prompt(step: ChatStep) -> &'static str {
    match step {
        ChatStep::Location => "Где планируется установка экрана?",
        ChatStep::Purpose => "Для чего нужен экран?",
        ChatStep::Size => "Какой размер экрана нужен?",
        ChatStep::SizeCustom => "Напишите размер экрана, например 4×2 м.",
        ChatStep::Timeline => "Когда планируете запуск?",
        ChatStep::Contact => "Оставьте телефон или e-mail — инженер подготовит предложение.",
        ChatStep::Submitted => "Заявка уже у инженера. Можно начать заново или изменить контакты.",
    }
}

pub fn options(step: ChatStep) -> &'static [&'static str] {
    match step {
        ChatStep::Location => &["На улице", "В помещении", "Пока не знаю"],
        ChatStep::Purpose => &["Реклама", "Мероприятия и сцены", "Информирование", "Интерьер и ритейл"],
        ChatStep::Size => &["До 5 м²", "5–20 м²", "Более 20 м²", SIZE_CUSTOM_OPTION],
        ChatStep::SizeCustom => &[],
        ChatStep::Timeline => &["В течение месяца", "1–3 месяца", "Позже", "Пока изучаю"],
        ChatStep::Contact => &[],
        ChatStep::Submitted => &[START_OVER_OPTION, EDIT_CONTACT_OPTION],
    }
}

// =============================================================================
//  FAQ
// =============================================================================

struct FaqEntry {
    pattern: Regex,
    reply: &'static str,
}

fn faq(pattern: &str, reply: &'static str) -> FaqEntry {
    FaqEntry {
        pattern: Regex::new(pattern).expect("valid FAQ pattern"),
        reply,
    }
}

static FAQ: LazyLock<Vec<FaqEntry>> = LazyLock::new(|| {
    vec![
        faq(
            r"(?i)(срок|поставк|доставк)",
            "Чаще всего под заказ; инженер уточнит срок под конкретную модель и объём.",
        ),
        faq(
            r"(?i)(шаг|пиксел|pixel|ppi|разреш)",
            "Чем ближе расстояние просмотра, тем меньше нужен шаг пикселя. Для точного подбора инженер учтёт дистанцию, сценарий и бюджет.",
        ),
        faq(
            r"(?i)(улиц|outdoor|indoor|\bip\d{0,2}\b|ярк)",
            "Для улицы важны IP-защита, повышенная яркость и устойчивость к погоде. Для помещений важнее комфортная яркость и детализация под близкий просмотр.",
        ),
        faq(
            r"(?i)(cob|gob)",
            "COB обычно даёт более цельную картинку и высокую защиту поверхности. GOB часто выбирают, когда нужен дополнительный защитный слой и практичность в эксплуатации.",
        ),
        faq(
            r"(?i)(гарант|сервис)",
            "На экраны и модули действует гарантия производителя; сервис и запасные модули инженер обсудит вместе с предложением.",
        ),
        faq(
            r"(?i)(\bкп\b|коммерч|предложени|цена|цен[уы]|стоим)",
            "Стоимость зависит от шага пикселя, размера и условий монтажа — расчёт пришлём вместе с предложением.",
        ),
    ]
});

/// Informational reply for free text that hits a known topic.
pub fn faq_reply(text: &str) -> Option<&'static str> {
    FAQ.iter()
        .find(|entry| entry.pattern.is_match(text))
        .map(|entry| entry.reply)
}

// =============================================================================
//  TRANSITIONS
// =============================================================================

/// A contact that passed validation and should be sent as a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadDraft {
    pub answers: QuestionnaireAnswers,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ChatState,
    /// Bot messages to append, in order.
    pub replies: Vec<String>,
    pub submit: Option<LeadDraft>,
}

impl Transition {
    fn to(state: ChatState) -> Self {
        let replies = vec![prompt(state.step()).to_string()];
        Self {
            state,
            replies,
            submit: None,
        }
    }

    fn stay(state: ChatState, replies: Vec<String>) -> Self {
        Self {
            state,
            replies,
            submit: None,
        }
    }
}

impl ChatState {
    pub fn transition(self, event: ChatEvent) -> Result<Transition, ChatError> {
        transition(self, event)
    }
}

pub fn transition(state: ChatState, event: ChatEvent) -> Result<Transition, ChatError> {
    match event {
        ChatEvent::Answer(text) => answer(state, text.trim()),

        ChatEvent::StartOver => Ok(Transition::to(ChatState::Location)),

        ChatEvent::EditContact => match state {
            ChatState::Submitted { answers, contact, .. } => Ok(Transition::to(ChatState::Contact {
                answers,
                contact: Some(contact),
            })),
            other => Err(invalid(&other, &ChatEvent::EditContact)),
        },

        ChatEvent::SubmissionSucceeded { at } => match state {
            ChatState::Contact {
                answers,
                contact: Some(contact),
            } => Ok(Transition::stay(
                ChatState::Submitted {
                    answers,
                    contact,
                    submitted_at: at,
                },
                vec![SUBMITTED_REPLY.to_string()],
            )),
            other => Err(invalid(&other, &ChatEvent::SubmissionSucceeded { at })),
        },

        ChatEvent::SubmissionFailed(reason) => match state {
            ChatState::Contact { .. } => {
                let reply = match reason {
                    SubmitFailure::RateLimited => RATE_LIMITED_REPLY,
                    SubmitFailure::Rejected | SubmitFailure::Unavailable => RETRY_REPLY,
                };
                Ok(Transition::stay(state, vec![reply.to_string()]))
            }
            other => Err(invalid(&other, &ChatEvent::SubmissionFailed(reason))),
        },
    }
}

fn invalid(state: &ChatState, event: &ChatEvent) -> ChatError {
    ChatError::InvalidTransition {
        step: state.step(),
        event: event.name(),
    }
}

fn matching_option(step: ChatStep, text: &str) -> Option<&'static str> {
    let wanted = text.to_lowercase();
    options(step)
        .iter()
        .copied()
        .find(|option| option.to_lowercase() == wanted)
}

// Input order at every step: quick reply, valid contact (contact step only),
// FAQ keyword, then free text as the answer.
fn answer(state: ChatState, text: &str) -> Result<Transition, ChatError> {
    if text.is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    let step = state.step();

    if let Some(option) = matching_option(step, text) {
        return Ok(match (state, option) {
            (ChatState::Size { location, purpose }, SIZE_CUSTOM_OPTION) => {
                Transition::to(ChatState::SizeCustom { location, purpose })
            }
            (ChatState::Submitted { .. }, START_OVER_OPTION) => Transition::to(ChatState::Location),
            (ChatState::Submitted { answers, contact, .. }, _) => Transition::to(ChatState::Contact {
                answers,
                contact: Some(contact),
            }),
            (state, option) => advance(state, option.to_string()),
        });
    }

    if let ChatState::Contact { answers, .. } = &state {
        if let Some(contact) = Contact::parse(text) {
            let contact = contact.to_string();
            return Ok(Transition {
                submit: Some(LeadDraft {
                    answers: answers.clone(),
                    contact: contact.clone(),
                }),
                state: ChatState::Contact {
                    answers: answers.clone(),
                    contact: Some(contact),
                },
                replies: Vec::new(),
            });
        }
    }

    if let Some(reply) = faq_reply(text) {
        let replies = vec![reply.to_string(), prompt(step).to_string()];
        return Ok(Transition::stay(state, replies));
    }

    Ok(match state {
        ChatState::Contact { .. } => Transition::stay(state, vec![INVALID_CONTACT_REPLY.to_string()]),
        ChatState::Submitted { .. } => Transition::stay(state, vec![prompt(step).to_string()]),
        other => advance(other, text.to_string()),
    })
}

/// Records `value` as the answer to the current step and moves forward.
fn advance(state: ChatState, value: String) -> Transition {
    match state {
        ChatState::Location => Transition::to(ChatState::Purpose { location: value }),
        ChatState::Purpose { location } => Transition::to(ChatState::Size {
            location,
            purpose: value,
        }),
        ChatState::Size { location, purpose } | ChatState::SizeCustom { location, purpose } => {
            Transition::to(ChatState::Timeline {
                location,
                purpose,
                size: value,
            })
        }
        ChatState::Timeline {
            location,
            purpose,
            size,
        } => Transition::to(ChatState::Contact {
            answers: QuestionnaireAnswers {
                location,
                purpose,
                size,
                timeline: value,
            },
            contact: None,
        }),
        // Contact and Submitted never advance on plain text.
        state @ (ChatState::Contact { .. } | ChatState::Submitted { .. }) => {
            Transition::stay(state, Vec::new())
        }
    }
}

// =============================================================================
//  SESSIONS
// =============================================================================

pub fn new_session(now: DateTime<Utc>) -> ChatSession {
    let mut session = ChatSession {
        id: Uuid::new_v4(),
        state: ChatState::Location,
        messages: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    session.push(MessageRole::Bot, WELCOME, now);
    session.push(MessageRole::Bot, prompt(ChatStep::Location), now);
    session
}

/// Applies an event to a session, appending the user's text and the bot's
/// replies to the transcript.
pub fn apply(
    session: &mut ChatSession,
    event: ChatEvent,
    now: DateTime<Utc>,
) -> Result<Option<LeadDraft>, ChatError> {
    let user_text = match &event {
        ChatEvent::Answer(text) => Some(text.trim().to_string()),
        ChatEvent::StartOver => Some(START_OVER_OPTION.to_string()),
        ChatEvent::EditContact => Some(EDIT_CONTACT_OPTION.to_string()),
        ChatEvent::SubmissionSucceeded { .. } | ChatEvent::SubmissionFailed(_) => None,
    };

    let result = session.state.clone().transition(event)?;

    if let Some(text) = user_text {
        session.push(MessageRole::User, text, now);
    }
    session.state = result.state;
    for reply in result.replies {
        session.push(MessageRole::Bot, reply, now);
    }
    session.updated_at = now;

    Ok(result.submit)
}

/// Lifetimes of a stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl {
    /// Counted from `submitted_at` once the lead went out.
    pub submitted: Duration,
    /// Counted from the last activity of an unfinished questionnaire.
    pub idle: Duration,
}

pub fn is_expired(session: &ChatSession, now: DateTime<Utc>, ttl: SessionTtl) -> bool {
    match &session.state {
        ChatState::Submitted { submitted_at, .. } => now.signed_duration_since(*submitted_at) > ttl.submitted,
        _ => now.signed_duration_since(session.updated_at) > ttl.idle,
    }
}

/// Restores a persisted session. Blobs that do not parse (including an
/// incomplete answer record) and expired sessions yield `None`; the caller
/// starts a fresh session instead.
pub fn rehydrate(blob: &str, now: DateTime<Utc>, ttl: SessionTtl) -> Option<ChatSession> {
    let session: ChatSession = match serde_json::from_str(blob) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("discarding unreadable chat session: {}", e);
            return None;
        }
    };

    if is_expired(&session, now, ttl) {
        tracing::debug!(session_id = %session.id, step = ?session.step(), "chat session expired");
        return None;
    }

    Some(session)
}

pub fn view(session: &ChatSession, storage_key: String) -> ChatSessionView {
    let step = session.step();
    ChatSessionView {
        session_id: session.id,
        storage_key,
        step,
        prompt: prompt(step).to_string(),
        options: options(step).iter().map(|o| o.to_string()).collect(),
        answers: session.state.answers(),
        messages: session.messages.clone(),
        submitted_at: match &session.state {
            ChatState::Submitted { submitted_at, .. } => Some(*submitted_at),
            _ => None,
        },
        updated_at: session.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttl() -> SessionTtl {
        SessionTtl {
            submitted: Duration::hours(24),
            idle: Duration::hours(72),
        }
    }

    fn answer_all(session: &mut ChatSession, answers: &[&str]) -> Option<LeadDraft> {
        let mut draft = None;
        for text in answers {
            draft = apply(session, ChatEvent::Answer(text.to_string()), Utc::now()).unwrap();
        }
        draft
    }

    #[test]
    fn five_answers_reach_submitted() {
        let mut session = new_session(Utc::now());
        let draft = answer_all(
            &mut session,
            &["На улице", "Реклама", "5–20 м²", "1–3 месяца", "+7 916 123-45-67"],
        )
        .expect("contact triggers submission");

        assert_eq!(session.step(), ChatStep::Contact);
        assert_eq!(
            draft.answers,
            QuestionnaireAnswers {
                location: "На улице".into(),
                purpose: "Реклама".into(),
                size: "5–20 м²".into(),
                timeline: "1–3 месяца".into(),
            }
        );
        assert_eq!(draft.contact, "+79161234567");

        apply(&mut session, ChatEvent::SubmissionSucceeded { at: Utc::now() }, Utc::now()).unwrap();
        assert_eq!(session.step(), ChatStep::Submitted);
        assert_eq!(session.state.answers().contact.as_deref(), Some("+79161234567"));
    }

    #[test]
    fn faq_at_purpose_keeps_step_and_repeats_prompt() {
        let mut session = new_session(Utc::now());
        answer_all(&mut session, &["В помещении"]);
        assert_eq!(session.step(), ChatStep::Purpose);
        let before = session.messages.len();

        apply(&mut session, ChatEvent::Answer("какой шаг пикселя".into()), Utc::now()).unwrap();

        assert_eq!(session.step(), ChatStep::Purpose);
        let added = &session.messages[before..];
        assert_eq!(added.len(), 3);
        assert_eq!(added[0].role, MessageRole::User);
        assert!(added[1].text.contains("шаг пикселя"));
        assert_eq!(added[2].text, prompt(ChatStep::Purpose));
    }

    #[test]
    fn quick_reply_beats_faq_keywords() {
        // "На улице" would also match the outdoor FAQ entry.
        let mut session = new_session(Utc::now());
        answer_all(&mut session, &["на улице"]);
        assert_eq!(session.state, ChatState::Purpose { location: "На улице".into() });
    }

    #[test]
    fn exact_size_branches_into_free_text() {
        let mut session = new_session(Utc::now());
        answer_all(&mut session, &["На улице", "Реклама", SIZE_CUSTOM_OPTION]);
        assert_eq!(session.step(), ChatStep::SizeCustom);

        answer_all(&mut session, &["6 × 3 м"]);
        assert_eq!(session.step(), ChatStep::Timeline);
        assert_eq!(session.state.answers().size.as_deref(), Some("6 × 3 м"));
    }

    #[test]
    fn invalid_contact_stays_on_contact() {
        let mut session = new_session(Utc::now());
        let draft = answer_all(&mut session, &["На улице", "Реклама", "До 5 м²", "Позже", "позвоните мне"]);
        assert!(draft.is_none());
        assert_eq!(session.step(), ChatStep::Contact);
        assert_eq!(session.messages.last().unwrap().text, INVALID_CONTACT_REPLY);
    }

    #[test]
    fn failed_submission_keeps_answers_and_asks_to_retry() {
        let mut session = new_session(Utc::now());
        answer_all(&mut session, &["На улице", "Реклама", "До 5 м²", "Позже", "sales@example.ru"]);

        apply(&mut session, ChatEvent::SubmissionFailed(SubmitFailure::Unavailable), Utc::now()).unwrap();
        assert_eq!(session.step(), ChatStep::Contact);
        assert_eq!(session.state.answers().contact.as_deref(), Some("sales@example.ru"));
        assert_eq!(session.messages.last().unwrap().text, RETRY_REPLY);
    }

    #[test]
    fn submitted_allows_only_restart_or_contact_edit() {
        let mut session = new_session(Utc::now());
        answer_all(&mut session, &["На улице", "Реклама", "До 5 м²", "Позже", "9161234567"]);
        apply(&mut session, ChatEvent::SubmissionSucceeded { at: Utc::now() }, Utc::now()).unwrap();

        // Free text does not move a submitted session.
        answer_all(&mut session, &["привет"]);
        assert_eq!(session.step(), ChatStep::Submitted);

        apply(&mut session, ChatEvent::EditContact, Utc::now()).unwrap();
        assert_eq!(session.step(), ChatStep::Contact);
        assert_eq!(session.state.answers().timeline.as_deref(), Some("Позже"));

        apply(&mut session, ChatEvent::StartOver, Utc::now()).unwrap();
        assert_eq!(session.state, ChatState::Location);
    }

    #[test]
    fn illegal_events_are_rejected() {
        assert_eq!(
            transition(ChatState::Location, ChatEvent::EditContact),
            Err(ChatError::InvalidTransition {
                step: ChatStep::Location,
                event: "edit_contact",
            })
        );
        assert!(transition(
            ChatState::Contact {
                answers: QuestionnaireAnswers {
                    location: "a".into(),
                    purpose: "b".into(),
                    size: "c".into(),
                    timeline: "d".into(),
                },
                contact: None,
            },
            ChatEvent::SubmissionSucceeded { at: Utc::now() },
        )
        .is_err());
        assert_eq!(
            transition(ChatState::Location, ChatEvent::Answer("   ".into())),
            Err(ChatError::EmptyMessage)
        );
    }

    #[test]
    fn stale_submitted_session_is_discarded() {
        let ttl = ttl();
        let mut session = new_session(Utc::now());
        session.state = ChatState::Submitted {
            answers: QuestionnaireAnswers {
                location: "a".into(),
                purpose: "b".into(),
                size: "c".into(),
                timeline: "d".into(),
            },
            contact: "+79161234567".into(),
            submitted_at: Utc::now() - Duration::hours(25),
        };
        let blob = serde_json::to_string(&session).unwrap();
        assert!(rehydrate(&blob, Utc::now(), ttl).is_none());

        if let ChatState::Submitted { submitted_at, .. } = &mut session.state {
            *submitted_at = Utc::now() - Duration::hours(1);
        }
        let blob = serde_json::to_string(&session).unwrap();
        assert_eq!(rehydrate(&blob, Utc::now(), ttl), Some(session));
    }

    #[test]
    fn abandoned_questionnaire_expires_after_idle_ttl() {
        let mut session = new_session(Utc::now() - Duration::days(30));
        apply(&mut session, ChatEvent::Answer("На улице".into()), Utc::now() - Duration::days(30)).unwrap();
        let blob = serde_json::to_string(&session).unwrap();
        assert!(rehydrate(&blob, Utc::now(), ttl()).is_none());

        apply(&mut session, ChatEvent::Answer("Реклама".into()), Utc::now() - Duration::hours(71)).unwrap();
        assert!(!is_expired(&session, Utc::now(), ttl()));
        let blob = serde_json::to_string(&session).unwrap();
        assert_eq!(rehydrate(&blob, Utc::now(), ttl()).map(|s| s.step()), Some(ChatStep::Size));
    }

    #[test]
    fn incomplete_submitted_record_is_discarded() {
        let session = new_session(Utc::now());
        let mut value = serde_json::to_value(&session).unwrap();
        value["state"] = serde_json::json!({
            "step": "submitted",
            "answers": { "location": "На улице" },
            "contact": "+79161234567",
            "submitted_at": Utc::now()
        });
        assert!(rehydrate(&value.to_string(), Utc::now(), ttl()).is_none());
    }

    #[test]
    fn faq_ip_does_not_fire_inside_words() {
        assert!(faq_reply("нужен экран IP65").is_some());
        assert!(faq_reply("philip@example.com").is_none());
    }
}
