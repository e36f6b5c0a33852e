// src/services/chat_service.rs

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::session_store::{storage_key, SessionStore},
    models::{
        chat::{ChatEvent, ChatSession, ChatSessionView, SubmitFailure},
        lead::{LeadPayload, PayloadSource},
    },
    services::{
        chat_flow::{self, LeadDraft, SessionTtl, HISTORY_TAIL},
        lead_service::LeadSubmitter,
        rate_limiter::RateLimiter,
    },
};

/// Request data attached to a lead submitted from the chat.
#[derive(Debug, Clone, Default)]
pub struct LeadContext {
    pub client_ip: String,
    pub page_url: Option<String>,
    pub page_title: Option<String>,
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn SessionStore>,
    submitter: Arc<dyn LeadSubmitter>,
    ttl: SessionTtl,
    // New sessions per client IP.
    open_limiter: RateLimiter,
    // One mutex per session so answers for the same session never interleave.
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        submitter: Arc<dyn LeadSubmitter>,
        ttl: SessionTtl,
        open_limiter: RateLimiter,
    ) -> Self {
        Self {
            store,
            submitter,
            ttl,
            open_limiter,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.open_limiter
    }

    /// Restores `session_id` when it is still valid, otherwise starts a new
    /// session. Only new sessions count against the client's limit.
    pub async fn open(&self, session_id: Option<Uuid>, client_ip: &str) -> Result<ChatSessionView, AppError> {
        if let Some(id) = session_id {
            if let Some(session) = self.load(id).await? {
                return Ok(view(&session));
            }
        }

        if !self.open_limiter.check(client_ip) {
            warn!(client_ip, "chat session limit reached");
            return Err(AppError::TooManyRequests);
        }

        let session = chat_flow::new_session(Utc::now());
        self.save(&session).await?;
        info!(session_id = %session.id, "chat session started");
        Ok(view(&session))
    }

    pub async fn get(&self, id: Uuid) -> Result<ChatSessionView, AppError> {
        let session = self.load(id).await?.ok_or(AppError::SessionNotFound)?;
        Ok(view(&session))
    }

    pub async fn send_message(
        &self,
        id: Uuid,
        text: &str,
        context: LeadContext,
    ) -> Result<ChatSessionView, AppError> {
        self.mutate(id, ChatEvent::Answer(text.to_string()), Some(context)).await
    }

    pub async fn restart(&self, id: Uuid) -> Result<ChatSessionView, AppError> {
        self.mutate(id, ChatEvent::StartOver, None).await
    }

    pub async fn edit_contact(&self, id: Uuid) -> Result<ChatSessionView, AppError> {
        self.mutate(id, ChatEvent::EditContact, None).await
    }

    /// Drops expired and unreadable sessions from the store.
    pub async fn purge_expired(&self) -> Result<usize, AppError> {
        let now = Utc::now();
        let ttl = self.ttl;
        let removed = self
            .store
            .purge(&move |blob: &str| chat_flow::rehydrate(blob, now, ttl).is_none())
            .await?;
        if removed > 0 {
            info!(removed, "expired chat sessions purged");
        }
        Ok(removed)
    }

    async fn mutate(
        &self,
        id: Uuid,
        event: ChatEvent,
        context: Option<LeadContext>,
    ) -> Result<ChatSessionView, AppError> {
        let lock = self.locks.entry(id).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.mutate_locked(id, event, context).await
        };
        drop(lock);
        self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn mutate_locked(
        &self,
        id: Uuid,
        event: ChatEvent,
        context: Option<LeadContext>,
    ) -> Result<ChatSessionView, AppError> {
        let mut session = self.load(id).await?.ok_or(AppError::SessionNotFound)?;

        let draft = chat_flow::apply(&mut session, event, Utc::now())?;

        if let Some(draft) = draft {
            let outcome = self.submit(&session, draft, context.unwrap_or_default()).await;
            chat_flow::apply(&mut session, outcome, Utc::now())?;
        }

        self.save(&session).await?;
        Ok(view(&session))
    }

    async fn submit(&self, session: &ChatSession, draft: LeadDraft, context: LeadContext) -> ChatEvent {
        let history = session
            .history_tail(HISTORY_TAIL)
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect();

        let payload = LeadPayload {
            contact: draft.contact,
            location: Some(draft.answers.location),
            purpose: Some(draft.answers.purpose),
            size: Some(draft.answers.size),
            timeline: Some(draft.answers.timeline),
            history: Some(history),
            page_url: context.page_url,
            page_title: context.page_title,
            source: Some(PayloadSource::ChatWidget),
        };

        match self.submitter.submit_chat_lead(&context.client_ip, payload).await {
            Ok(()) => {
                info!(session_id = %session.id, "chat lead submitted");
                ChatEvent::SubmissionSucceeded { at: Utc::now() }
            }
            Err(e) => {
                warn!(session_id = %session.id, code = e.code(), "chat lead submission failed");
                ChatEvent::SubmissionFailed(submit_failure(&e))
            }
        }
    }

    async fn load(&self, id: Uuid) -> Result<Option<ChatSession>, AppError> {
        let key = storage_key(&id);
        let Some(blob) = self.store.load(&key).await? else {
            return Ok(None);
        };

        match chat_flow::rehydrate(&blob, Utc::now(), self.ttl) {
            Some(session) => Ok(Some(session)),
            None => {
                self.store.remove(&key).await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &ChatSession) -> Result<(), AppError> {
        let blob = serde_json::to_string(session).map_err(anyhow::Error::from)?;
        self.store.save(&storage_key(&session.id), blob).await?;
        Ok(())
    }
}

fn view(session: &ChatSession) -> ChatSessionView {
    chat_flow::view(session, storage_key(&session.id))
}

fn submit_failure(error: &AppError) -> SubmitFailure {
    match error {
        AppError::TooManyRequests => SubmitFailure::RateLimited,
        AppError::ContactRequired | AppError::InvalidContact | AppError::ValidationError(_) => {
            SubmitFailure::Rejected
        }
        _ => SubmitFailure::Unavailable,
    }
}
