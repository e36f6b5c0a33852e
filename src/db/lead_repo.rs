// src/db/lead_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{Lead, LeadStatus, NewLead},
};

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, lead: &NewLead) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (name, contact, message, source)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, contact, message, source, status, created_at
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.contact)
        .bind(&lead.message)
        .bind(lead.source)
        .fetch_one(&self.pool)
        .await?;

        Ok(lead)
    }

    /// Newest first.
    pub async fn list(&self, status: Option<LeadStatus>, limit: i64) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT id, name, contact, message, source, status, created_at
            FROM leads
            WHERE ($1::lead_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(leads)
    }

    pub async fn update_status(&self, id: Uuid, status: LeadStatus) -> Result<Lead, AppError> {
        sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET status = $2
            WHERE id = $1
            RETURNING id, name, contact, message, source, status, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::LeadNotFound)
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
