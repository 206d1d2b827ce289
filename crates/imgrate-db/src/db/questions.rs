//! Question repository: lookup, chapter queries, and atomic partial updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgrate_core::models::{Question, QuestionUpdate};
use imgrate_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Row type for the questions table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub ques: Option<String>,
    pub options: Vec<Option<String>>,
    pub solution: Option<String>,
    pub image_storing: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestionRow {
    pub fn to_question(self) -> Question {
        Question {
            id: self.id,
            chapter_id: self.chapter_id,
            ques: self.ques,
            options: self.options,
            solution: self.solution,
            image_storing: self.image_storing,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Document store operations the migration services depend on.
///
/// Only three operation shapes are required: point lookup by id, a chapter
/// query with optional marker filtering, and an atomic partial-field update.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Fetch a question by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Question>, AppError>;

    /// Fetch the questions of a chapter in a deterministic order. With
    /// `skip_processed`, questions already marked `image_storing = true`
    /// are excluded (`NULL` and `false` both remain eligible).
    async fn list_for_chapter(
        &self,
        chapter_id: Uuid,
        skip_processed: bool,
    ) -> Result<Vec<Question>, AppError>;

    /// Apply a staged update in a single atomic statement. Content fields
    /// that are `None` are left untouched.
    async fn apply_update(&self, id: Uuid, update: &QuestionUpdate) -> Result<(), AppError>;
}

/// Postgres-backed question repository.
#[derive(Clone)]
pub struct QuestionRepository {
    pool: PgPool,
}

impl QuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for QuestionRepository {
    #[tracing::instrument(skip(self), fields(db.table = "questions", db.record_id = %id))]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Question>, AppError> {
        let row: Option<QuestionRow> = sqlx::query_as::<Postgres, QuestionRow>(
            r#"
            SELECT id, chapter_id, ques, options, solution, image_storing, created_at, updated_at
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(QuestionRow::to_question))
    }

    #[tracing::instrument(skip(self), fields(db.table = "questions", chapter_id = %chapter_id))]
    async fn list_for_chapter(
        &self,
        chapter_id: Uuid,
        skip_processed: bool,
    ) -> Result<Vec<Question>, AppError> {
        let rows: Vec<QuestionRow> = sqlx::query_as::<Postgres, QuestionRow>(
            r#"
            SELECT id, chapter_id, ques, options, solution, image_storing, created_at, updated_at
            FROM questions
            WHERE chapter_id = $1
              AND (NOT $2 OR image_storing IS DISTINCT FROM TRUE)
            ORDER BY created_at, id
            "#,
        )
        .bind(chapter_id)
        .bind(skip_processed)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(QuestionRow::to_question).collect())
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "questions", db.record_id = %id, marker = update.image_storing))]
    async fn apply_update(&self, id: Uuid, update: &QuestionUpdate) -> Result<(), AppError> {
        // One statement for the whole staged set; unset fields keep their
        // stored value via COALESCE.
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET ques = COALESCE($2, ques),
                options = COALESCE($3, options),
                solution = COALESCE($4, solution),
                image_storing = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.ques)
        .bind(&update.options)
        .bind(&update.solution)
        .bind(update.image_storing)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("question {}", id)));
        }

        tracing::debug!(
            question_id = %id,
            fields = update.field_count(),
            marker = update.image_storing,
            "question update applied"
        );
        Ok(())
    }
}
