//! Chapter-level batch driver and single-question diagnostic mode.

use std::sync::Arc;

use imgrate_core::models::{BatchSummary, ProcessOutcome, Question};
use imgrate_core::AppError;
use imgrate_db::QuestionStore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::markup;
use crate::processor::QuestionProcessor;

pub struct BatchRunner {
    store: Arc<dyn QuestionStore>,
    processor: QuestionProcessor,
}

impl BatchRunner {
    pub fn new(store: Arc<dyn QuestionStore>, processor: QuestionProcessor) -> Self {
        Self { store, processor }
    }

    /// Process every question of a chapter sequentially, in retrieval
    /// order, accumulating success/failure counts. Individual question
    /// failures do not stop the run.
    ///
    /// The chapter id is validated before any store access; a malformed id
    /// returns `AppError::InvalidIdentifier` without touching documents.
    pub async fn run(&self, chapter_id: &str, reprocess: bool) -> Result<BatchSummary, AppError> {
        let chapter_id = parse_id(chapter_id)?;

        info!(chapter_id = %chapter_id, reprocess, "processing chapter questions");

        let questions = self
            .store
            .list_for_chapter(chapter_id, !reprocess)
            .await?;

        let mut summary = BatchSummary {
            total: questions.len(),
            ..BatchSummary::default()
        };

        if questions.is_empty() {
            info!(chapter_id = %chapter_id, "no questions to process");
            return Ok(summary);
        }

        info!(total = summary.total, "questions selected");

        for (idx, question) in questions.iter().enumerate() {
            match self.processor.process(question).await {
                Ok(ProcessOutcome::Completed { .. }) => summary.succeeded += 1,
                Ok(ProcessOutcome::Failed { reason }) => {
                    summary.failed += 1;
                    warn!(question_id = %question.id, reason = %reason, "question failed");
                }
                Err(err) => {
                    // Persistence failed; the marker state is indeterminate
                    // and the question stays eligible for the next run.
                    summary.failed += 1;
                    error!(question_id = %question.id, error = %err, "question update failed");
                }
            }
            info!(
                current = idx + 1,
                total = summary.total,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "progress"
            );
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            total = summary.total,
            "chapter processing complete"
        );

        Ok(summary)
    }

    /// Diagnostic mode: analyze a single question (image counts and URL
    /// previews per field) and, unless `dry_run` is set, run the full
    /// migration for it.
    pub async fn inspect(
        &self,
        question_id: &str,
        dry_run: bool,
    ) -> Result<ProcessOutcome, AppError> {
        let question_id = parse_id(question_id)?;

        let question = self
            .store
            .get_by_id(question_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("question {}", question_id)))?;

        info!(
            question_id = %question.id,
            chapter_id = %question.chapter_id,
            dry_run,
            "inspecting question"
        );

        let total_images = self.report_images(&question)?;

        if total_images == 0 {
            warn!(question_id = %question.id, "no images found in this question");
        }

        if dry_run {
            info!("dry run: skipping fetch, upload and persistence");
            return Ok(ProcessOutcome::Completed {
                fields_updated: 0,
                images_migrated: 0,
            });
        }

        self.processor.process(&question).await
    }

    /// Log per-field image counts and source previews; returns the total
    /// number of images found.
    fn report_images(&self, question: &Question) -> Result<usize, AppError> {
        let mut total = 0;

        if let Some(html) = question.ques.as_deref() {
            let images = markup::extract_images(html)?;
            info!(count = images.len(), "question text images");
            for (idx, image) in images.iter().enumerate() {
                info!(index = idx, src = %preview(&image.src), "ques image");
            }
            total += images.len();
        }

        for (opt_idx, option) in question.options.iter().enumerate() {
            if let Some(html) = option.as_deref() {
                let images = markup::extract_images(html)?;
                if !images.is_empty() {
                    info!(option = opt_idx, count = images.len(), "option images");
                    for (idx, image) in images.iter().enumerate() {
                        info!(
                            option = opt_idx,
                            index = idx,
                            src = %preview(&image.src),
                            "option image"
                        );
                    }
                    total += images.len();
                }
            }
        }

        if let Some(html) = question.solution.as_deref() {
            let images = markup::extract_images(html)?;
            info!(count = images.len(), "solution images");
            for (idx, image) in images.iter().enumerate() {
                info!(index = idx, src = %preview(&image.src), "solution image");
            }
            total += images.len();
        }

        info!(total, "total images found");
        Ok(total)
    }
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidIdentifier(raw.to_string()))
}

/// First 80 characters of a source locator, for log output.
fn preview(src: &str) -> String {
    if src.chars().count() <= 80 {
        src.to_string()
    } else {
        let truncated: String = src.chars().take(80).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_input_unchanged() {
        assert_eq!(preview("http://x/a.jpg"), "http://x/a.jpg");
    }

    #[test]
    fn test_preview_truncates_long_input() {
        let long = "a".repeat(200);
        let out = preview(&long);
        assert_eq!(out.len(), 83);
        assert!(out.ends_with("..."));
    }
}
