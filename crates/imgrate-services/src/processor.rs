//! Per-question migration pipeline.
//!
//! A question is processed as a short-circuiting pass over its fields in
//! fixed order (body, options by index, solution). Any image failure
//! aborts the whole question: staged rewrites are discarded and the only
//! persisted change is `image_storing = false`. Exactly one store write
//! happens per invocation, on both the success and the failure path.

use std::sync::Arc;

use imgrate_core::models::{
    destination_key, ProcessOutcome, Question, QuestionField, QuestionUpdate, Replacement,
};
use imgrate_core::{extension_for, AppError};
use imgrate_db::QuestionStore;
use imgrate_storage::Storage;
use tracing::{info, warn};

use crate::fetch::ImageFetcher;
use crate::markup;

pub struct QuestionProcessor {
    store: Arc<dyn QuestionStore>,
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn ImageFetcher>,
}

/// Content fields staged during a successful pass, before the single
/// combined update is issued.
#[derive(Default)]
struct StagedFields {
    ques: Option<String>,
    options: Option<Vec<Option<String>>>,
    solution: Option<String>,
    images_migrated: usize,
}

impl StagedFields {
    fn into_update(self) -> QuestionUpdate {
        QuestionUpdate {
            ques: self.ques,
            options: self.options,
            solution: self.solution,
            image_storing: true,
        }
    }
}

impl QuestionProcessor {
    pub fn new(
        store: Arc<dyn QuestionStore>,
        storage: Arc<dyn Storage>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            store,
            storage,
            fetcher,
        }
    }

    /// Migrate every image of one question and persist the result.
    ///
    /// Per-image errors become a `Failed` outcome (with the failure marker
    /// persisted); only errors from the persistence write itself are
    /// returned as `Err`, leaving the question eligible for the next run.
    pub async fn process(&self, question: &Question) -> Result<ProcessOutcome, AppError> {
        let staged = match self.stage_fields(question).await {
            Ok(staged) => staged,
            Err(err) => {
                warn!(
                    question_id = %question.id,
                    error = %err,
                    "image migration failed; marking question as failed"
                );
                self.store
                    .apply_update(question.id, &QuestionUpdate::marker(false))
                    .await?;
                return Ok(ProcessOutcome::Failed {
                    reason: err.to_string(),
                });
            }
        };

        let images_migrated = staged.images_migrated;
        let update = staged.into_update();
        let fields_updated = update.field_count();

        self.store.apply_update(question.id, &update).await?;

        if fields_updated > 0 {
            info!(
                question_id = %question.id,
                fields_updated,
                "question updated with migrated images"
            );
        } else {
            info!(question_id = %question.id, "question has no images, marked as processed");
        }

        Ok(ProcessOutcome::Completed {
            fields_updated,
            images_migrated,
        })
    }

    /// Walk the three fields in order, migrating images and collecting
    /// rewritten markup. The first failing image aborts the whole pass.
    async fn stage_fields(&self, question: &Question) -> Result<StagedFields, AppError> {
        let mut staged = StagedFields::default();

        if let Some(html) = non_empty(&question.ques) {
            if let Some((rewritten, count)) = self
                .process_field(question, QuestionField::Ques, html)
                .await?
            {
                staged.ques = Some(rewritten);
                staged.images_migrated += count;
            }
        }

        if !question.options.is_empty() {
            // Rebuild the full option list, substituting rewritten entries
            // at their original index; stage it only if anything changed.
            let mut rebuilt: Vec<Option<String>> = Vec::with_capacity(question.options.len());
            let mut changed = false;
            for (idx, option) in question.options.iter().enumerate() {
                match option.as_deref().filter(|html| !html.trim().is_empty()) {
                    Some(html) => {
                        match self
                            .process_field(question, QuestionField::Option(idx), html)
                            .await?
                        {
                            Some((rewritten, count)) => {
                                rebuilt.push(Some(rewritten));
                                staged.images_migrated += count;
                                changed = true;
                            }
                            None => rebuilt.push(option.clone()),
                        }
                    }
                    None => rebuilt.push(option.clone()),
                }
            }
            if changed {
                staged.options = Some(rebuilt);
            }
        }

        if let Some(html) = non_empty(&question.solution) {
            if let Some((rewritten, count)) = self
                .process_field(question, QuestionField::Solution, html)
                .await?
            {
                staged.solution = Some(rewritten);
                staged.images_migrated += count;
            }
        }

        Ok(staged)
    }

    /// Migrate the images of a single field. Returns the rewritten markup
    /// and image count, or `None` when the field contains no images.
    async fn process_field(
        &self,
        question: &Question,
        field: QuestionField,
        html: &str,
    ) -> Result<Option<(String, usize)>, AppError> {
        let images = markup::extract_images(html)?;
        if images.is_empty() {
            return Ok(None);
        }

        let mut replacements = Vec::with_capacity(images.len());
        for (idx, image) in images.iter().enumerate() {
            let fetched = self.fetcher.fetch(&image.src).await?;
            let ext = extension_for(&image.src, fetched.content_type.as_deref());
            let key = destination_key(question.chapter_id, question.id, field, idx, ext);
            let content_type = fetched.content_type;
            let url = self
                .storage
                .upload(&key, fetched.bytes, content_type.as_deref())
                .await?;

            info!(
                question_id = %question.id,
                field = %field,
                index = idx,
                key = %key,
                "image migrated"
            );

            replacements.push(Replacement {
                original_src: image.src.clone(),
                new_url: url,
            });
        }

        let rewritten = markup::rewrite_images(html, &replacements)?;
        Ok(Some((rewritten, replacements.len())))
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|html| !html.trim().is_empty())
}
