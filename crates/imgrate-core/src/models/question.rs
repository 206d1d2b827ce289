//! Question domain model and the transient types produced while migrating
//! its embedded images.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A question document as stored in the database.
///
/// The three markup-bearing fields (`ques`, `options`, `solution`) may each
/// embed `<img>` elements. `image_storing` is the migration marker: `true`
/// once every image has been moved into managed storage, `false` after a
/// failed attempt, `NULL` when never touched.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub ques: Option<String>,
    pub options: Vec<Option<String>>,
    pub solution: Option<String>,
    pub image_storing: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staged partial update for a question.
///
/// `None` fields are left untouched by the persistence layer; the whole
/// update is applied as a single atomic statement. Content fields are only
/// ever staged together with `image_storing = true`; a failed document
/// persists exactly the marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionUpdate {
    pub ques: Option<String>,
    pub options: Option<Vec<Option<String>>>,
    pub solution: Option<String>,
    pub image_storing: bool,
}

impl QuestionUpdate {
    /// An update that only sets the migration marker.
    pub fn marker(image_storing: bool) -> Self {
        Self {
            image_storing,
            ..Self::default()
        }
    }

    /// Number of content fields staged for update.
    pub fn field_count(&self) -> usize {
        usize::from(self.ques.is_some())
            + usize::from(self.options.is_some())
            + usize::from(self.solution.is_some())
    }
}

/// Which markup-bearing field an image came from; embedded in destination
/// keys as `ques`, `option{N}` or `solution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionField {
    Ques,
    Option(usize),
    Solution,
}

impl Display for QuestionField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            QuestionField::Ques => write!(f, "ques"),
            QuestionField::Option(idx) => write!(f, "option{}", idx),
            QuestionField::Solution => write!(f, "solution"),
        }
    }
}

/// An image reference located in a markup fragment, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
}

/// Pairing of an original image locator with its uploaded public URL,
/// scoped to a single field's processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub original_src: String,
    pub new_url: String,
}

/// Outcome of processing a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Every image migrated (or none were present); marker set to true.
    Completed {
        fields_updated: usize,
        images_migrated: usize,
    },
    /// An image failed; staged changes were discarded and the marker set
    /// to false.
    Failed { reason: String },
}

/// Final counts for a batch run over one chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

/// Destination key for an uploaded image:
/// `{chapter_id}/{question_id}_{field}_{index}{ext}`.
///
/// Unique across all documents and fields because the question id, field
/// discriminator and per-field index are all embedded.
pub fn destination_key(
    chapter_id: Uuid,
    question_id: Uuid,
    field: QuestionField,
    index: usize,
    ext: &str,
) -> String {
    format!("{}/{}_{}_{}{}", chapter_id, question_id, field, index, ext)
}
