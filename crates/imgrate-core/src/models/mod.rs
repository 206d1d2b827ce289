pub mod question;

pub use question::{
    destination_key, BatchSummary, ImageRef, ProcessOutcome, Question, QuestionField,
    QuestionUpdate, Replacement,
};
