//! Database repositories for the data access layer.

pub mod questions;

pub use questions::{QuestionRepository, QuestionStore};
