//! Imgrate Database Layer
//!
//! Repository implementations for the question collection. The
//! [`QuestionStore`] trait is the seam the service layer depends on, so
//! tests can run against in-memory fakes while production code uses the
//! Postgres-backed [`QuestionRepository`].

pub mod db;
pub mod setup;

pub use db::questions::{QuestionRepository, QuestionStore};
pub use setup::setup_database;
