//! Imgrate Services Layer
//!
//! This crate hosts the migration pipeline: locating images in rich-text
//! fields, fetching them, uploading them into managed storage, rewriting
//! the markup, and driving the whole thing over a chapter's questions.
//! Collaborators (document store, object storage, fetcher) are injected as
//! trait objects so the pipeline can be tested against fakes.

pub mod batch;
pub mod fetch;
pub mod markup;
pub mod processor;

pub use batch::BatchRunner;
pub use fetch::{FetchError, FetchedImage, HttpImageFetcher, ImageFetcher};
pub use markup::{extract_images, rewrite_images, MarkupError};
pub use processor::QuestionProcessor;
