//! Content generation pipeline.
//!
//! - `quiz`: weekly quiz rounds with deterministic backfill
//! - `news`: year package (hero, ticker, monthly cards) with padding
//! - `article`: feature articles with a hard paragraph floor
//! - `images`: illustrative image resolution chain
//! - `reconcile`: back-patching articles into stored packages

pub mod article;
pub mod images;
pub mod news;
pub mod quiz;
pub mod reconcile;

pub use article::{generate_article, ArticleParams};
pub use images::{candidate_titles, ImageResolver, ResolvedImage};
pub use news::{GeneratedPackage, YearNewsGenerator};
pub use quiz::{generate_questions, QuizParams};
pub use reconcile::{reconcile_package, ReconcileOutcome};
