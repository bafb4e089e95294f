// src/lib.rs

//! Rewind backend library
//!
//! Request handlers for a nostalgia trivia app: weekly quizzes, year-news
//! packages, feature articles, and a year-anchored chat assistant.

pub mod config;
pub mod context;
pub mod error;
pub mod generate;
pub mod handlers;
pub mod limiter;
pub mod model_client;
pub mod models;
pub mod store;
pub mod utils;
