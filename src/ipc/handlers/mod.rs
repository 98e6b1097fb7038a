pub mod assets;
pub mod backup_exchange;
pub mod categories;
pub mod core;
pub mod questions;
pub mod quizzes;
pub mod reports;
pub mod sessions;
