//! Result output: console summary and JSON export

pub mod json;
pub mod text;
