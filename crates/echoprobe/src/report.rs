pub mod json;
pub mod text;
mod types;
