pub mod client;
pub mod models;

pub use client::{ApiError, ConverterClient};
pub use models::ConverterConfig;
