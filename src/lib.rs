//! ESG SDK - client for the ESG education platform
//!
//! This library wraps the platform's hosted backend (tables, stored
//! procedures, auth and storage) together with its analytics and content
//! APIs behind typed models and async operations.

pub mod analytics;
pub mod backend;
pub mod config;
pub mod content;
pub mod error;
mod http;
pub mod models;
pub mod sdk;
pub mod services;

pub use error::{Result, SdkError};
pub use sdk::EsgSdk;
