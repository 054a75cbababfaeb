// Backend API access

pub mod client;
pub mod service;

pub use client::ApiClient;
pub use service::{report_filename, AutoAnalyst};
