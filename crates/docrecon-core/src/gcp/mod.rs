mod auth;
mod client;
mod config;

pub use auth::{default_token_source, MetadataServerToken, StaticToken, TokenSource};
pub use client::{ensure_success, GcpClient};
pub use config::ClientConfig;
