pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod templates;

pub use config::{AppConfig, CorsConfig, LoggingConfig, ServerConfig};
pub use observability::init_tracing;
pub use server::{AppState, PageSaverServer, ServerBuilder, build_app, build_app_with_state};
