pub mod config;
pub mod http;
pub mod observability;
pub mod server;

pub use config::{AppConfig, IdpSettings, ImagingSettings, ServerConfig, SessionConfig};
pub use observability::init_tracing;
pub use server::{AppState, RadportServer, ServerBuilder, build_app, build_state};
