pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::backend::BackendClient;
pub use adapters::push_http::WebPushTransport;
pub use config::{AppConfig, LambdaConfig};
pub use core::geolocation::Geolocator;
pub use core::push::{PushDispatcher, PushResponse};
pub use utils::error::{ProxiError, Result};
