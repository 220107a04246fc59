//! Logging initialization for binaries embedding the pipeline.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing: ANSI output for dev, JSON when LOG_FORMAT=json.
///
/// Call once at process start. Respects RUST_LOG and defaults the pipeline
/// crates to info.
pub fn init_logging() {
    // Load .env first so RUST_LOG and LOG_FORMAT set there take effect.
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("sceneflow=info".parse().expect("valid directive"))
        .add_directive("hyper=warn".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true))
            .with(env_filter)
            .init();
    }
}
