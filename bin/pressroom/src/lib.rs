//! Pressroom CLI Library
//!
//! Command implementations and the per-site run serialization used by the
//! `pressroom` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (generate, plan, publish, backup, schedule)
//! - [`runner`] - Per-site serialization of pipeline runs
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use pressroom::cmd::{self, SiteJob};
//! use pressroom_core::Config;
//!
//! let config = Config::load_with_env(Path::new("pressroom.toml")).unwrap();
//! let job = SiteJob::load(&config, Path::new("site.yaml")).unwrap();
//! cmd::generate::run(&job).unwrap();
//! ```

pub mod cmd;
pub mod runner;

pub use pressroom_generator::{Builder, GenerationReport};
pub use pressroom_publish::{PublishOutcome, Publisher};
pub use runner::SiteRunner;

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
