//! Tracing setup for embedders and tests.

use crate::config::Settings;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOGGING_INIT: Once = Once::new();

/// Install a stderr fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug = true` in [`Settings`] logs
/// this crate at debug level and everything else at info. Safe to call more
/// than once; later calls and hosts that installed their own subscriber are
/// left alone.
pub fn init_logging(settings: &Settings) {
    LOGGING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if settings.debug {
                "info,declgraph=debug"
            } else {
                "info"
            })
        });

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .try_init();
    });
}
