//! Shared test fixtures: logging setup, a pinned clock and entry builders.

use std::env;
use std::sync::Once;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{Content, Entry};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // Arena internals are chatty at trace level
    let noisy_modules = ["generational_arena"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Reference clock shared by scoring tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Text entry with the given net points, created `age_hours` before [`fixed_now`].
pub fn scored_entry(id: i64, points: i64, age_hours: i64) -> Entry {
    let (up, down) = if points >= 0 {
        (points as u64, 0)
    } else {
        (0, points.unsigned_abs())
    };
    Entry::new(
        id,
        Content::Text(format!("entry {id}")),
        fixed_now() - Duration::hours(age_hours),
    )
    .with_votes(up, down)
}
