use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize console tracing.
///
/// `RUST_LOG` overrides the default filter. Calling this again once a
/// subscriber is installed is a no-op.
pub fn init_telemetry(environment: &str) -> Result<(), Box<dyn std::error::Error>> {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(false)
            .without_time(),
    );
    let installed = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "galleon=debug,tower_http=debug".into()),
        )
        .with(console_fmt)
        .try_init();

    match installed {
        Ok(()) => {
            tracing::info!(environment = %environment, "Tracing initialized");
            Ok(())
        }
        // Only fails when a global subscriber is already set
        Err(e) => {
            tracing::debug!(error = %e, "Tracing subscriber already installed");
            Ok(())
        }
    }
}
