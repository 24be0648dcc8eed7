use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize tracing with an env-driven filter and a fmt layer.
/// Defaults to `momentsmith=info` when `RUST_LOG` is unset.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "momentsmith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
