use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize the tracing subscriber. Safe to call more than once, so tests
/// and embedding binaries can both call it unconditionally.
pub fn init() {
    INIT.get_or_init(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sqlx=warn,sea_orm=warn".into()),
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
