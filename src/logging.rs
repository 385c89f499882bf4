//! Tracing setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the filter passed to [`init`].
pub const LOG_ENV: &str = "SPARK_SHOP_LOG";

static INIT: Once = Once::new();

/// Install a stderr fmt subscriber. `default_filter` is an `EnvFilter`
/// directive such as `"spark_shop=debug"`; `SPARK_SHOP_LOG` wins when set.
///
/// Safe to call more than once; only the first call has an effect, and a
/// subscriber installed elsewhere is left alone.
pub fn init(default_filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Subscriber for unit tests: captured output, everything at debug.
#[cfg(test)]
pub(crate) fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("spark_shop=debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("spark_shop=info");
        init("spark_shop=trace");
        tracing::info!("still alive");
    }
}
