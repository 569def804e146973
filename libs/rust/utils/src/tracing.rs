use futures::{Future, FutureExt};
use tracing::error;
use tracing_subscriber::{EnvFilter, filter::Directive, fmt, prelude::*};

/// Crates whose request-level chatter drowns out the per-call lines.
const SILENCED_TARGETS: [&str; 4] = ["hyper=off", "hyper_util=off", "reqwest=off", "rustls=off"];

pub fn build_filter(default_level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    for directive in SILENCED_TARGETS.iter().filter_map(|d| d.parse::<Directive>().ok()) {
        filter = filter.add_directive(directive);
    }

    filter
}

pub fn setup_tracing() {
    let fmt_layer = fmt::layer()
        .with_line_number(true)
        .compact()
        .with_writer(std::io::stdout);

    // try_init: tests and embedders may have installed a subscriber already
    let _ = tracing_subscriber::registry()
        .with(build_filter("info"))
        .with(fmt_layer)
        .try_init();
}

pub async fn run_with_tracing<F, Fut>(future: F) -> Result<(), anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
{
    setup_tracing();

    match std::panic::AssertUnwindSafe(future()).catch_unwind().await {
        Ok(result) => result,
        Err(e) => {
            capture_panic_details(e);
            Err(anyhow::anyhow!("Task panicked"))
        }
    }
}

fn capture_panic_details(e: Box<dyn std::any::Any + Send>) {
    let backtrace = backtrace::Backtrace::new();
    if let Some(s) = e.downcast_ref::<&str>() {
        error!(panic_message = *s, backtrace = ?backtrace, "Panic occurred with message");
    } else if let Some(s) = e.downcast_ref::<String>() {
        error!(panic_message = s, backtrace = ?backtrace, "Panic occurred with message");
    } else {
        error!(backtrace = ?backtrace, "Panic occurred but the payload is not a string");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_with_tracing_passes_through_results() {
        let ok = run_with_tracing(|| async { Ok(()) }).await;
        assert!(ok.is_ok());

        let err = run_with_tracing(|| async { Err(anyhow::anyhow!("boom")) }).await;
        assert_eq!(err.unwrap_err().to_string(), "boom");
    }

    #[tokio::test]
    async fn run_with_tracing_turns_panics_into_errors() {
        let result = run_with_tracing(|| async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().to_string(), "Task panicked");
    }
}
