use env_logger::{Builder, Env};

// Dependencies (reqwest, hyper) stay quiet unless RUST_LOG asks for them
const DEFAULT_FILTER: &str = "warn,guardian_watch=info";

fn builder() -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    builder.format_timestamp_secs().format_module_path(false);
    builder
}

/// Sets up logging for the CLI. Calling it twice is harmless.
pub fn init_logging() {
    let _ = builder().try_init();
}

/// Same format, routed through the test harness's output capture.
pub fn init_test_logging() {
    let _ = builder().is_test(true).try_init();
}
