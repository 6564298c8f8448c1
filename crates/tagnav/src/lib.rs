pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

/// Install the log subscriber. Output goes to stderr so stdout stays parseable.
pub fn init() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
