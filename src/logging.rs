use std::io;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::environment::get_env_var;

const DEFAULT_STDOUT_FILTER: &str = "info,llm_request=info,web_request=info,mail_delivery=info";
const DEFAULT_FILE_FILTER: &str = "debug,llm_request=debug,html5ever=off,rustls=info,hyper=info";

pub fn configure_logging() {
    // readability pulls in html5ever, which is noisy about serializing scraped pages
    let custom_filter = FilterFn::new(|metadata| {
        !(metadata.level() == &Level::WARN && metadata.target() == "html5ever::serialize")
    });

    let stdout_filter = get_env_var("RUST_LOG").unwrap_or_else(|| DEFAULT_STDOUT_FILTER.to_string());
    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(EnvFilter::new(stdout_filter))
        .with_filter(custom_filter);

    // Rolling file output is only wanted on machines that keep logs around;
    // CI runs rely on the scheduler capturing stdout.
    let file_log = get_env_var("LOG_DIR").map(|dir| {
        let file_appender = rolling::daily(dir, "kindle-digest.log");
        fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender)
            .with_filter(EnvFilter::new(DEFAULT_FILE_FILTER))
    });

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
