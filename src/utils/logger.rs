use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// HTTP 用戶端的連線細節只在 RUST_LOG 明確要求時顯示
const QUIET_HTTP: &str = "hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn";

fn default_directives(level: &str) -> String {
    format!("proxilink={},{}", level, QUIET_HTTP)
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// 日誌寫到 stderr，stdout 只留給 table/JSON/CSV 輸出
pub fn init_cli_logger(verbose: bool) {
    let filter = default_filter(if verbose { "debug" } else { "info" });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// 推播函式的日誌；每一行一個 JSON 物件，事件欄位攤平在最上層
pub fn init_lambda_logger() {
    tracing_subscriber::registry()
        .with(default_filter("info"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .json()
                .flatten_event(true)
                .with_current_span(false),
        )
        .init();
}
