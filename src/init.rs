use env_logger::Env;

/// 初始化日誌，預設等級 info，`RUST_LOG` 可覆寫
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .try_init();
}
