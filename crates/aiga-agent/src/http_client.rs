use reqwest::Client;
use std::time::Duration;

const DISABLE_SYSTEM_PROXY_ENV: &str = "AIGA_DISABLE_SYSTEM_PROXY";

pub(crate) fn build_http_client(timeout_secs: u64) -> Client {
    let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));
    if should_disable_system_proxy() {
        builder = builder.no_proxy();
    }
    builder.build().expect("Failed to build reqwest client")
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
