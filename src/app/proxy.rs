// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::error::AppError;
use url::Url;

/// Validate and install a process-wide HTTP proxy. Must run before any
/// reqwest client is constructed; clients read the proxy variables once at
/// build time and never again.
pub fn install_global_proxy(proxy_url: &str) -> Result<(), AppError> {
    let parsed = Url::parse(proxy_url)
        .map_err(|e| AppError::Config(format!("Invalid proxy URL {proxy_url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" | "socks5" => {}
        other => {
            return Err(AppError::Config(format!(
                "Unsupported proxy scheme: {other}"
            )));
        }
    }

    // SAFETY: called once from main before any worker threads exist.
    unsafe {
        std::env::set_var("HTTP_PROXY", proxy_url);
        std::env::set_var("HTTPS_PROXY", proxy_url);
    }
    tracing::info!(proxy = %proxy_url, "Global HTTP proxy installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_and_unsupported_urls() {
        assert!(install_global_proxy("not a url").is_err());
        assert!(install_global_proxy("ftp://127.0.0.1:7890").is_err());
    }
}
