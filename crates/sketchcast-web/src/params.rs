//! Page URL parameters.

/// Parameters read from the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParams {
    /// Console log level (`?log=debug`).
    pub log_level: log::Level,
}

impl Default for UrlParams {
    fn default() -> Self {
        Self {
            log_level: log::Level::Info,
        }
    }
}

/// Parse parameters from a query string or hash.
/// Supports formats like `?log=debug`; unknown keys and bad values are ignored.
pub fn parse_params(s: &str) -> UrlParams {
    // Remove leading ? or #
    let s = s.trim_start_matches(['?', '#']);
    let mut params = UrlParams::default();

    for pair in s.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if key == "log" {
                if let Ok(level) = value.parse() {
                    params.log_level = level;
                }
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_param() {
        assert_eq!(parse_params("?log=debug").log_level, log::Level::Debug);
        assert_eq!(parse_params("#foo=1&log=WARN").log_level, log::Level::Warn);
        assert_eq!(parse_params("?log=loud").log_level, log::Level::Info);
        assert_eq!(parse_params("").log_level, log::Level::Info);
    }
}
