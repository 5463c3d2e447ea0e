pub const DEFAULT_USW_BASE_URL: &str = "https://userstyles.world/";
pub const ENV_USW_BASE_URL: &str = "USW_BASE_URL";
pub const BASE_URL_SOURCE_DEFAULT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

/// Resolves the service base URL, returning it together with the name of the
/// source it came from.
pub fn resolve_base_url() -> Result<(String, &'static str), ConfigError> {
    if let Some(base_url) = env_non_empty(ENV_USW_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_USW_BASE_URL));
    }
    normalize_base_url(DEFAULT_USW_BASE_URL).map(|normalized| (normalized, BASE_URL_SOURCE_DEFAULT))
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    let Some((scheme, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if !matches!(scheme, "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl);
    }
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn with_env<T>(value: Option<&str>, test: impl FnOnce() -> T) -> T {
        let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous = std::env::var(ENV_USW_BASE_URL).ok();
        match value {
            Some(value) => unsafe { std::env::set_var(ENV_USW_BASE_URL, value) },
            None => unsafe { std::env::remove_var(ENV_USW_BASE_URL) },
        }

        let result = test();

        match previous {
            Some(value) => unsafe { std::env::set_var(ENV_USW_BASE_URL, value) },
            None => unsafe { std::env::remove_var(ENV_USW_BASE_URL) },
        }
        result
    }

    #[test]
    fn normalize_base_url_drops_trailing_slash() {
        let normalized = normalize_base_url(" https://userstyles.world/ ").expect("valid url");
        assert_eq!(normalized, "https://userstyles.world");
    }

    #[test]
    fn normalize_base_url_rejects_missing_scheme_and_host() {
        assert_eq!(
            normalize_base_url("userstyles.world"),
            Err(ConfigError::InvalidBaseUrl)
        );
        assert_eq!(
            normalize_base_url("ftp://userstyles.world"),
            Err(ConfigError::InvalidBaseUrl)
        );
        assert_eq!(normalize_base_url("https://"), Err(ConfigError::InvalidBaseUrl));
        assert_eq!(normalize_base_url("  / "), Err(ConfigError::EmptyBaseUrl));
    }

    #[test]
    fn resolve_base_url_defaults_to_public_service() {
        with_env(None, || {
            let (resolved, source) = resolve_base_url().expect("default url");
            assert_eq!(resolved, "https://userstyles.world");
            assert_eq!(source, BASE_URL_SOURCE_DEFAULT);
        });
    }

    #[test]
    fn resolve_base_url_prefers_env() {
        with_env(Some("http://127.0.0.1:8080/"), || {
            let (resolved, source) = resolve_base_url().expect("env url");
            assert_eq!(resolved, "http://127.0.0.1:8080");
            assert_eq!(source, ENV_USW_BASE_URL);
        });
    }

    #[test]
    fn resolve_base_url_surfaces_invalid_env() {
        with_env(Some("not a url"), || {
            assert_eq!(resolve_base_url(), Err(ConfigError::InvalidBaseUrl));
        });
    }
}
