use std::env;
use std::time::Duration;
use url::Url;

/// Origins allowed when `ALLOWED_ORIGINS` is unset (local dev servers).
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5500", "http://127.0.0.1:5500"];

/// Upstream provider selection
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamType {
    /// Invidious-compatible HTTP API at `invidious_url`
    Invidious,
    /// Local yt-dlp executable
    YtDlp,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Exact-match origin allow-list
    pub allowed_origins: Vec<String>,
    /// Search cache TTL in seconds (default: 900)
    pub cache_ttl_secs: u64,
    /// Search cache capacity (default: 10000)
    pub cache_max_entries: usize,
    /// Background sweep period in seconds; 0 disables the sweeper
    pub cache_sweep_secs: u64,
    pub upstream: UpstreamType,
    /// Base URL of the Invidious API (required when upstream = Invidious)
    pub invidious_url: Option<String>,
    pub ytdlp_path: String,
    /// Per-call upstream timeout; `None` leaves the client default in place
    pub upstream_timeout_secs: Option<u64>,
    /// Results requested from the search backend per query (default: 20)
    pub search_page_size: usize,
}

/// Split a comma-separated origin list, trimming and dropping empties.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read `name` as a number, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("{name} is invalid ({raw}): {e}").into()),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables, applying defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let port = parse_var("PORT", 3000u16)?;

        let allowed_origins = match env::var("ALLOWED_ORIGINS") {
            Ok(raw) => parse_origins(&raw),
            Err(_) => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let cache_ttl_secs = parse_var("CACHE_TTL_SECS", 900u64)?;
        let cache_max_entries = parse_var("CACHE_MAX_ENTRIES", 10_000usize)?;
        let cache_sweep_secs = parse_var("CACHE_SWEEP_SECS", 60u64)?;
        let search_page_size = parse_var("SEARCH_PAGE_SIZE", 20usize)?;

        let upstream_timeout_secs = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|e| format!("UPSTREAM_TIMEOUT_SECS is invalid ({raw}): {e}"))?,
            ),
            Err(_) => None,
        };

        let invidious_url = env::var("INVIDIOUS_URL").ok().filter(|u| !u.trim().is_empty());
        if let Some(url) = &invidious_url {
            Url::parse(url).map_err(|e| format!("INVIDIOUS_URL is invalid ({url}): {e}"))?;
        }

        // Auto-detect: Invidious if a URL is configured, otherwise yt-dlp
        let upstream = match env::var("UPSTREAM_PROVIDER")
            .unwrap_or_else(|_| "auto".to_string())
            .to_lowercase()
            .as_str()
        {
            "invidious" => UpstreamType::Invidious,
            "ytdlp" | "yt-dlp" => UpstreamType::YtDlp,
            _ => {
                if invidious_url.is_some() {
                    UpstreamType::Invidious
                } else {
                    UpstreamType::YtDlp
                }
            }
        };

        if upstream == UpstreamType::Invidious && invidious_url.is_none() {
            return Err("INVIDIOUS_URL is required when UPSTREAM_PROVIDER=invidious".into());
        }

        let ytdlp_path = env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());

        Ok(Config {
            port,
            allowed_origins,
            cache_ttl_secs,
            cache_max_entries,
            cache_sweep_secs,
            upstream,
            invidious_url,
            ytdlp_path,
            upstream_timeout_secs,
            search_page_size,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 10] = [
        "PORT",
        "ALLOWED_ORIGINS",
        "CACHE_TTL_SECS",
        "CACHE_MAX_ENTRIES",
        "CACHE_SWEEP_SECS",
        "UPSTREAM_PROVIDER",
        "INVIDIOUS_URL",
        "YTDLP_PATH",
        "UPSTREAM_TIMEOUT_SECS",
        "SEARCH_PAGE_SIZE",
    ];

    /// Clear every config var, set `set`, run `f`, then restore original state.
    fn with_env(set: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        for k in ALL_VARS {
            // SAFETY: serialized by ENV_LOCK; no other thread modifies env vars concurrently.
            unsafe { std::env::remove_var(k) };
        }
        for (k, v) in set {
            unsafe { std::env::set_var(k, v) };
        }

        f();

        for (k, old) in saved {
            match old {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    #[test]
    fn defaults_when_unset() {
        with_env(&[], || {
            let config = Config::from_env().expect("defaults should load");
            assert_eq!(config.port, 3000);
            assert_eq!(
                config.allowed_origins,
                vec!["http://localhost:5500", "http://127.0.0.1:5500"]
            );
            assert_eq!(config.cache_ttl(), Duration::from_secs(15 * 60));
            assert_eq!(config.cache_max_entries, 10_000);
            assert_eq!(config.cache_sweep_secs, 60);
            assert_eq!(config.upstream, UpstreamType::YtDlp);
            assert_eq!(config.ytdlp_path, "yt-dlp");
            assert!(config.upstream_timeout().is_none());
            assert_eq!(config.search_page_size, 20);
        });
    }

    #[test]
    fn allowed_origins_parsed_and_trimmed() {
        with_env(
            &[("ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com,,")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(
                    config.allowed_origins,
                    vec!["https://a.example.com", "https://b.example.com"]
                );
            },
        );
    }

    #[test]
    fn invalid_port_is_an_error() {
        with_env(&[("PORT", "eighty")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn invidious_auto_detected_from_url() {
        with_env(&[("INVIDIOUS_URL", "https://inv.example.com")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.upstream, UpstreamType::Invidious);
            assert_eq!(config.invidious_url.as_deref(), Some("https://inv.example.com"));
        });
    }

    #[test]
    fn explicit_ytdlp_overrides_invidious_url() {
        with_env(
            &[
                ("INVIDIOUS_URL", "https://inv.example.com"),
                ("UPSTREAM_PROVIDER", "ytdlp"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.upstream, UpstreamType::YtDlp);
            },
        );
    }

    #[test]
    fn invidious_requires_url() {
        with_env(&[("UPSTREAM_PROVIDER", "invidious")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn invalid_invidious_url_is_an_error() {
        with_env(&[("INVIDIOUS_URL", "not a url")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn numeric_overrides_parsed() {
        with_env(
            &[
                ("CACHE_TTL_SECS", "60"),
                ("CACHE_MAX_ENTRIES", "50"),
                ("CACHE_SWEEP_SECS", "0"),
                ("UPSTREAM_TIMEOUT_SECS", "15"),
                ("SEARCH_PAGE_SIZE", "10"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.cache_ttl_secs, 60);
                assert_eq!(config.cache_max_entries, 50);
                assert_eq!(config.cache_sweep_secs, 0);
                assert_eq!(config.upstream_timeout(), Some(Duration::from_secs(15)));
                assert_eq!(config.search_page_size, 10);
            },
        );
    }

    #[test]
    fn parse_origins_drops_blank_entries() {
        assert!(parse_origins(" , ").is_empty());
        assert_eq!(parse_origins("http://x"), vec!["http://x"]);
    }
}
