use std::num::NonZeroUsize;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::error::ConfigError;
use crate::extractor::ExtractOptions;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AQUILA_URL: &str = "https://x.aquila.network/api/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchEngine {
    /// Scrapes the public Google result page.
    Google,
    /// Bing Web Search API, needs a subscription key.
    Bing,
    /// Aquila Network index, needs the public index id as subscription key.
    Aquila,
}

impl SearchEngine {
    pub fn name(&self) -> &'static str {
        match self {
            SearchEngine::Google => "Google",
            SearchEngine::Bing => "Bing",
            SearchEngine::Aquila => "Aquila",
        }
    }
}

/// Options of the `serve` command. Each one may also come from the environment
/// (or a `.env` file).
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// HOSTNAME[:PORT] to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0:8080")]
    pub host: String,

    #[arg(long, env = "SEARCH_ENGINE", value_enum, ignore_case = true, default_value_t = SearchEngine::Google)]
    pub search_engine: SearchEngine,

    /// Credential for the Bing or Aquila backends
    #[arg(long, env = "SEARCH_API_KEY", hide_env_values = true)]
    pub subscription_key: Option<String>,

    #[arg(long, env = "AQUILA_URL", default_value = DEFAULT_AQUILA_URL)]
    pub aquila_url: String,

    /// Return the backend's snippets instead of fetching pages (Bing only)
    #[arg(long, env = "USE_DESCRIPTION_ONLY")]
    pub use_description_only: bool,

    /// Per-page fetch timeout, in seconds
    #[arg(long, env = "REQUESTS_GET_TIMEOUT", default_value_t = 5.0)]
    pub requests_get_timeout: f64,

    /// Timeout of the call to the search backend, in seconds
    #[arg(long, env = "SEARCH_TIMEOUT", default_value_t = 10.0)]
    pub search_timeout: f64,

    /// Overall deadline for the page fetching phase of one query, in seconds
    #[arg(long, env = "REQUEST_DEADLINE")]
    pub request_deadline: Option<f64>,

    #[arg(long, env = "STRIP_HTML_MENUS")]
    pub strip_html_menus: bool,

    #[arg(long, env = "MAX_TEXT_BYTES")]
    pub max_text_bytes: Option<usize>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        ServeArgs {
            host: format!("0.0.0.0:{DEFAULT_PORT}"),
            search_engine: SearchEngine::Google,
            subscription_key: None,
            aquila_url: DEFAULT_AQUILA_URL.to_string(),
            use_description_only: false,
            requests_get_timeout: 5.0,
            search_timeout: 10.0,
            request_deadline: None,
            strip_html_menus: false,
            max_text_bytes: None,
        }
    }
}

/// Backend selection with the settings only that backend understands.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineConfig {
    Google,
    Bing {
        subscription_key: String,
        use_description_only: bool,
    },
    Aquila {
        index_id: String,
        url: String,
    },
}

/// Validated, immutable server settings. Built once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    pub engine: EngineConfig,
    pub fetch_timeout: Duration,
    pub search_timeout: Duration,
    pub request_deadline: Option<Duration>,
    pub extract: ExtractOptions,
}

impl ServerConfig {
    pub fn from_args(args: &ServeArgs) -> Result<ServerConfig, ConfigError> {
        let (hostname, port) = parse_host(&args.host)?;

        let key = args
            .subscription_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let engine = match args.search_engine {
            SearchEngine::Google => EngineConfig::Google,
            SearchEngine::Bing => EngineConfig::Bing {
                subscription_key: key.ok_or(ConfigError::MissingSubscriptionKey {
                    engine: SearchEngine::Bing.name(),
                })?,
                use_description_only: args.use_description_only,
            },
            SearchEngine::Aquila => EngineConfig::Aquila {
                index_id: key.ok_or(ConfigError::MissingSubscriptionKey {
                    engine: SearchEngine::Aquila.name(),
                })?,
                url: args.aquila_url.clone(),
            },
        };

        let max_text_bytes = match args.max_text_bytes {
            Some(n) => Some(NonZeroUsize::new(n).ok_or(ConfigError::InvalidMaxTextBytes)?),
            None => None,
        };

        Ok(ServerConfig {
            hostname,
            port,
            engine,
            fetch_timeout: seconds("requests_get_timeout", args.requests_get_timeout)?,
            search_timeout: seconds("search_timeout", args.search_timeout)?,
            request_deadline: args
                .request_deadline
                .map(|s| seconds("request_deadline", s))
                .transpose()?,
            extract: ExtractOptions {
                strip_html_menus: args.strip_html_menus,
                max_text_bytes,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    pub fn use_description_only(&self) -> bool {
        matches!(
            self.engine,
            EngineConfig::Bing {
                use_description_only: true,
                ..
            }
        )
    }
}

/// Splits `HOSTNAME[:PORT]`, defaulting the port to 8080.
pub fn parse_host(host: &str) -> Result<(String, u16), ConfigError> {
    let invalid = || ConfigError::InvalidHost(host.to_string());
    let (hostname, port) = match host.split_once(':') {
        Some((name, port)) => (name, port.parse::<u16>().map_err(|_| invalid())?),
        None => (host, DEFAULT_PORT),
    };
    if hostname.trim().is_empty() {
        return Err(invalid());
    }
    Ok((hostname.to_string(), port))
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if value <= 0.0 {
        return Err(ConfigError::InvalidTimeout { name, value });
    }
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidTimeout { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_with_port() {
        assert_eq!(
            parse_host("127.0.0.1:9000").unwrap(),
            ("127.0.0.1".to_string(), 9000)
        );
    }

    #[test]
    fn test_parse_host_defaults_port() {
        assert_eq!(
            parse_host("0.0.0.0").unwrap(),
            ("0.0.0.0".to_string(), DEFAULT_PORT)
        );
    }

    #[test]
    fn test_parse_host_rejects_garbage() {
        assert!(matches!(
            parse_host("localhost:http"),
            Err(ConfigError::InvalidHost(_))
        ));
        assert!(matches!(parse_host(":8080"), Err(ConfigError::InvalidHost(_))));
    }

    #[test]
    fn test_seconds_rejects_non_positive() {
        assert!(seconds("t", 0.0).is_err());
        assert!(seconds("t", -1.0).is_err());
        assert_eq!(seconds("t", 0.5).unwrap(), Duration::from_millis(500));
    }
}
