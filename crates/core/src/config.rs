//! Client, polling, and transfer configuration.
//!
//! All values are passed explicitly into the transport and pipelines at
//! construction, so two clients in one process never share state.

use std::time::Duration;

use crate::error::HelioError;

/// Global production endpoint.
pub const API_URL_GLOBAL: &str = "https://api.helioadditive.com/graphql";
/// Region-restricted (China) endpoint.
pub const API_URL_CHINA: &str = "https://api.helioam.cn/graphql";

/// Client identity sent with every request.
pub const DEFAULT_CLIENT_NAME: &str = "HelioRust";
pub const DEFAULT_CLIENT_VERSION: &str = "1.0.0";

/// Default per-request timeout for envelope calls.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One of the two fixed regional endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Global,
    China,
}

impl Region {
    pub fn api_url(self) -> &'static str {
        match self {
            Self::Global => API_URL_GLOBAL,
            Self::China => API_URL_CHINA,
        }
    }

    /// Parse a region name (`global` / `china`, case-insensitive).
    pub fn parse(name: &str) -> Result<Self, HelioError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "china" | "cn" => Ok(Self::China),
            other => Err(HelioError::Config(format!(
                "Unknown region: '{other}'. Valid regions: global, china"
            ))),
        }
    }
}

/// Configuration for the transport envelope.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GraphQL endpoint URL.
    pub api_url: String,
    /// Personal access token sent as a bearer credential.
    pub token: String,
    pub client_name: String,
    pub client_version: String,
    /// Timeout for a single envelope round trip.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Build a config for the given token and endpoint, using the default
    /// client identity.
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HELIO_API_URL`              | derived from `HELIO_REGION`|
    /// | `HELIO_REGION`               | `global`                   |
    /// | `HELIO_REQUEST_TIMEOUT_SECS` | `60`                       |
    ///
    /// The token is taken as given; see [`crate::credentials`] for sourcing.
    pub fn from_env(token: impl Into<String>) -> Result<Self, HelioError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(HelioError::Config("access token must not be empty".into()));
        }

        let api_url = resolve_api_url(
            None,
            std::env::var("HELIO_API_URL").ok().as_deref(),
            std::env::var("HELIO_REGION").ok().as_deref(),
        )?;

        let request_timeout = match std::env::var("HELIO_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                HelioError::Config("HELIO_REQUEST_TIMEOUT_SECS must be a valid u64".into())
            })?),
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            request_timeout,
            ..Self::new(token, api_url)
        })
    }
}

/// Resolve the endpoint: explicit value, then URL override, then region,
/// then the global default. Blank values are ignored.
pub fn resolve_api_url(
    explicit: Option<&str>,
    env_url: Option<&str>,
    env_region: Option<&str>,
) -> Result<String, HelioError> {
    fn non_blank(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(url) = non_blank(explicit).or_else(|| non_blank(env_url)) {
        return Ok(url.to_string());
    }
    match non_blank(env_region) {
        Some(region) => Ok(Region::parse(region)?.api_url().to_string()),
        None => Ok(Region::default().api_url().to_string()),
    }
}

/// Loop parameters for the polling engine.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed sleep between attempts.
    pub interval: Duration,
    /// Poll-count ceiling; `None` polls until a terminal status.
    pub max_polls: Option<u32>,
    /// Consecutive failed polls tolerated before aborting; `None` means
    /// failures only consume the poll count.
    pub max_consecutive_failures: Option<u32>,
    /// Sleep before the very first poll as well.
    pub delay_first_poll: bool,
}

impl PollConfig {
    /// G-code registration: 2 s interval, 60 polls, sleep before each poll.
    pub fn registration() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_polls: Some(60),
            max_consecutive_failures: None,
            delay_first_poll: true,
        }
    }

    /// Simulation and optimization: 3 s interval, no poll ceiling, abort
    /// after 5 consecutive failures, first poll immediately.
    pub fn job() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_polls: None,
            max_consecutive_failures: Some(5),
            delay_first_poll: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Parameters for presigned uploads and downloads.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub upload_timeout: Duration,
    pub download_timeout: Duration,
    /// Upper bound on bytes written per progress report.
    pub chunk_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            upload_timeout: Duration::from_secs(300),
            download_timeout: Duration::from_secs(300),
            chunk_size: 8 * 1024,
        }
    }
}
