use std::{env, fs, path::Path, time::Duration};

use url::Url;

use crate::{errors::Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";
pub const DEFAULT_UPLOAD_BASE: &str = "https://upload.twitter.com/1.1";

/// Typed runtime configuration, loaded from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    /// Endpoint URL (`x://ckey/csecret/akey/asecret/...`), if configured.
    pub url: Option<String>,
    pub api: ApiEndpoints,

    // Transport
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub verify_tls: bool,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            api: ApiEndpoints::default(),
            connect_timeout: Duration::from_secs(4),
            request_timeout: Duration::from_secs(10),
            verify_tls: true,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let defaults = Self::default();

        let api_base = env_str("BIRDCALL_API_BASE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let upload_base = env_str("BIRDCALL_UPLOAD_BASE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_UPLOAD_BASE.to_string());

        let cfg = Self {
            url: env_str("BIRDCALL_URL").and_then(non_empty),
            api: ApiEndpoints::new(&api_base, &upload_base),
            connect_timeout: env_u64("BIRDCALL_CONNECT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            request_timeout: env_u64("BIRDCALL_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            verify_tls: env_str("BIRDCALL_VERIFY_TLS")
                .map(|s| parse_bool(&s, true))
                .unwrap_or(defaults.verify_tls),
            user_agent: env_str("BIRDCALL_USER_AGENT")
                .and_then(non_empty)
                .unwrap_or(defaults.user_agent),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the transport cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(Error::Config(
                "BIRDCALL_CONNECT_TIMEOUT_SECS and BIRDCALL_TIMEOUT_SECS must be positive"
                    .to_string(),
            ));
        }
        for (what, endpoint) in [
            ("BIRDCALL_API_BASE", &self.api.post),
            ("BIRDCALL_UPLOAD_BASE", &self.api.media_upload),
        ] {
            let parsed = Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("{what} is not a valid URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!("{what} must be an http(s) URL")));
            }
        }
        Ok(())
    }
}

/// Remote endpoints consumed by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub lookup: String,
    pub whoami: String,
    pub direct_message: String,
    pub post: String,
    pub media_upload: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_UPLOAD_BASE)
    }
}

impl ApiEndpoints {
    pub fn new(api_base: &str, upload_base: &str) -> Self {
        let api = api_base.trim_end_matches('/');
        let upload = upload_base.trim_end_matches('/');
        Self {
            lookup: format!("{api}/users/lookup.json"),
            whoami: format!("{api}/account/verify_credentials.json"),
            direct_message: format!("{api}/direct_messages/events/new.json"),
            post: format!("{api}/statuses/update.json"),
            media_upload: format!("{upload}/media/upload.json"),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("birdcall/{}", env!("CARGO_PKG_VERSION"))
}

/// Lenient boolean parsing (`yes/no`, `true/false`, `1/0`, `on/off`).
pub fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" | "enable" | "enabled" => true,
        "0" | "false" | "no" | "n" | "off" | "disable" | "disabled" => false,
        _ => default,
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}
