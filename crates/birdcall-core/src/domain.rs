use std::{fmt, path::PathBuf, str::FromStr, sync::OnceLock};

use regex::Regex;
use tracing::warn;

use crate::{errors::Error, Result};

// ============== Credentials ==============

/// The four OAuth1 secrets identifying the application and the acting account.
///
/// Values are trimmed on construction; a blank value is a configuration error.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
    access_key: String,
    access_secret: String,
}

impl Credentials {
    pub fn new(
        consumer_key: impl AsRef<str>,
        consumer_secret: impl AsRef<str>,
        access_key: impl AsRef<str>,
        access_secret: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            consumer_key: required(consumer_key.as_ref(), "Consumer Key")?,
            consumer_secret: required(consumer_secret.as_ref(), "Consumer Secret")?,
            access_key: required(access_key.as_ref(), "Access Key")?,
            access_secret: required(access_secret.as_ref(), "Access Secret")?,
        })
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn access_secret(&self) -> &str {
        &self.access_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_key", &"<redacted>")
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

fn required(raw: &str, what: &str) -> Result<String> {
    let v = raw.trim();
    if v.is_empty() {
        let msg = format!("an invalid Twitter {what} was specified");
        warn!("{msg}");
        return Err(Error::Config(msg));
    }
    Ok(v.to_string())
}

// ============== Targets ==============

fn handle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*@?([A-Z0-9_]+)$").expect("valid regex"))
}

/// A validated recipient handle, stored without the leading `@`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle(String);

impl Handle {
    pub fn parse(raw: &str) -> Option<Self> {
        handle_re()
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache/dedup key; handles are case-insensitive on the platform.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Who a dispatch is addressed to.
///
/// `Myself` and `Invalid` are both "no explicit handles", but only `Myself` sends:
/// `Invalid` means the caller asked for specific users and none of them parsed.
/// It keeps the rejected tokens so the endpoint URL still names them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Targets {
    Myself,
    Users(Vec<Handle>),
    Invalid(Vec<String>),
}

impl Targets {
    /// Validate raw target strings. Each entry may itself hold several handles
    /// separated by commas or whitespace.
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut handles: Vec<Handle> = Vec::new();
        let mut dropped: Vec<String> = Vec::new();

        for token in raw.into_iter().flat_map(|s| split_list(s.as_ref())) {
            match Handle::parse(&token) {
                Some(h) => {
                    if !handles.iter().any(|x| x.key() == h.key()) {
                        handles.push(h);
                    }
                }
                None => {
                    warn!("Dropped invalid Twitter user ({token}) specified.");
                    dropped.push(token);
                }
            }
        }

        match (handles.is_empty(), dropped.is_empty()) {
            (true, false) => Targets::Invalid(dropped),
            (true, true) => Targets::Myself,
            (false, _) => Targets::Users(handles),
        }
    }

    pub fn handles(&self) -> &[Handle] {
        match self {
            Targets::Users(h) => h,
            _ => &[],
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Targets::Invalid(_))
    }

    /// Tokens that failed validation when no handle survived.
    pub fn rejected(&self) -> &[String] {
        match self {
            Targets::Invalid(r) => r,
            _ => &[],
        }
    }
}

/// Split a comma/whitespace separated list, dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============== Mode ==============

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    #[default]
    DirectMessage,
    PublicPost,
}

impl DispatchMode {
    pub const ALL: [DispatchMode; 2] = [DispatchMode::DirectMessage, DispatchMode::PublicPost];

    pub fn as_str(self) -> &'static str {
        match self {
            DispatchMode::DirectMessage => "dm",
            DispatchMode::PublicPost => "tweet",
        }
    }

    /// Maximum characters per message body.
    pub fn body_max_len(self) -> usize {
        match self {
            DispatchMode::DirectMessage => 10_000,
            DispatchMode::PublicPost => 280,
        }
    }
}

impl FromStr for DispatchMode {
    type Err = Error;

    /// Prefix match, so `d` selects `dm` and `tw` selects `tweet`. Empty input is the default.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(Self::default());
        }
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().starts_with(&wanted))
            .ok_or_else(|| {
                Error::Config(format!("the Twitter message mode specified ({s}) is invalid"))
            })
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============== Remote ids ==============

/// Numeric account id on the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media id returned by the upload endpoint (kept as the decimal string the API returns).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaId(pub String);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One successfully uploaded attachment. Lives for a single dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadDescriptor {
    pub media_id: MediaId,
    pub file_name: String,
    pub mime_type: String,
    pub path: PathBuf,
}
