//! `x://ckey/csecret/akey/asecret/@target?mode=&batch=&cache=&to=` codec.

use std::{collections::HashMap, fmt, str::FromStr};

use url::Url;

use crate::{
    config::parse_bool,
    domain::{Credentials, DispatchMode, Targets},
    errors::Error,
    Result,
};

pub const SCHEMES: [&str; 3] = ["x", "twitter", "tweet"];

/// Everything needed to build a dispatcher for one account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub credentials: Credentials,
    pub mode: DispatchMode,
    pub targets: Targets,
    /// Reuse identity lookups across dispatches.
    pub cache: bool,
    /// Group up to four images per post.
    pub batch: bool,
}

impl Endpoint {
    pub fn new(credentials: Credentials, targets: Targets) -> Self {
        Self {
            credentials,
            mode: DispatchMode::default(),
            targets,
            cache: true,
            batch: true,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::Config(format!("invalid Twitter URL: {e}")))?;

        let scheme = url.scheme().to_lowercase();
        if !SCHEMES.contains(&scheme.as_str()) {
            return Err(Error::Config(format!(
                "unsupported Twitter URL scheme: {scheme}"
            )));
        }

        let ckey = decode(url.host_str().unwrap_or_default());
        let mut segments = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(decode).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter();

        let csecret = segments.next().unwrap_or_default();
        let akey = segments.next().unwrap_or_default();
        let asecret = segments.next().unwrap_or_default();
        let credentials = Credentials::new(ckey, csecret, akey, asecret)?;

        let mut raw_targets: Vec<String> = Vec::new();
        if !url.username().is_empty() {
            raw_targets.push(decode(url.username()));
        }
        raw_targets.extend(segments);

        let query: HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
            .collect();
        let param = |key: &str| query.get(key).filter(|v| !v.trim().is_empty());

        let mode = match param("mode") {
            Some(m) => m.parse()?,
            None if scheme.starts_with("tweet") => DispatchMode::PublicPost,
            None => DispatchMode::default(),
        };
        let cache = param("cache").map(|v| parse_bool(v, true)).unwrap_or(true);
        let batch = param("batch").map(|v| parse_bool(v, true)).unwrap_or(true);

        if let Some(to) = param("to") {
            raw_targets.push(to.clone());
        }

        Ok(Self {
            credentials,
            mode,
            targets: Targets::parse(raw_targets),
            cache,
            batch,
        })
    }

    /// Serialize back to URL form. With `privacy`, keys are abbreviated and secrets hidden.
    pub fn to_url(&self, privacy: bool) -> String {
        let c = &self.credentials;
        // Rejected tokens are written back so re-parsing stays Invalid instead of Myself.
        let targets = if self.targets.is_invalid() {
            self.targets
                .rejected()
                .iter()
                .map(|t| encode(t))
                .collect::<Vec<_>>()
        } else {
            self.targets
                .handles()
                .iter()
                .map(|h| format!("@{}", encode(h.as_str())))
                .collect()
        }
        .join("/");

        format!(
            "x://{}/{}/{}/{}/{}?mode={}&batch={}&cache={}",
            shown(c.consumer_key(), privacy, false),
            shown(c.consumer_secret(), privacy, true),
            shown(c.access_key(), privacy, false),
            shown(c.access_secret(), privacy, true),
            targets,
            self.mode.as_str(),
            yes_no(self.batch),
            yes_no(self.cache),
        )
    }

    /// Number of recipients a dispatch addresses (self counts as one).
    pub fn target_count(&self) -> usize {
        match self.targets.handles().len() {
            0 => 1,
            n => n,
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url(true))
    }
}

fn shown(value: &str, privacy: bool, secret: bool) -> String {
    if !privacy {
        return encode(value);
    }
    if secret {
        return "****".to_string();
    }
    let mut chars = value.chars();
    let first = chars.next().map(String::from).unwrap_or_default();
    let last = chars.last().map(String::from).unwrap_or_default();
    format!("{}...{}", encode(&first), encode(&last))
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Handle;

    #[test]
    fn parses_full_url() {
        let e = Endpoint::parse("x://ckey/csecret/akey/asecret/@alice/bob?mode=t&batch=no&cache=off")
            .unwrap();
        assert_eq!(e.credentials.consumer_key(), "ckey");
        assert_eq!(e.credentials.access_secret(), "asecret");
        assert_eq!(e.mode, DispatchMode::PublicPost);
        assert!(!e.batch);
        assert!(!e.cache);
        assert_eq!(
            e.targets,
            Targets::Users(vec![
                Handle::parse("alice").unwrap(),
                Handle::parse("bob").unwrap()
            ])
        );
        assert_eq!(e.target_count(), 2);
    }

    #[test]
    fn defaults_to_dm_to_self() {
        let e = Endpoint::parse("twitter://ckey/csecret/akey/asecret").unwrap();
        assert_eq!(e.mode, DispatchMode::DirectMessage);
        assert_eq!(e.targets, Targets::Myself);
        assert!(e.cache && e.batch);
        assert_eq!(e.target_count(), 1);
    }

    #[test]
    fn tweet_scheme_implies_post_mode() {
        let e = Endpoint::parse("tweet://ckey/csecret/akey/asecret").unwrap();
        assert_eq!(e.mode, DispatchMode::PublicPost);

        let e = Endpoint::parse("tweet://ckey/csecret/akey/asecret?mode=dm").unwrap();
        assert_eq!(e.mode, DispatchMode::DirectMessage);
    }

    #[test]
    fn user_and_to_param_add_targets() {
        let e = Endpoint::parse("x://carol@ckey/csecret/akey/asecret/@dave?to=erin,frank").unwrap();
        let names: Vec<&str> = e.targets.handles().iter().map(Handle::as_str).collect();
        assert_eq!(names, vec!["carol", "dave", "erin", "frank"]);
    }

    #[test]
    fn only_bad_targets_is_invalid() {
        let e = Endpoint::parse("x://ckey/csecret/akey/asecret/%23nope").unwrap();
        assert_eq!(e.targets, Targets::Invalid(vec!["#nope".to_string()]));
    }

    #[test]
    fn missing_secret_is_config_error() {
        assert!(matches!(
            Endpoint::parse("x://ckey/csecret/akey"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Endpoint::parse("mailto://ckey/csecret/akey/asecret"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Endpoint::parse("x://ckey/csecret/akey/asecret?mode=bogus"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn round_trip_preserves_everything() {
        let mut e = Endpoint::new(
            Credentials::new("Ck3y", "sec/ret+=", "123-AbC", "a s&cret").unwrap(),
            Targets::parse(["zed", "@Amy", "bob_2"]),
        );
        e.mode = DispatchMode::PublicPost;
        e.batch = false;

        let url = e.to_url(false);
        let back = Endpoint::parse(&url).unwrap();
        assert_eq!(back, e);
        assert_eq!(back.to_url(false), url);
    }

    #[test]
    fn invalid_targets_survive_a_round_trip() {
        let e = Endpoint::parse("x://ckey/csecret/akey/asecret/%23nope/bad-one").unwrap();
        assert!(e.targets.is_invalid());

        let url = e.to_url(false);
        assert!(url.starts_with("x://ckey/csecret/akey/asecret/%23nope/bad-one?"), "{url}");
        let back = Endpoint::parse(&url).unwrap();
        assert_eq!(back.targets, e.targets);
        assert_ne!(back.targets, Targets::Myself);
    }

    #[test]
    fn privacy_hides_secrets() {
        let e = Endpoint::parse("x://consumer/topsecret/access/alsosecret/@amy").unwrap();
        let shown = e.to_string();
        assert!(!shown.contains("topsecret"));
        assert!(!shown.contains("alsosecret"));
        assert!(shown.starts_with("x://c...r/****/a...s/****/@amy?"));
    }
}
