use std::{collections::HashMap, slice};

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    domain::{Handle, UserId},
    gateway::{HttpGateway, Payload},
    ports::Method,
};

/// Handles accepted per lookup request by the platform.
pub const LOOKUP_BATCH_LIMIT: usize = 100;

/// Resolved recipients in the order they were asked for: screen name as reported
/// by the platform → account id. Names are unique case-insensitively.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recipients(Vec<(String, UserId)>);

impl Recipients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless the name is already present; returns whether it was added.
    pub fn insert(&mut self, name: String, id: UserId) -> bool {
        if self.0.iter().any(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            return false;
        }
        self.0.push((name, id));
        true
    }

    pub fn get(&self, name: &str) -> Option<&UserId> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, (String, UserId)> {
        self.0.iter()
    }
}

impl<const N: usize> From<[(String, UserId); N]> for Recipients {
    fn from(pairs: [(String, UserId); N]) -> Self {
        let mut out = Self::new();
        for (name, id) in pairs {
            out.insert(name, id);
        }
        out
    }
}

impl<'a> IntoIterator for &'a Recipients {
    type Item = &'a (String, UserId);
    type IntoIter = slice::Iter<'a, (String, UserId)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Maps handles (and "self") to account ids, remembering every answer.
///
/// The caches only grow; entries are never evicted for the lifetime of the resolver.
#[derive(Clone, Debug, Default)]
pub struct IdentityResolver {
    // lowercase handle -> (screen name, id)
    users: HashMap<String, (String, UserId)>,
    myself: Option<(String, UserId)>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, handle: &str) -> Option<UserId> {
        self.users
            .get(&handle.trim_start_matches('@').to_lowercase())
            .map(|(_, id)| *id)
    }

    /// Identity owning the credentials. An empty map means the lookup failed.
    pub async fn resolve_self(
        &mut self,
        gateway: &mut HttpGateway,
        url: &str,
        use_cache: bool,
    ) -> Recipients {
        if use_cache {
            if let Some((name, id)) = &self.myself {
                return Recipients::from([(name.clone(), *id)]);
            }
        }

        let resp = gateway.send(Method::Get, url, Payload::None).await;
        if !resp.ok {
            return Recipients::new();
        }

        let Some((name, id)) = parse_user(&resp.body) else {
            debug!("self lookup returned no usable identity");
            return Recipients::new();
        };

        self.myself = Some((name.clone(), id));
        self.remember(&name, id);
        Recipients::from([(name, id)])
    }

    /// Resolve explicit handles in lookups of at most [`LOOKUP_BATCH_LIMIT`].
    ///
    /// Failed lookups are skipped; whatever resolved is returned and cached even
    /// when `use_cache` is off. An empty map means nothing resolved.
    pub async fn resolve_many(
        &mut self,
        gateway: &mut HttpGateway,
        url: &str,
        handles: &[Handle],
        use_cache: bool,
    ) -> Recipients {
        // lowercase handle -> (screen name, id), from the cache or this call's lookups
        let mut found: HashMap<String, (String, UserId)> = HashMap::new();

        let mut wanted: Vec<&Handle> = Vec::new();
        let mut pending: Vec<&Handle> = Vec::new();
        for h in handles {
            if wanted.iter().any(|w| w.key() == h.key()) {
                continue;
            }
            wanted.push(h);
            if use_cache {
                if let Some(hit) = self.users.get(&h.key()) {
                    found.insert(h.key(), hit.clone());
                    continue;
                }
            }
            pending.push(h);
        }

        for (no, chunk) in pending.chunks(LOOKUP_BATCH_LIMIT).enumerate() {
            let names = chunk
                .iter()
                .map(|h| h.as_str())
                .collect::<Vec<_>>()
                .join(",");

            let resp = gateway
                .send(
                    Method::Get,
                    url,
                    Payload::Query(vec![("screen_name".to_string(), names)]),
                )
                .await;

            let Value::Array(entries) = &resp.body else {
                warn!("user lookup batch {} returned no list; skipping", no + 1);
                continue;
            };
            if !resp.ok {
                warn!("user lookup batch {} failed; skipping", no + 1);
                continue;
            }

            for (name, id) in entries.iter().filter_map(parse_user) {
                self.remember(&name, id);
                found.insert(name.to_lowercase(), (name, id));
            }
        }

        let mut results = Recipients::new();
        for h in wanted {
            match found.remove(&h.key()) {
                Some((name, id)) => {
                    results.insert(name, id);
                }
                None => debug!("no account found for {h}"),
            }
        }
        results
    }

    fn remember(&mut self, name: &str, id: UserId) {
        self.users
            .insert(name.to_lowercase(), (name.to_string(), id));
    }
}

fn parse_user(v: &Value) -> Option<(String, UserId)> {
    let name = v.get("screen_name")?.as_str()?.to_string();
    let id = v
        .get("id")
        .and_then(Value::as_u64)
        .or_else(|| v.get("id_str")?.as_str()?.parse().ok())?;
    Some((name, UserId(id)))
}
