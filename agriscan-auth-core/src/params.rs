use url::Url;

/// Parameter carrying the authorization code.
pub const CODE: &str = "code";
/// Parameter carrying the post-login destination.
pub const NEXT: &str = "next";
/// Parameter carrying an implicit-flow access token.
pub const ACCESS_TOKEN: &str = "access_token";
/// Parameter carrying an implicit-flow refresh token.
pub const REFRESH_TOKEN: &str = "refresh_token";
/// Parameter carrying a one-time token hash.
pub const TOKEN_HASH: &str = "token_hash";
/// Legacy alias of [`TOKEN_HASH`].
pub const TOKEN: &str = "token";
/// Parameter carrying the one-time token's action type.
pub const TYPE: &str = "type";

/// The merged parameters of one callback URL.
///
/// Built from the query string and the fragment; when both carry the same key the
/// fragment wins. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParameters {
    pairs: Vec<(String, String)>,
}

impl CallbackParameters {
    /// Collect the parameters from a raw fragment and a raw query string.
    ///
    /// Both inputs may carry their leading delimiter (`#` / `?`). A fragment is only
    /// parsed when it is introduced by `#` or passed without any delimiter.
    /// Malformed input never fails; unparseable pairs are skipped.
    pub fn collect(fragment: Option<&str>, query: Option<&str>) -> Self {
        let mut params = Self::default();

        if let Some(query) = query {
            let query = query.strip_prefix('?').unwrap_or(query);
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                // First occurrence wins inside the query string.
                if !params.contains(&key) {
                    params.pairs.push((key.into_owned(), value.into_owned()));
                }
            }
        }

        if let Some(fragment) = fragment {
            let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
            for (key, value) in parse_fragment(fragment) {
                params.set(key, value);
            }
        }

        params
    }

    /// Collect the parameters of a full URL.
    pub fn from_url(url: &Url) -> Self {
        Self::collect(url.fragment(), url.query())
    }

    /// Get a parameter value, even if it is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get a parameter value only if it is present and non-empty.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Whether the key is present at all.
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// The one-time token hash, falling back to the legacy `token` alias.
    pub fn token_hash(&self) -> Option<&str> {
        self.get_non_empty(TOKEN_HASH)
            .or_else(|| self.get_non_empty(TOKEN))
    }

    /// Whether no parameter was collected.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parameter names, for logging without leaking values.
    pub fn keys(&self) -> Vec<&str> {
        self.pairs.iter().map(|(k, _)| k.as_str()).collect()
    }

    fn set(&mut self, key: String, value: String) {
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }
}

/// Split a fragment into `key=value` pairs, percent-decoding values.
///
/// Pairs without a key are ignored. A value that is not valid percent-encoding is
/// kept verbatim.
fn parse_fragment(fragment: &str) -> impl Iterator<Item = (String, String)> + '_ {
    fragment
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                return None;
            }
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((key.to_string(), value))
        })
}
