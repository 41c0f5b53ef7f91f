use zeroize::{Zeroize, ZeroizeOnDrop};

/// Normalize a secret taken from the environment or config file.
///
/// Surrounding whitespace is trimmed and one pair of matching surrounding
/// quotes (`"…"` or `'…'`) is stripped, since deployment tooling frequently
/// quotes values literally. Returns `None` when nothing is left.
pub fn normalize_secret(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|quote| {
            trimmed
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        })
        .unwrap_or(trimmed);
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// Authentication material for inbound deliveries. Wiped from memory on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct HookSecrets {
    token: Option<String>,
    hmac_secret: Option<String>,
}

impl HookSecrets {
    pub fn new(token: Option<&str>, hmac_secret: Option<&str>) -> Self {
        Self {
            token: token.and_then(normalize_secret),
            hmac_secret: hmac_secret.and_then(normalize_secret),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn hmac_secret(&self) -> Option<&str> {
        self.hmac_secret.as_deref()
    }
}

impl std::fmt::Debug for HookSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSecrets")
            .field("token", &self.token.is_some())
            .field("hmac_secret", &self.hmac_secret.is_some())
            .finish()
    }
}
