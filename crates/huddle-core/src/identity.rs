//! Local participant identity.
//!
//! An identity is a user-chosen base name plus a short random suffix, rendered
//! as `"<base_name>-<suffix>"`. The suffix keeps two people who both type
//! "ana" from colliding in the room. It is regenerated on every submission.
//!
//! # Invariants
//!
//! - The separator never appears inside a base name. User input has every
//!   separator rewritten to [`REPLACEMENT`] before it is accepted, so splitting
//!   a rendered identity at the first separator always recovers the base name.
//! - A base name is never blank.

use std::fmt;

use thiserror::Error;

use crate::{
    env::Environment,
    store::{IdentityStore, StoreError},
};

/// Joins base name and suffix in the rendered form.
pub const SEPARATOR: char = '-';

/// Substituted for [`SEPARATOR`] in user input.
pub const REPLACEMENT: char = '_';

/// Number of characters in a generated suffix.
pub const SUFFIX_LEN: usize = 5;

const SUFFIX_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Largest multiple of the alphabet size that fits in a byte. Bytes at or
/// above it are discarded so every character is equally likely.
const SUFFIX_REJECT_AT: u8 = 252;

/// Errors from identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Submitted base name was empty or whitespace.
    #[error("display name is blank")]
    Blank,

    /// Persisting the identity failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Display identity of the local participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    base_name: String,
    suffix: String,
}

impl Identity {
    /// Parse a rendered identity (`"<base_name>-<suffix>"`).
    ///
    /// Returns `None` when there is no separator or either part is blank.
    pub fn parse(rendered: &str) -> Option<Self> {
        let (base_name, suffix) = rendered.trim().split_once(SEPARATOR)?;
        if base_name.trim().is_empty() || suffix.is_empty() {
            return None;
        }
        Some(Self { base_name: base_name.to_string(), suffix: suffix.to_string() })
    }

    /// User-chosen part of the name.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Generated uniqueness suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Rendered form used as the room username.
    pub fn rendered(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.base_name, self.suffix)
    }
}

/// Rewrite separators in raw user input.
///
/// Applied to every keystroke of the draft and again at submission.
pub fn normalize_input(raw: &str) -> String {
    raw.replace(SEPARATOR, &REPLACEMENT.to_string())
}

/// Substring before the first separator, or the whole input.
pub fn strip_suffix(name: &str) -> &str {
    name.split_once(SEPARATOR).map_or(name, |(base, _)| base)
}

/// Draw a fresh base-36 suffix from the environment RNG.
pub fn generate_suffix<E: Environment>(env: &E) -> String {
    let mut suffix = String::with_capacity(SUFFIX_LEN);
    let mut buffer = [0u8; SUFFIX_LEN * 2];

    while suffix.len() < SUFFIX_LEN {
        env.random_bytes(&mut buffer);
        for byte in buffer {
            if byte >= SUFFIX_REJECT_AT {
                continue;
            }
            suffix.push(char::from(SUFFIX_ALPHABET[usize::from(byte % 36)]));
            if suffix.len() == SUFFIX_LEN {
                break;
            }
        }
    }

    suffix
}

/// Owns the identity store and mints new identities.
///
/// Callers hand it names and get [`Identity`] values back; they never touch
/// the store directly.
pub struct IdentityManager<E, S> {
    env: E,
    store: S,
}

impl<E: Environment, S: IdentityStore> IdentityManager<E, S> {
    /// Create a manager over `store`.
    pub fn new(env: E, store: S) -> Self {
        Self { env, store }
    }

    /// Read the persisted identity.
    ///
    /// Unreadable or malformed values are logged and reported as absent, which
    /// sends the user to the entry prompt.
    pub fn load(&self) -> Option<Identity> {
        let raw = match self.store.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("failed to read stored identity: {}", e);
                return None;
            },
        };

        let identity = Identity::parse(&raw);
        if identity.is_none() {
            tracing::warn!("ignoring malformed stored identity {:?}", raw);
        }
        identity
    }

    /// Accept a submitted base name.
    ///
    /// When `editing`, anything from the first separator on is dropped first.
    /// The name is trimmed and normalized, a new suffix is drawn and the result
    /// is persisted.
    pub fn submit(&mut self, base_name: &str, editing: bool) -> Result<Identity, IdentityError> {
        let identity = self.mint(base_name, editing)?;
        self.store.save(&identity.rendered())?;
        Ok(identity)
    }

    /// Like [`Self::submit`], but a store failure is logged instead of
    /// returned. The identity is used for this session either way.
    pub fn submit_lenient(
        &mut self,
        base_name: &str,
        editing: bool,
    ) -> Result<Identity, IdentityError> {
        let identity = self.mint(base_name, editing)?;
        if let Err(e) = self.store.save(&identity.rendered()) {
            tracing::error!("failed to persist identity {}: {}", identity, e);
        }
        Ok(identity)
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn mint(&self, base_name: &str, editing: bool) -> Result<Identity, IdentityError> {
        let base = if editing { strip_suffix(base_name) } else { base_name };
        let base = normalize_input(base.trim());
        if base.is_empty() {
            return Err(IdentityError::Blank);
        }

        Ok(Identity { base_name: base, suffix: generate_suffix(&self.env) })
    }
}
