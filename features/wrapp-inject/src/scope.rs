//! Lifetime policies for resolved instances
//!
//! | Scope     | Cached in                                  |
//! |-----------|--------------------------------------------|
//! | Transient | nothing, every request builds a new value  |
//! | Local     | the cache of one top-level resolve call    |
//! | Singleton | the registry, for as long as it lives      |

use std::{fmt, str::FromStr};

use crate::errors::ParseScopeError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Scope {
    /// A new instance for every request
    Transient,
    /// One instance per top-level resolve call
    #[default]
    Local,
    /// One instance per registry
    Singleton,
}

impl Scope {
    /// Returns true if instances of this scope are reused
    pub fn is_cached(self) -> bool {
        !matches!(self, Scope::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Transient => "transient",
            Scope::Local => "local",
            Scope::Singleton => "singleton",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transient" => Ok(Scope::Transient),
            "local" => Ok(Scope::Local),
            "singleton" => Ok(Scope::Singleton),
            _ => Err(ParseScopeError(s.to_string())),
        }
    }
}
