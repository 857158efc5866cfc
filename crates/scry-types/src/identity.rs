use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, ScryError};

/// User-facing player identity, entered as `Name#TAG`.
///
/// The pair keys only the summoner lookup and may change on the platform
/// side at any time; everything downstream joins on the resolved `puuid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiotId {
    pub name: String,
    pub tag: String,
}

impl RiotId {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parse raw `Name#TAG` input, rejecting it before any network call.
    pub fn parse(input: &str) -> Result<Self> {
        let (name, tag) = input.split_once('#').ok_or_else(|| {
            ScryError::Validation("expected a Riot ID like PlayerName#NA1".into())
        })?;
        if tag.contains('#') {
            return Err(ScryError::Validation(
                "a Riot ID has exactly one # separator".into(),
            ));
        }
        let name = name.trim();
        let tag = tag.trim();
        if name.is_empty() || tag.is_empty() {
            return Err(ScryError::Validation(
                "both name and tag are required".into(),
            ));
        }
        Ok(Self::new(name, tag))
    }
}

impl fmt::Display for RiotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.tag)
    }
}
