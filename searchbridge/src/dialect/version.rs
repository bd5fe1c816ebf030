//! Engine version strings
//!
//! Accepted forms: `7`, `7.10`, `7.10.2`, `7.10.2-SNAPSHOT`, and the same
//! prefixed with a distribution: `elastic:8.11`, `opensearch:2.11.0`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Elastic,
    OpenSearch,
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distribution::Elastic => write!(f, "elastic"),
            Distribution::OpenSearch => write!(f, "opensearch"),
        }
    }
}

impl std::str::FromStr for Distribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "elastic" | "elasticsearch" => Ok(Distribution::Elastic),
            "opensearch" => Ok(Distribution::OpenSearch),
            other => Err(Error::Configuration(format!(
                "unknown engine distribution '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineVersion {
    pub distribution: Distribution,
    pub major: u32,
    pub minor: Option<u32>,
    pub micro: Option<u32>,
    pub qualifier: Option<String>,
}

impl EngineVersion {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::Configuration(format!("invalid engine version '{}': {}", input, reason))
        };

        let trimmed = input.trim();
        let (distribution, rest) = match trimmed.split_once(':') {
            Some((dist, rest)) => (dist.parse()?, rest),
            None => (Distribution::Elastic, trimmed),
        };

        let (numbers, qualifier) = match rest.split_once('-') {
            Some((numbers, qualifier)) if !qualifier.is_empty() => {
                (numbers, Some(qualifier.to_string()))
            }
            Some(_) => return Err(invalid("empty qualifier")),
            None => (rest, None),
        };

        let mut parts = numbers.split('.');
        let mut component = |name: &str| -> Result<Option<u32>> {
            match parts.next() {
                None => Ok(None),
                Some(p) => p
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| invalid(&format!("{} component '{}' is not a number", name, p))),
            }
        };

        let major = component("major")?.ok_or_else(|| invalid("missing major version"))?;
        let minor = component("minor")?;
        let micro = component("micro")?;
        if parts.next().is_some() {
            return Err(invalid("too many components"));
        }

        Ok(Self {
            distribution,
            major,
            minor,
            micro,
            qualifier,
        })
    }

    /// Whether every component set in `self` equals the same component in `actual`.
    pub fn is_compatible_with(&self, actual: &EngineVersion) -> bool {
        fn same(expected: Option<u32>, actual: Option<u32>) -> bool {
            expected.is_none() || expected == actual
        }

        self.distribution == actual.distribution
            && self.major == actual.major
            && same(self.minor, actual.minor)
            && same(self.micro, actual.micro)
    }
}

impl std::str::FromStr for EngineVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.distribution, self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{}", minor)?;
        }
        if let Some(micro) = self.micro {
            write!(f, ".{}", micro)?;
        }
        if let Some(qualifier) = &self.qualifier {
            write!(f, "-{}", qualifier)?;
        }
        Ok(())
    }
}
