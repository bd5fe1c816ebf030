//! Version → dialect selection

use super::{Dialect, DialectKind, Distribution, EngineVersion};
use crate::config::ClientConfig;
use crate::orchestrator::execute;
use crate::transport::Transport;
use crate::work::ClusterVersionWork;
use crate::{Error, Result};
use std::sync::Arc;

/// Matches engine versions against the supported release families.
pub struct DialectRegistry;

impl DialectRegistry {
    /// Pick the dialect for `version`; there is no fallback for unknown versions.
    pub fn resolve(version: &EngineVersion) -> Result<Dialect> {
        let kind = Self::match_kind(version)?;
        tracing::info!("Selected dialect {} for engine {}", kind, version);
        Ok(Dialect::new(kind, version.clone()))
    }

    fn match_kind(version: &EngineVersion) -> Result<DialectKind> {
        let unsupported = || {
            Error::Configuration(format!(
                "engine version {} is not supported (supported: elastic 5.6, 6.x, 7.x, 8.x; opensearch 1.x, 2.x)",
                version
            ))
        };
        let ambiguous = || {
            Error::Configuration(format!(
                "engine version {} is ambiguous: configure at least major.minor for this release family",
                version
            ))
        };

        match (version.distribution, version.major) {
            (Distribution::Elastic, 5) => match version.minor {
                Some(6) => Ok(DialectKind::Es56),
                Some(_) => Err(unsupported()),
                None => Err(ambiguous()),
            },
            (Distribution::Elastic, 6) => match version.minor {
                Some(0..=3) => Ok(DialectKind::Es60),
                Some(4..=8) => Ok(DialectKind::Es64),
                Some(_) => Err(unsupported()),
                None => Err(ambiguous()),
            },
            (Distribution::Elastic, 7 | 8) => Ok(DialectKind::Es7),
            (Distribution::OpenSearch, 1 | 2) => Ok(DialectKind::Es7),
            _ => Err(unsupported()),
        }
    }

    /// Determine the engine version and select the dialect.
    ///
    /// With `version_check` the cluster is asked for its version and any
    /// configured version must agree with it; without it the configured
    /// version alone decides and no request is sent.
    pub async fn bootstrap(config: &ClientConfig, transport: &dyn Transport) -> Result<Arc<Dialect>> {
        let configured = config
            .version
            .as_deref()
            .map(EngineVersion::parse)
            .transpose()?;

        let version = if config.version_check {
            let detected = execute(transport, ClusterVersionWork::new(), None).await?;
            if let Some(expected) = &configured {
                if !expected.is_compatible_with(&detected) {
                    return Err(Error::Configuration(format!(
                        "configured engine version {} does not match the cluster version {}",
                        expected, detected
                    )));
                }
            }
            detected
        } else {
            configured.ok_or_else(|| {
                Error::Configuration(
                    "an engine version must be configured when version_check is disabled".into(),
                )
            })?
        };

        Ok(Arc::new(Self::resolve(&version)?))
    }
}
