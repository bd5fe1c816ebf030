//! Index lifecycle management
//!
//! Each logical index moves through these states:
//! - `Creating -> Created`, or `AlreadyExists` when another process wins the race
//! - `Validating -> Valid`, or a schema mismatch error naming the offending fields
//! - `RollingOver -> RolledOver`: a new generation takes over the write alias
//! - `Destroyed` after an explicit drop; every later operation is rejected
//!
//! Operations on one logical index are serialized by a process-local lock.

mod metadata;
mod validator;

pub use metadata::{AliasMetadata, ExistingIndexMetadata};
pub use validator::{
    SchemaValidator, ValidationFailure, ValidationFailureKind, ValidationReport,
};

use crate::config::LifecycleConfig;
use crate::dialect::Dialect;
use crate::metrics;
use crate::naming::{IndexNames, IndexNamingStrategy};
use crate::orchestrator::execute;
use crate::schema::IndexSchema;
use crate::transport::Transport;
use crate::work::{AliasAction, AliasDefinition, Work};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What the backend does with each index at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStrategy {
    /// Leave the cluster alone
    None,
    /// Fail unless the index exists and matches the schema
    Validate,
    /// Create missing indexes, never look at existing ones
    Create,
    #[default]
    CreateOrValidate,
    /// Create missing indexes, merge additive mapping changes into existing ones
    CreateOrUpdate,
    DropAndCreate,
    /// Like `drop-and-create`, and drop again when the backend stops
    DropAndCreateAndDrop,
}

impl LifecycleStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStrategy::None => "none",
            LifecycleStrategy::Validate => "validate",
            LifecycleStrategy::Create => "create",
            LifecycleStrategy::CreateOrValidate => "create-or-validate",
            LifecycleStrategy::CreateOrUpdate => "create-or-update",
            LifecycleStrategy::DropAndCreate => "drop-and-create",
            LifecycleStrategy::DropAndCreateAndDrop => "drop-and-create-and-drop",
        }
    }
}

impl std::fmt::Display for LifecycleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecycleStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(LifecycleStrategy::None),
            "validate" => Ok(LifecycleStrategy::Validate),
            "create" => Ok(LifecycleStrategy::Create),
            "create-or-validate" => Ok(LifecycleStrategy::CreateOrValidate),
            "create-or-update" => Ok(LifecycleStrategy::CreateOrUpdate),
            "drop-and-create" => Ok(LifecycleStrategy::DropAndCreate),
            "drop-and-create-and-drop" => Ok(LifecycleStrategy::DropAndCreateAndDrop),
            other => Err(Error::Configuration(format!(
                "unknown lifecycle strategy '{}'",
                other
            ))),
        }
    }
}

/// Index health as reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Green,
    Yellow,
    Red,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Green => "green",
            IndexStatus::Yellow => "yellow",
            IndexStatus::Red => "red",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "green" => Some(IndexStatus::Green),
            "yellow" => Some(IndexStatus::Yellow),
            "red" => Some(IndexStatus::Red),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            IndexStatus::Red => 0,
            IndexStatus::Yellow => 1,
            IndexStatus::Green => 2,
        }
    }

    /// Whether this status is at least as healthy as `required`
    pub fn satisfies(&self, required: IndexStatus) -> bool {
        self.rank() >= required.rank()
    }
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateIndexResult {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Not touched by this manager yet
    Unknown,
    Creating,
    Created,
    AlreadyExists,
    Validating,
    Valid,
    Updating,
    RollingOver,
    RolledOver,
    Dropping,
    Destroyed,
}

/// Result of a rollover operation
#[derive(Debug, Clone, Serialize)]
pub struct RolloverResult {
    pub logical: String,
    /// Index that held the write alias before the rollover
    pub old_index: String,
    /// Index that holds it now
    pub new_index: String,
    pub old_dropped: bool,
    pub rolled_over_at: DateTime<Utc>,
}

/// Reverts the state of a logical index if an operation does not complete.
struct StateGuard<'a> {
    states: &'a Mutex<HashMap<String, LifecycleState>>,
    logical: &'a str,
    previous: LifecycleState,
    committed: bool,
}

impl StateGuard<'_> {
    fn commit(mut self, state: LifecycleState) {
        self.states.lock().insert(self.logical.to_string(), state);
        self.committed = true;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.states
                .lock()
                .insert(self.logical.to_string(), self.previous);
        }
    }
}

/// Creates, validates, updates, rolls over and drops physical indexes and
/// their aliases.
pub struct IndexLifecycleManager {
    transport: Arc<dyn Transport>,
    dialect: Arc<Dialect>,
    naming: Arc<dyn IndexNamingStrategy>,
    config: LifecycleConfig,
    cancel: Option<CancellationToken>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    states: Mutex<HashMap<String, LifecycleState>>,
}

impl IndexLifecycleManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        dialect: Arc<Dialect>,
        naming: Arc<dyn IndexNamingStrategy>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            transport,
            dialect,
            naming,
            config,
            cancel: None,
            locks: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Abort in-flight requests when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    pub fn names(&self, logical: &str) -> Result<IndexNames> {
        IndexNames::new(self.naming.as_ref(), logical)
    }

    pub fn state(&self, logical: &str) -> LifecycleState {
        self.states
            .lock()
            .get(logical)
            .copied()
            .unwrap_or(LifecycleState::Unknown)
    }

    fn lock_for(&self, logical: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(logical.to_string())
            .or_default()
            .clone()
    }

    fn set_state(&self, logical: &str, state: LifecycleState) {
        self.states.lock().insert(logical.to_string(), state);
    }

    /// Enter a transient state, failing if the index was destroyed.
    fn begin<'a>(&'a self, logical: &'a str, transient: LifecycleState) -> Result<StateGuard<'a>> {
        let mut states = self.states.lock();
        let previous = states
            .get(logical)
            .copied()
            .unwrap_or(LifecycleState::Unknown);
        if previous == LifecycleState::Destroyed {
            return Err(Error::IndexLifecycle(format!(
                "logical index '{}' was destroyed",
                logical
            )));
        }
        states.insert(logical.to_string(), transient);
        Ok(StateGuard {
            states: &self.states,
            logical,
            previous,
            committed: false,
        })
    }

    async fn send<W: Work>(&self, work: W) -> Result<W::Output> {
        execute(self.transport.as_ref(), work, self.cancel.as_ref()).await
    }

    fn record<T>(operation: &str, result: &Result<T>, outcome: impl FnOnce(&T) -> &'static str) {
        let label = match result {
            Ok(value) => outcome(value),
            Err(e) => e.error_type(),
        };
        metrics::record_lifecycle_operation(operation, label);
    }

    /// Metadata of the indexes currently behind the write alias.
    pub async fn fetch_metadata(&self, logical: &str) -> Result<Option<Vec<ExistingIndexMetadata>>> {
        let names = self.names(logical)?;
        self.send(self.dialect.work_factory().get_index_metadata(&names.write_alias))
            .await
    }

    /// Every physical index behind either alias, in name order.
    async fn physical_indexes(&self, names: &IndexNames) -> Result<BTreeSet<String>> {
        let mut indexes = BTreeSet::new();
        for alias in [&names.read_alias, &names.write_alias] {
            let found = self
                .send(self.dialect.work_factory().get_index_metadata(alias))
                .await?;
            indexes.extend(found.into_iter().flatten().map(|m| m.primary_name));
        }
        Ok(indexes)
    }

    /// The single index answering to the write alias.
    async fn write_target(&self, names: &IndexNames) -> Result<Option<ExistingIndexMetadata>> {
        let Some(mut found) = self
            .send(self.dialect.work_factory().get_index_metadata(&names.write_alias))
            .await?
        else {
            return Ok(None);
        };
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            _ => {
                let marked: Vec<ExistingIndexMetadata> = found
                    .into_iter()
                    .filter(|m| {
                        m.aliases
                            .get(&names.write_alias)
                            .is_some_and(|a| a.is_write_index == Some(true))
                    })
                    .collect();
                match <[ExistingIndexMetadata; 1]>::try_from(marked) {
                    Ok([target]) => Ok(Some(target)),
                    Err(_) => Err(Error::IndexLifecycle(format!(
                        "write alias '{}' does not resolve to exactly one index",
                        names.write_alias
                    ))),
                }
            }
        }
    }

    async fn wait_for_status(&self, index: &str) -> Result<()> {
        let status = self
            .send(self.dialect.work_factory().wait_for_index_status(
                index,
                self.config.minimal_required_status,
                self.config.status_wait_timeout(),
            ))
            .await?;
        tracing::debug!("Index '{}' reached status {}", index, status);
        Ok(())
    }

    async fn create_physical(
        &self,
        physical: &str,
        schema: &IndexSchema,
        aliases: BTreeMap<String, AliasDefinition>,
    ) -> Result<CreateIndexResult> {
        let work = self
            .dialect
            .work_factory()
            .create_index(physical, schema, aliases);
        match self.send(work).await {
            Ok(result) => {
                self.wait_for_status(physical).await?;
                Ok(result)
            }
            Err(Error::ConcurrentCreationDetected(index)) => {
                tracing::info!("Index '{}' was created concurrently by another process", index);
                Ok(CreateIndexResult::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_if_absent_locked(
        &self,
        names: &IndexNames,
        schema: &IndexSchema,
    ) -> Result<CreateIndexResult> {
        if self.write_target(names).await?.is_some() {
            return Ok(CreateIndexResult::AlreadyExists);
        }

        let mut aliases = BTreeMap::new();
        aliases.insert(names.write_alias.clone(), AliasDefinition::write());
        aliases.insert(names.read_alias.clone(), AliasDefinition::read());
        let result = self
            .create_physical(&names.initial_physical, schema, aliases)
            .await?;
        if result == CreateIndexResult::Created {
            tracing::info!(
                "Created index '{}' ({}, {})",
                names.initial_physical,
                names.write_alias,
                names.read_alias
            );
        }
        Ok(result)
    }

    async fn validate_locked(&self, names: &IndexNames, schema: &IndexSchema) -> Result<()> {
        let target = self.write_target(names).await?.ok_or_else(|| {
            Error::IndexLifecycle(format!(
                "logical index '{}' does not exist (no index behind '{}')",
                names.logical, names.write_alias
            ))
        })?;
        let report = self
            .dialect
            .schema_validator()
            .validate(schema, names, &target);
        if report.is_valid() {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                index: target.primary_name,
                report,
            })
        }
    }

    /// Returns whether mappings were merged into the live index.
    async fn update_locked(&self, names: &IndexNames, schema: &IndexSchema) -> Result<bool> {
        let target = self.write_target(names).await?.ok_or_else(|| {
            Error::IndexLifecycle(format!(
                "logical index '{}' does not exist (no index behind '{}')",
                names.logical, names.write_alias
            ))
        })?;
        let report = self
            .dialect
            .schema_validator()
            .validate(schema, names, &target);
        if report.is_valid() {
            return Ok(false);
        }
        if !report.is_additive() {
            return Err(Error::SchemaMismatch {
                index: target.primary_name,
                report,
            });
        }

        tracing::info!(
            "Merging {} new mapping properties into '{}'",
            report.failures().len(),
            target.primary_name
        );
        self.send(
            self.dialect
                .work_factory()
                .put_mapping(&target.primary_name, schema.mappings.clone()),
        )
        .await?;
        Ok(true)
    }

    async fn drop_locked(&self, names: &IndexNames) -> Result<bool> {
        let mut indexes = self.physical_indexes(names).await?;
        // An initial index that lost its aliases still belongs to this logical index
        let orphan = self
            .send(self.dialect.work_factory().get_index_metadata(&names.initial_physical))
            .await?;
        indexes.extend(orphan.into_iter().flatten().map(|m| m.primary_name));

        let mut dropped = false;
        for index in &indexes {
            dropped |= self
                .send(self.dialect.work_factory().drop_index(index, true))
                .await?;
            tracing::info!("Dropped index '{}'", index);
        }
        Ok(dropped)
    }

    /// Create the initial physical index with both aliases unless the logical
    /// index already exists. Losing a creation race is not an error.
    pub async fn create_if_absent(&self, logical: &str, schema: &IndexSchema) -> Result<CreateIndexResult> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::Creating)?;
        let result = self.create_if_absent_locked(&names, schema).await;
        Self::record("create", &result, |r| match r {
            CreateIndexResult::Created => "created",
            CreateIndexResult::AlreadyExists => "already_exists",
        });
        let result = result?;
        guard.commit(match result {
            CreateIndexResult::Created => LifecycleState::Created,
            CreateIndexResult::AlreadyExists => LifecycleState::AlreadyExists,
        });
        Ok(result)
    }

    /// Compare the write target with `schema`; never changes the index.
    pub async fn validate(&self, logical: &str, schema: &IndexSchema) -> Result<()> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::Validating)?;
        let result = self.validate_locked(&names, schema).await;
        Self::record("validate", &result, |_| "valid");
        result?;
        guard.commit(LifecycleState::Valid);
        Ok(())
    }

    pub async fn create_or_validate(&self, logical: &str, schema: &IndexSchema) -> Result<CreateIndexResult> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::Creating)?;
        let result = self.create_if_absent_locked(&names, schema).await?;
        if result == CreateIndexResult::AlreadyExists {
            self.set_state(logical, LifecycleState::Validating);
            let validation = self.validate_locked(&names, schema).await;
            Self::record("validate", &validation, |_| "valid");
            validation?;
            guard.commit(LifecycleState::Valid);
        } else {
            metrics::record_lifecycle_operation("create", "created");
            guard.commit(LifecycleState::Created);
        }
        Ok(result)
    }

    /// Merge additive mapping changes; anything else is a schema mismatch.
    pub async fn update(&self, logical: &str, schema: &IndexSchema) -> Result<bool> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::Updating)?;
        let result = self.update_locked(&names, schema).await;
        Self::record("update", &result, |merged| if *merged { "merged" } else { "unchanged" });
        let merged = result?;
        guard.commit(LifecycleState::Valid);
        Ok(merged)
    }

    pub async fn create_or_update(&self, logical: &str, schema: &IndexSchema) -> Result<CreateIndexResult> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::Creating)?;
        let result = self.create_if_absent_locked(&names, schema).await?;
        if result == CreateIndexResult::AlreadyExists {
            self.set_state(logical, LifecycleState::Updating);
            let update = self.update_locked(&names, schema).await;
            Self::record("update", &update, |merged| if *merged { "merged" } else { "unchanged" });
            update?;
            guard.commit(LifecycleState::Valid);
        } else {
            guard.commit(LifecycleState::Created);
        }
        Ok(result)
    }

    /// Move the logical index to a new physical generation.
    ///
    /// Every step leaves exactly one index behind the write alias and at
    /// least one behind the read alias:
    /// 1. create the next generation without aliases
    /// 2. in one `_aliases` request, move the write alias and add the read alias
    /// 3. remove the old index from the read alias
    /// 4. drop the old index when asked to
    pub async fn rollover(&self, logical: &str, schema: &IndexSchema, drop_old: bool) -> Result<RolloverResult> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::RollingOver)?;
        let result = self.rollover_locked(&names, schema, drop_old).await;
        Self::record("rollover", &result, |_| "rolled_over");
        let result = result?;
        guard.commit(LifecycleState::RolledOver);
        Ok(result)
    }

    async fn rollover_locked(
        &self,
        names: &IndexNames,
        schema: &IndexSchema,
        drop_old: bool,
    ) -> Result<RolloverResult> {
        let old = self.write_target(names).await?.ok_or_else(|| {
            Error::IndexLifecycle(format!(
                "cannot roll over '{}': no index behind '{}'",
                names.logical, names.write_alias
            ))
        })?;
        let old_index = old.primary_name;
        let new_index = self.naming.next_physical_name(&old_index)?;
        let factory = self.dialect.work_factory();

        if self.create_physical(&new_index, schema, BTreeMap::new()).await?
            == CreateIndexResult::AlreadyExists
        {
            self.adopt_next_generation(names, &new_index, schema).await?;
        }

        self.send(factory.update_aliases(vec![
            AliasAction::remove(&old_index, &names.write_alias),
            AliasAction::add(&new_index, &names.write_alias, &AliasDefinition::write()),
            AliasAction::add(&new_index, &names.read_alias, &AliasDefinition::read()),
        ]))
        .await?;

        self.send(factory.update_aliases(vec![AliasAction::remove(
            &old_index,
            &names.read_alias,
        )]))
        .await?;

        let old_dropped = if drop_old {
            self.send(factory.drop_index(&old_index, true)).await?
        } else {
            false
        };

        tracing::info!(
            "Rolled over index '{}': {} -> {}{}",
            names.logical,
            old_index,
            new_index,
            if old_dropped { " (old index dropped)" } else { "" }
        );

        Ok(RolloverResult {
            logical: names.logical.clone(),
            old_index,
            new_index,
            old_dropped,
            rolled_over_at: Utc::now(),
        })
    }

    /// Take over a next generation left behind by a rollover that failed
    /// before moving the aliases. It must carry neither alias and match `schema`.
    async fn adopt_next_generation(&self, names: &IndexNames, index: &str, schema: &IndexSchema) -> Result<()> {
        let existing = self
            .send(self.dialect.work_factory().get_index_metadata(index))
            .await?
            .into_iter()
            .flatten()
            .find(|m| m.primary_name == index)
            .ok_or_else(|| {
                Error::IndexLifecycle(format!(
                    "cannot roll over '{}': '{}' vanished while rolling over",
                    names.logical, index
                ))
            })?;
        if existing.has_alias(&names.write_alias) || existing.has_alias(&names.read_alias) {
            return Err(Error::IndexLifecycle(format!(
                "cannot roll over '{}': '{}' already exists and is in use",
                names.logical, index
            )));
        }

        let report = self
            .dialect
            .schema_validator()
            .validate_schema(schema, &existing);
        if !report.is_valid() {
            return Err(Error::SchemaMismatch {
                index: existing.primary_name,
                report,
            });
        }
        tracing::info!(
            "Reusing '{}' left behind by an interrupted rollover of '{}'",
            index,
            names.logical
        );
        Ok(())
    }

    /// Drop every physical index of the logical index. The logical index is
    /// destroyed afterwards, even when nothing existed.
    pub async fn drop_if_existing(&self, logical: &str) -> Result<bool> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::Dropping)?;
        let result = self.drop_locked(&names).await;
        Self::record("drop", &result, |dropped| if *dropped { "dropped" } else { "absent" });
        let dropped = result?;
        guard.commit(LifecycleState::Destroyed);
        Ok(dropped)
    }

    /// Drop whatever exists and create a fresh initial index.
    pub async fn drop_and_create(&self, logical: &str, schema: &IndexSchema) -> Result<CreateIndexResult> {
        let names = self.names(logical)?;
        let lock = self.lock_for(logical);
        let _exclusive = lock.lock().await;

        let guard = self.begin(logical, LifecycleState::Dropping)?;
        self.drop_locked(&names).await?;
        self.set_state(logical, LifecycleState::Creating);
        let result = self.create_if_absent_locked(&names, schema).await;
        Self::record("drop_and_create", &result, |r| match r {
            CreateIndexResult::Created => "created",
            CreateIndexResult::AlreadyExists => "already_exists",
        });
        let result = result?;
        guard.commit(match result {
            CreateIndexResult::Created => LifecycleState::Created,
            CreateIndexResult::AlreadyExists => LifecycleState::AlreadyExists,
        });
        Ok(result)
    }

    /// Run the startup part of `strategy` for one logical index.
    pub async fn apply(&self, strategy: LifecycleStrategy, logical: &str, schema: &IndexSchema) -> Result<()> {
        tracing::debug!("Applying lifecycle strategy {} to '{}'", strategy, logical);
        match strategy {
            LifecycleStrategy::None => {}
            LifecycleStrategy::Validate => self.validate(logical, schema).await?,
            LifecycleStrategy::Create => {
                self.create_if_absent(logical, schema).await?;
            }
            LifecycleStrategy::CreateOrValidate => {
                self.create_or_validate(logical, schema).await?;
            }
            LifecycleStrategy::CreateOrUpdate => {
                self.create_or_update(logical, schema).await?;
            }
            LifecycleStrategy::DropAndCreate | LifecycleStrategy::DropAndCreateAndDrop => {
                self.drop_and_create(logical, schema).await?;
            }
        }
        Ok(())
    }

    /// Run the shutdown part of `strategy` for one logical index.
    pub async fn release(&self, strategy: LifecycleStrategy, logical: &str) -> Result<()> {
        if strategy == LifecycleStrategy::DropAndCreateAndDrop {
            self.drop_if_existing(logical).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for IndexLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexLifecycleManager")
            .field("dialect", &self.dialect.kind())
            .field("naming", &self.naming)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in [
            LifecycleStrategy::None,
            LifecycleStrategy::Validate,
            LifecycleStrategy::Create,
            LifecycleStrategy::CreateOrValidate,
            LifecycleStrategy::CreateOrUpdate,
            LifecycleStrategy::DropAndCreate,
            LifecycleStrategy::DropAndCreateAndDrop,
        ] {
            assert_eq!(strategy.as_str().parse::<LifecycleStrategy>().unwrap(), strategy);
        }
        assert!("recreate".parse::<LifecycleStrategy>().is_err());
    }

    #[test]
    fn test_status_ordering() {
        assert!(IndexStatus::Green.satisfies(IndexStatus::Yellow));
        assert!(IndexStatus::Yellow.satisfies(IndexStatus::Yellow));
        assert!(!IndexStatus::Red.satisfies(IndexStatus::Yellow));
        assert_eq!(IndexStatus::parse("green"), Some(IndexStatus::Green));
        assert_eq!(IndexStatus::parse("blue"), None);
    }
}
