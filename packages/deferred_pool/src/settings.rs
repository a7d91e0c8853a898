use std::num::NonZero;

use serde::Deserialize;
use tracing::warn;

use crate::{Result, SpawnPriority};

/// Tuning of the pools in a [`PoolRegistry`][crate::PoolRegistry].
///
/// Settings are usually read from a TOML document. Every field is optional.
///
/// # Example
///
/// ```
/// use deferred_pool::{PoolSettings, SpawnPriority};
///
/// let settings = PoolSettings::from_toml_str(
///     r#"
///     spawn_objects_per_tick = 12
///     default_priority = "medium"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(settings.spawn_budget().get(), 12);
/// assert_eq!(settings.default_priority, SpawnPriority::Medium);
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct PoolSettings {
    /// How many spawn requests a pool processes on each tick it receives.
    ///
    /// Values below 1 are treated as 1.
    pub spawn_objects_per_tick: i64,

    /// The priority of requests made without naming one.
    pub default_priority: SpawnPriority,
}

impl PoolSettings {
    /// The per-tick budget used when none is configured.
    pub const DEFAULT_SPAWN_OBJECTS_PER_TICK: i64 = 5;

    /// Parses settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettings`][crate::Error::InvalidSettings] if the document is not
    /// valid TOML or has fields of the wrong type or unknown fields.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Sets the per-tick spawn budget.
    #[must_use]
    pub fn with_spawn_objects_per_tick(mut self, spawn_objects_per_tick: i64) -> Self {
        self.spawn_objects_per_tick = spawn_objects_per_tick;
        self
    }

    /// Sets the priority of requests made without naming one.
    #[must_use]
    pub fn with_default_priority(mut self, default_priority: SpawnPriority) -> Self {
        self.default_priority = default_priority;
        self
    }

    /// The per-tick spawn budget, clamped to at least 1.
    #[must_use]
    pub fn spawn_budget(&self) -> NonZero<usize> {
        let clamped = usize::try_from(self.spawn_objects_per_tick)
            .ok()
            .and_then(NonZero::new);

        clamped.unwrap_or_else(|| {
            warn!(
                configured = self.spawn_objects_per_tick,
                "spawn_objects_per_tick must be at least 1, using 1"
            );
            NonZero::<usize>::MIN
        })
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            spawn_objects_per_tick: Self::DEFAULT_SPAWN_OBJECTS_PER_TICK,
            default_priority: SpawnPriority::Normal,
        }
    }
}
