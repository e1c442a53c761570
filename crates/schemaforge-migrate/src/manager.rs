//! Migration manager.
//!
//! One [`MigrationManager::upgrade`] call is one complete pass:
//!
//! 1. Discover available units and read the completed versions (once each).
//! 2. Pending = available − completed, sorted by version.
//! 3. For each pending unit: load it, apply it, record its version. The first
//!    failure stops the pass; the failing version is not recorded.
//! 4. Notify the metadata cache, according to the [`InvalidationPolicy`].
//!
//! The manager keeps no state between calls. A crash between applying a unit
//! and recording it leaves the version unrecorded, and the unit runs again on
//! the next pass.
//!
//! Concurrent passes against the same ledger are not coordinated here and
//! must be prevented by the caller.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use schemaforge_common::Version;
use schemaforge_db::{CacheInvalidator, SqlChannel, VersionLedger};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::discovery::{UnitDescriptor, UnitDiscovery};
use crate::error::{MigrationError, MigrationResult};
use crate::loader::UnitLoader;

/// When the metadata cache is told the schema may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidationPolicy {
    /// Once per pass, only when at least one unit was pending.
    #[default]
    WhenPending,
    /// Once per successful pass, even when nothing was pending.
    Always,
}

/// Outcome of a successful pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpgradeReport {
    /// Versions applied by this pass, in order.
    pub applied: Vec<Version>,
    pub cache_invalidated: bool,
}

/// One available unit and whether the ledger records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    #[serde(flatten)]
    pub unit: UnitDescriptor,
    pub applied: bool,
    /// When the ledger recorded this unit, if it keeps timestamps.
    pub applied_at: Option<DateTime<Utc>>,
}

/// Available units against ledger contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Every discovered unit, sorted by version.
    pub units: Vec<UnitStatus>,
    /// Recorded versions with no matching unit on disk.
    pub orphaned: Vec<Version>,
}

impl MigrationStatus {
    pub fn pending(&self) -> impl Iterator<Item = &UnitDescriptor> {
        self.units.iter().filter(|s| !s.applied).map(|s| &s.unit)
    }

    pub fn is_up_to_date(&self) -> bool {
        self.units.iter().all(|s| s.applied)
    }
}

/// Orchestrates discovery, loading, execution, and recording.
pub struct MigrationManager<'a> {
    discovery: UnitDiscovery,
    channel: &'a dyn SqlChannel,
    ledger: &'a dyn VersionLedger,
    loader: &'a dyn UnitLoader,
    invalidator: Option<&'a dyn CacheInvalidator>,
    policy: InvalidationPolicy,
    stop_signal: Arc<AtomicBool>,
}

impl<'a> MigrationManager<'a> {
    /// Create a manager. Units run through `channel`; the ledger normally
    /// shares the same connection.
    pub fn new(
        discovery: UnitDiscovery,
        channel: &'a dyn SqlChannel,
        ledger: &'a dyn VersionLedger,
        loader: &'a dyn UnitLoader,
    ) -> Self {
        Self {
            discovery,
            channel,
            ledger,
            loader,
            invalidator: None,
            policy: InvalidationPolicy::default(),
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Notify `invalidator` after upgrades.
    pub fn with_invalidator(mut self, invalidator: &'a dyn CacheInvalidator) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    pub fn with_invalidation_policy(mut self, policy: InvalidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share an existing stop signal instead of the manager's own.
    pub fn with_stop_signal(mut self, stop_signal: Arc<AtomicBool>) -> Self {
        self.stop_signal = stop_signal;
        self
    }

    /// Get a clone of the stop signal for external control.
    ///
    /// Setting it makes the current pass stop before the next unit. A unit
    /// that is already running is never interrupted.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// All units in the migration directory, in discovery order.
    pub fn available_migrations(&self) -> MigrationResult<Vec<UnitDescriptor>> {
        self.discovery.scan()
    }

    /// Versions recorded in the ledger.
    pub fn completed_migrations(&self) -> MigrationResult<BTreeSet<Version>> {
        self.ledger
            .completed_versions()
            .map_err(MigrationError::LedgerRead)
    }

    /// Available units not yet recorded, in ascending version order.
    pub fn migrations_to_perform(&self) -> MigrationResult<Vec<UnitDescriptor>> {
        let available = self.available_migrations()?;
        let completed = self.completed_migrations()?;
        Ok(pending_units(available, &completed))
    }

    /// Run one migration pass.
    pub fn upgrade(&self) -> MigrationResult<UpgradeReport> {
        let pending = self.migrations_to_perform()?;
        let total = pending.len();
        if total == 0 {
            info!("Database schema is up to date");
        } else {
            info!("{} pending migration(s)", total);
        }

        let mut applied = Vec::with_capacity(total);
        for (index, unit) in pending.into_iter().enumerate() {
            if self.stop_signal.load(Ordering::Relaxed) {
                warn!("Migration pass stopped before {}", unit.version);
                return Err(MigrationError::Cancelled {
                    next: unit.version,
                    remaining: total - index,
                });
            }
            self.apply(&unit)?;
            applied.push(unit.version);
        }

        let cache_invalidated = self.invalidate_cache(total > 0);
        Ok(UpgradeReport {
            applied,
            cache_invalidated,
        })
    }

    /// Record every pending version without running its unit.
    ///
    /// Used when the schema was created directly at its latest state, such
    /// as on a fresh install.
    pub fn mark_all_as_completed(&self) -> MigrationResult<Vec<Version>> {
        let pending = self.migrations_to_perform()?;
        let mut recorded = Vec::with_capacity(pending.len());
        for unit in pending {
            self.record(&unit.version)?;
            debug!("Marked {} as completed", unit.version);
            recorded.push(unit.version);
        }
        if !recorded.is_empty() {
            info!("Marked {} migration(s) as completed", recorded.len());
        }
        Ok(recorded)
    }

    /// Compare available units with the ledger.
    pub fn status(&self) -> MigrationResult<MigrationStatus> {
        let mut available = self.available_migrations()?;
        let completed = self.completed_migrations()?;
        let applied_times = self
            .ledger
            .applied_times()
            .map_err(MigrationError::LedgerRead)?;
        available.sort_by(|a, b| a.version.cmp(&b.version));

        let known: BTreeSet<&Version> = available.iter().map(|u| &u.version).collect();
        let orphaned = completed
            .iter()
            .filter(|v| !known.contains(v))
            .cloned()
            .collect();

        let units = available
            .into_iter()
            .map(|unit| UnitStatus {
                applied: completed.contains(&unit.version),
                applied_at: applied_times.get(&unit.version).copied(),
                unit,
            })
            .collect();

        Ok(MigrationStatus { units, orphaned })
    }

    fn apply(&self, unit: &UnitDescriptor) -> MigrationResult<()> {
        let loaded = self.loader.load(unit)?;

        info!("Applying migration {} ({})", unit.version, unit.symbol);
        let started = Instant::now();
        loaded
            .up(self.channel)
            .map_err(|source| MigrationError::Apply {
                version: unit.version.clone(),
                source,
            })?;

        self.record(&unit.version)?;
        info!(
            "Applied migration {} in {} ms",
            unit.version,
            started.elapsed().as_millis()
        );
        Ok(())
    }

    fn record(&self, version: &Version) -> MigrationResult<()> {
        self.ledger
            .record_version(version)
            .map_err(|source| MigrationError::LedgerWrite {
                version: version.clone(),
                source,
            })
    }

    /// Returns whether the invalidation signal was sent.
    fn invalidate_cache(&self, had_pending: bool) -> bool {
        let wanted = match self.policy {
            InvalidationPolicy::WhenPending => had_pending,
            InvalidationPolicy::Always => true,
        };
        match self.invalidator {
            Some(invalidator) if wanted => {
                invalidator.invalidate();
                true
            }
            _ => false,
        }
    }
}

/// `available − completed`, sorted by version.
pub fn pending_units(
    available: Vec<UnitDescriptor>,
    completed: &BTreeSet<Version>,
) -> Vec<UnitDescriptor> {
    let mut pending: Vec<UnitDescriptor> = available
        .into_iter()
        .filter(|unit| !completed.contains(&unit.version))
        .collect();
    pending.sort_by(|a, b| a.version.cmp(&b.version));
    pending
}
