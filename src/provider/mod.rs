//! Sources of terrain units for batch runs
//!
//! A provider plans a [`UnitSequence`] for an [`OperationTarget`] up front
//! (cheap: ids only), then hands out units one at a time through
//! [`TerrainUnitProvider::load`]. Streaming providers load on demand and
//! drop units again in [`TerrainUnitProvider::release_if_transient`].

pub mod world;
pub mod cache;
pub mod disk_io;
pub mod streaming;

pub use world::TerrainWorld;
pub use cache::UnitCache;
pub use disk_io::{ManifestEntry, WorldManifest};
pub use streaming::StreamingWorld;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::terrain::{TerrainUnit, UnitId};

/// Which units a batch run covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationTarget {
    /// Every registered unit
    AllUnits,
    /// Registered units whose active flag is set when they are reached
    ActiveUnitsOnly,
    /// A user-picked list; `None` marks an empty slot
    ExplicitList(Vec<Option<UnitId>>),
}

impl OperationTarget {
    /// Explicit list from plain ids
    pub fn explicit(ids: impl IntoIterator<Item = UnitId>) -> Self {
        OperationTarget::ExplicitList(ids.into_iter().map(Some).collect())
    }
}

/// One slot of a planned sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEntry {
    Unit(UnitId),
    /// Empty slot from an explicit list
    Null,
}

/// Ordered plan of units for one run.
///
/// Restartable: planning again yields a fresh sequence. Units themselves
/// are only loaded when the executor reaches their slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSequence {
    entries: Vec<SequenceEntry>,
    active_only: bool,
    total_hint: Option<usize>,
}

impl UnitSequence {
    /// Plan a sequence over `registered` (in registration order).
    ///
    /// Explicit lists must not be empty. Duplicate ids are dropped (first
    /// occurrence kept) and empty slots are kept as [`SequenceEntry::Null`].
    pub fn plan(target: &OperationTarget, registered: &[UnitId], cheap_count: bool) -> Result<Self> {
        match target {
            OperationTarget::AllUnits => Ok(Self {
                entries: registered.iter().copied().map(SequenceEntry::Unit).collect(),
                active_only: false,
                total_hint: cheap_count.then_some(registered.len()),
            }),
            OperationTarget::ActiveUnitsOnly => Ok(Self {
                entries: registered.iter().copied().map(SequenceEntry::Unit).collect(),
                active_only: true,
                // Upper bound; inactive units drop out as they are reached
                total_hint: cheap_count.then_some(registered.len()),
            }),
            OperationTarget::ExplicitList(list) => {
                if list.is_empty() {
                    return Err(Error::precondition("explicit unit list is empty"));
                }

                let mut seen = HashSet::new();
                let mut entries = Vec::with_capacity(list.len());
                for slot in list {
                    match slot {
                        Some(id) if !seen.insert(*id) => {
                            log::warn!("Unit {} listed more than once; processing it once", id);
                        }
                        Some(id) => entries.push(SequenceEntry::Unit(*id)),
                        None => {
                            log::warn!("Explicit unit list contains an empty entry; it will be skipped");
                            entries.push(SequenceEntry::Null);
                        }
                    }
                }

                let total = entries.len();
                Ok(Self {
                    entries,
                    active_only: false,
                    total_hint: Some(total),
                })
            }
        }
    }

    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    /// Whether the executor should skip units found inactive when reached
    pub fn active_only(&self) -> bool {
        self.active_only
    }

    /// Total for progress reporting, when known without loading units
    pub fn total_hint(&self) -> Option<usize> {
        self.total_hint
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a UnitSequence {
    type Item = &'a SequenceEntry;
    type IntoIter = std::slice::Iter<'a, SequenceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A collection of terrain units a batch run can walk.
pub trait TerrainUnitProvider {
    /// True when units are loaded and unloaded on demand
    fn has_streaming_units(&self) -> bool;

    /// Plan the units a target covers, in provider order
    fn units(&self, target: &OperationTarget) -> Result<UnitSequence>;

    /// Borrow a unit, loading it first if needed
    fn load(&mut self, id: UnitId) -> Result<&mut TerrainUnit>;

    /// Unload a unit that was loaded only for this pass. No-op for
    /// resident units.
    fn release_if_transient(&mut self, id: UnitId) -> Result<()>;
}
