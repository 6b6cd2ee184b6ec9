//! Dispatch queues and routing.
//!
//! A dispatch queue is an ordered list of capacity tiers. An incoming
//! job instance is offered to tiers in ascending order and placed in
//! the first one with capacity headroom and a compatible instance
//! family. When every tier is saturated the instance queues; it is
//! rejected only when no tier could *ever* satisfy its reservation,
//! and that check runs at submission, not after waiting.
//!
//! The substrate performs the actual routing at runtime; [`Dispatcher`]
//! is the reference simulation of that policy, used to validate queue
//! configurations and for tests.

use std::collections::BTreeMap;

use spotgrid_id::{QueueName, TierName};
use tracing::debug;

use crate::error::{DispatchError, ValidationError};
use crate::template::JobTemplate;
use crate::tier::CapacityTier;

/// One queue position: a tier plus its priority order (lower is tried
/// first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierEntry {
    pub tier: TierName,
    pub order: u32,
}

/// Ordered routing policy across capacity tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchQueue {
    name: QueueName,
    tiers: Vec<TierEntry>,
}

impl DispatchQueue {
    /// Build a queue from tier entries.
    ///
    /// Entries are kept in ascending order; declaration order breaks
    /// ties. The queue must name at least one tier and may not name a
    /// tier twice.
    pub fn new(name: QueueName, mut tiers: Vec<TierEntry>) -> Result<Self, ValidationError> {
        if tiers.is_empty() {
            return Err(ValidationError::EmptyQueue);
        }

        let mut seen = std::collections::BTreeSet::new();
        for entry in &tiers {
            if !seen.insert(entry.tier.clone()) {
                return Err(ValidationError::DuplicateTier {
                    tier: entry.tier.clone(),
                });
            }
        }

        // Stable: ties keep declaration order.
        tiers.sort_by_key(|e| e.order);

        Ok(Self { name, tiers })
    }

    /// The queue's stable name.
    #[must_use]
    pub fn name(&self) -> &QueueName {
        &self.name
    }

    /// Tier entries in routing order.
    #[must_use]
    pub fn tiers(&self) -> &[TierEntry] {
        &self.tiers
    }
}

/// Where a submitted job instance ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Admitted to a tier with headroom.
    Tier(TierName),

    /// All capable tiers are saturated; the instance waits for
    /// headroom.
    Queued,
}

/// A job instance accepted by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// Where the instance landed.
    pub placement: Placement,

    /// The command with parameter references resolved.
    pub command: Vec<String>,

    /// The template's timeout, propagated unmodified.
    pub timeout: std::time::Duration,
}

/// Reference simulation of the queue's routing policy.
pub struct Dispatcher {
    queue: QueueName,
    entries: Vec<DispatchEntry>,
}

struct DispatchEntry {
    tier: CapacityTier,
    used_vcpus: u32,
}

impl Dispatcher {
    /// Build a dispatcher over a queue and the tiers it references.
    ///
    /// Every tier named by the queue must be present in `tiers`.
    pub fn new(queue: &DispatchQueue, tiers: &[CapacityTier]) -> Result<Self, ValidationError> {
        let by_name: BTreeMap<&TierName, &CapacityTier> =
            tiers.iter().map(|t| (t.name(), t)).collect();

        let mut entries = Vec::with_capacity(queue.tiers().len());
        for entry in queue.tiers() {
            let Some(&tier) = by_name.get(&entry.tier) else {
                return Err(ValidationError::UnknownTier {
                    queue: queue.name().clone(),
                    tier: entry.tier.clone(),
                });
            };
            entries.push(DispatchEntry {
                tier: tier.clone(),
                used_vcpus: 0,
            });
        }

        Ok(Self {
            queue: queue.name().clone(),
            entries,
        })
    }

    /// Offer a job to the queue.
    ///
    /// Fails fast with [`DispatchError::UnsatisfiableReservation`] when
    /// no tier could ever satisfy the reservation; otherwise the
    /// instance is placed in the first tier with headroom, or queued.
    pub fn submit(
        &mut self,
        template: &JobTemplate,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Dispatched, DispatchError> {
        let reservation = template.reservation();

        let satisfiable = self
            .entries
            .iter()
            .any(|e| e.tier.can_ever_satisfy(reservation));
        if !satisfiable {
            return Err(DispatchError::UnsatisfiableReservation {
                queue: self.queue.clone(),
                vcpus: reservation.vcpus,
                memory_mib: reservation.memory_mib,
            });
        }

        let command = template.resolve_command(parameters);
        let timeout = template.timeout();

        for entry in &mut self.entries {
            if !entry.tier.can_ever_satisfy(reservation) {
                continue;
            }
            let headroom = entry.tier.max_vcpus() - entry.used_vcpus;
            if reservation.vcpus <= headroom {
                entry.used_vcpus += reservation.vcpus;
                debug!(
                    template = %template.name(),
                    tier = %entry.tier.name(),
                    used_vcpus = entry.used_vcpus,
                    max_vcpus = entry.tier.max_vcpus(),
                    "Placed job instance"
                );
                return Ok(Dispatched {
                    placement: Placement::Tier(entry.tier.name().clone()),
                    command,
                    timeout,
                });
            }
        }

        debug!(template = %template.name(), queue = %self.queue, "All tiers saturated, instance queued");
        Ok(Dispatched {
            placement: Placement::Queued,
            command,
            timeout,
        })
    }

    /// Return capacity to a tier when a simulated instance finishes.
    pub fn release(&mut self, tier: &TierName, vcpus: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.tier.name() == tier) {
            entry.used_vcpus = entry.used_vcpus.saturating_sub(vcpus);
        }
    }

    /// vCPUs currently in use in a tier, if the tier is in this queue.
    #[must_use]
    pub fn used_vcpus(&self, tier: &TierName) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.tier.name() == tier)
            .map(|e| e.used_vcpus)
    }
}
