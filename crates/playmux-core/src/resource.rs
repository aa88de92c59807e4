//! Admission control for scarce hardware resources.
//!
//! The arbiter owns a fixed set of slots per [`ResourceType`]. A granted slot is
//! represented by a [`ResourceTicket`] that the requester owns until it hands it
//! back through [`ResourceArbiter::release`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use playmux_types::ResourceType;

use crate::error::NoResource;

/// Number of units available for each resource type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceCapacity {
    units: BTreeMap<ResourceType, u32>,
}

impl Default for ResourceCapacity {
    /// Two video planes, one of everything else.
    fn default() -> Self {
        let units = ResourceType::ALL
            .into_iter()
            .map(|kind| (kind, if kind == ResourceType::Plane { 2 } else { 1 }))
            .collect();
        Self { units }
    }
}

impl ResourceCapacity {
    pub fn with(mut self, kind: ResourceType, units: u32) -> Self {
        self.units.insert(kind, units);
        self
    }

    pub fn get(&self, kind: ResourceType) -> u32 {
        self.units.get(&kind).copied().unwrap_or(0)
    }
}

/// Exclusive claim on one unit of a resource type.
///
/// Tickets are neither `Clone` nor `Copy`; releasing consumes them.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceTicket {
    id: u64,
    kind: ResourceType,
    handle: i32,
}

impl ResourceTicket {
    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    /// Physical unit that was granted (e.g. the plane id).
    pub fn handle(&self) -> i32 {
        self.handle
    }
}

#[derive(Debug)]
struct Slot {
    handle: i32,
    holder: Option<u64>,
}

#[derive(Debug, Default)]
struct ResourcePool {
    slots: BTreeMap<ResourceType, Vec<Slot>>,
    next_ticket: u64,
}

/// Shared handle to the resource pool.
#[derive(Clone, Debug)]
pub struct ResourceArbiter {
    pool: Arc<Mutex<ResourcePool>>,
}

impl Default for ResourceArbiter {
    fn default() -> Self {
        Self::new(&ResourceCapacity::default())
    }
}

impl ResourceArbiter {
    pub fn new(capacity: &ResourceCapacity) -> Self {
        let slots = ResourceType::ALL
            .into_iter()
            .map(|kind| {
                let units = capacity.get(kind) as i32;
                let slots = (0..units)
                    .map(|handle| Slot {
                        handle,
                        holder: None,
                    })
                    .collect();
                (kind, slots)
            })
            .collect();
        Self {
            pool: Arc::new(Mutex::new(ResourcePool {
                slots,
                next_ticket: 1,
            })),
        }
    }

    fn pool(&self) -> MutexGuard<'_, ResourcePool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Grant one free unit of `kind`.
    ///
    /// `preference` picks a specific physical unit when it is free; otherwise the
    /// first free unit is granted. Held units are never preempted.
    pub fn request(
        &self,
        kind: ResourceType,
        preference: Option<i32>,
    ) -> Result<ResourceTicket, NoResource> {
        let mut pool = self.pool();
        let id = pool.next_ticket;
        let slots = pool.slots.entry(kind).or_default();
        let index = preference
            .and_then(|wanted| {
                slots
                    .iter()
                    .position(|slot| slot.holder.is_none() && slot.handle == wanted)
            })
            .or_else(|| slots.iter().position(|slot| slot.holder.is_none()));
        let Some(index) = index else {
            tracing::debug!(resource = %kind, "resource request denied");
            return Err(NoResource(kind));
        };
        let slot = &mut slots[index];
        slot.holder = Some(id);
        let handle = slot.handle;
        pool.next_ticket += 1;
        tracing::debug!(resource = %kind, handle, ticket = id, "resource granted");
        Ok(ResourceTicket { id, kind, handle })
    }

    /// Return a ticket's unit to the pool.
    ///
    /// Returns `false` if the ticket does not match a held slot, in which case the
    /// pool is left untouched.
    pub fn release(&self, ticket: ResourceTicket) -> bool {
        let mut pool = self.pool();
        let Some(slot) = pool.slots.get_mut(&ticket.kind).and_then(|slots| {
            slots
                .iter_mut()
                .find(|slot| slot.holder == Some(ticket.id) && slot.handle == ticket.handle)
        }) else {
            tracing::warn!(resource = %ticket.kind, ticket = ticket.id, "release of unknown ticket");
            return false;
        };
        slot.holder = None;
        tracing::debug!(resource = %ticket.kind, handle = ticket.handle, ticket = ticket.id, "resource released");
        true
    }

    pub fn capacity(&self, kind: ResourceType) -> usize {
        self.pool().slots.get(&kind).map_or(0, Vec::len)
    }

    pub fn free_count(&self, kind: ResourceType) -> usize {
        self.pool()
            .slots
            .get(&kind)
            .map_or(0, |slots| slots.iter().filter(|s| s.holder.is_none()).count())
    }

    pub fn granted(&self, kind: ResourceType) -> usize {
        self.capacity(kind) - self.free_count(kind)
    }
}
