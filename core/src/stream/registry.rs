//! stream/registry.rs
//! Bookkeeping for deferred values on both sides of the wire.
//!
//! Encode side: every deferred met while flattening gets the next id and stays
//! registered until its settlement frame has been produced.
//! Decode side: every `["P",id]` fragment creates a placeholder whose resolver
//! is kept until a frame with that id settles it.

use std::collections::{BTreeMap, HashMap};

use crate::types::ProtocolError;
use crate::value::{Deferred, Resolver, Settlement, Value};

struct EncodeEntry {
    deferred: Deferred,
    in_flight: bool,
}

#[derive(Default)]
pub struct EncodeRegistry {
    entries: BTreeMap<u64, EncodeEntry>,
    next_id: u64,
}

impl EncodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next id. The same deferred met twice gets two ids unless
    /// the flattener already deduplicated it by identity.
    pub fn register(&mut self, deferred: Deferred) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            EncodeEntry {
                deferred,
                in_flight: false,
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Entries not yet being awaited, marked in flight as they are returned.
    pub(crate) fn schedule(&mut self) -> Vec<(u64, Deferred)> {
        self.entries
            .iter_mut()
            .filter(|(_, entry)| !entry.in_flight)
            .map(|(id, entry)| {
                entry.in_flight = true;
                (*id, entry.deferred.clone())
            })
            .collect()
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Forget every id handed out at or after `next_id`.
    pub(crate) fn rollback(&mut self, next_id: u64) {
        self.entries.retain(|id, _| *id < next_id);
        self.next_id = next_id;
    }
}

#[derive(Default)]
pub struct DecodeRegistry {
    pending: HashMap<u64, Resolver>,
}

impl DecodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the placeholder for `id`.
    pub fn register(&mut self, id: u64) -> Result<Deferred, ProtocolError> {
        if self.pending.contains_key(&id) {
            return Err(ProtocolError::DuplicateDeferred(id));
        }
        let (deferred, resolver) = Deferred::pending();
        self.pending.insert(id, resolver);
        Ok(deferred)
    }

    pub fn settle(&mut self, id: u64, settlement: Settlement) -> Result<(), ProtocolError> {
        let resolver = self
            .pending
            .remove(&id)
            .ok_or(ProtocolError::UnknownDeferred(id))?;
        if !resolver.settle(settlement) {
            tracing::trace!(deferred_id = id, "placeholder dropped before settlement");
        }
        Ok(())
    }

    pub fn resolve(&mut self, id: u64, value: Value) -> Result<(), ProtocolError> {
        self.settle(id, Ok(value))
    }

    pub fn reject(&mut self, id: u64, reason: Value) -> Result<(), ProtocolError> {
        self.settle(id, Err(reason))
    }

    /// Reject every outstanding placeholder with `reason`; returns how many.
    pub fn reject_all(&mut self, reason: &Value) -> usize {
        let count = self.pending.len();
        for (_, resolver) in self.pending.drain() {
            resolver.reject(reason.clone());
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }
}

