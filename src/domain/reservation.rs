use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;

use crate::domain::forwarding::FlowRule;
use crate::domain::id::{HostId, SwitchId};

new_key_type! {
    pub struct ReservationId;
}

/// Normalized key of a flow reservation.
///
/// Admission treats a flow between two hosts as one bidirectional entity, so
/// the key is the unordered host pair: `FlowKey::new(a, b)` and
/// `FlowKey::new(b, a)` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey {
    lo: HostId,
    hi: HostId,
}

impl FlowKey {
    pub fn new(a: &HostId, b: &HostId) -> Self {
        if a <= b {
            FlowKey { lo: a.clone(), hi: b.clone() }
        } else {
            FlowKey { lo: b.clone(), hi: a.clone() }
        }
    }
}

impl std::fmt::Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lo, self.hi)
    }
}

/// An admitted flow: its endpoints, the switch path carrying it, the
/// bandwidth deducted along that path, and its lifetime.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Requesting endpoint, as given to allocate. The path runs src -> dst.
    pub src: HostId,

    pub dst: HostId,

    /// Ordered switch path. A single-node path means both hosts attach to the
    /// same switch and no link capacity is deducted.
    pub path: Vec<SwitchId>,

    /// Reserved bandwidth in Mbps, deducted on every path edge in both directions.
    pub bandwidth: u64,

    /// Clock second at which the reservation was admitted.
    pub created_at: i64,

    /// Lifetime in seconds. The reservation is honored through `created_at + ttl`.
    pub ttl: i64,

    /// The forwarding rules installed for this flow, kept so teardown removes
    /// exactly what admission programmed.
    pub rules: Vec<FlowRule>,
}

impl Reservation {
    pub fn key(&self) -> FlowKey {
        FlowKey::new(&self.src, &self.dst)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now - self.created_at > self.ttl
    }

    /// Seconds of lifetime left, floored at zero.
    pub fn remaining_ttl(&self, now: i64) -> i64 {
        (self.created_at + self.ttl - now).max(0)
    }
}

/// Authoritative record of active reservations.
///
/// Storage is a slotmap with a secondary index from the normalized host pair,
/// so lookups by key and iteration are both cheap. The table itself is not
/// synchronized; the AdmissionController owns it behind its state lock.
#[derive(Debug, Default)]
pub struct ReservationTable {
    /// Reservation storage.
    slots: SlotMap<ReservationId, Reservation>,

    /// Index lookup of the internal key (ReservationId) by flow key.
    index: HashMap<FlowKey, ReservationId>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self { slots: SlotMap::with_key(), index: HashMap::new() }
    }

    /// Adds a reservation, replacing any previous entry for the same host pair.
    ///
    /// # Returns
    /// Returns the displaced reservation, if one existed. The caller must have
    /// released its capacity already; the table does no bandwidth accounting.
    pub fn insert(&mut self, reservation: Reservation) -> Option<Reservation> {
        let key = reservation.key();
        let displaced = self.index.get(&key).copied().and_then(|id| self.slots.remove(id));

        let id = self.slots.insert(reservation);
        self.index.insert(key, id);

        displaced
    }

    pub fn get(&self, key: &FlowKey) -> Option<&Reservation> {
        self.index.get(key).and_then(|id| self.slots.get(*id))
    }

    /// Removes the reservation for `key`.
    pub fn delete(&mut self, key: &FlowKey) -> Option<Reservation> {
        let id = self.index.remove(key)?;
        self.slots.remove(id)
    }

    /// Removes every reservation past its TTL.
    ///
    /// # Returns
    /// Returns the removed reservations so the caller can credit their
    /// capacity back and tear down their forwarding rules.
    pub fn remove_expired(&mut self, now: i64) -> Vec<Reservation> {
        let expired: Vec<ReservationId> = self.slots.iter().filter(|(_, r)| r.is_expired(now)).map(|(id, _)| id).collect();

        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(reservation) = self.slots.remove(id) {
                self.index.remove(&reservation.key());
                removed.push(reservation);
            }
        }

        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(src: &str, dst: &str, created_at: i64) -> Reservation {
        Reservation {
            src: HostId::new(src),
            dst: HostId::new(dst),
            path: vec![SwitchId(1), SwitchId(2)],
            bandwidth: 5,
            created_at,
            ttl: 60,
            rules: Vec::new(),
        }
    }

    #[test]
    fn flow_key_is_unordered() {
        let h1 = HostId::new("aa:aa");
        let h2 = HostId::new("bb:bb");
        assert_eq!(FlowKey::new(&h1, &h2), FlowKey::new(&h2, &h1));
    }

    #[test]
    fn insert_displaces_previous_entry_for_the_pair() {
        let mut table = ReservationTable::new();
        assert!(table.insert(reservation("aa:aa", "bb:bb", 0)).is_none());

        // Same pair, opposite direction.
        let displaced = table.insert(reservation("bb:bb", "aa:aa", 10)).expect("old entry expected");
        assert_eq!(displaced.created_at, 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn expiry_boundary_is_strictly_greater_than_ttl() {
        let r = reservation("aa:aa", "bb:bb", 100);
        assert!(!r.is_expired(159));
        assert!(!r.is_expired(160), "a reservation is honored through the full TTL");
        assert!(r.is_expired(161));
        assert_eq!(r.remaining_ttl(161), 0);
    }

    #[test]
    fn remove_expired_keeps_live_entries() {
        let mut table = ReservationTable::new();
        table.insert(reservation("aa:aa", "bb:bb", 0));
        table.insert(reservation("cc:cc", "dd:dd", 50));

        let removed = table.remove_expired(61);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].src, HostId::new("aa:aa"));
        assert_eq!(table.len(), 1);
        assert!(table.get(&FlowKey::new(&HostId::new("cc:cc"), &HostId::new("dd:dd"))).is_some());
    }
}
