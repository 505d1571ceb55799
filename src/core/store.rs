//! Dense, swap-compacting storage for fixed-size GPU records
//!
//! A record is `vertices_per_record` consecutive vertices of type `V`. Live
//! records always occupy slots `0..count`; removal moves the last record into
//! the freed slot so the live range never has holes and can be uploaded and
//! drawn as one contiguous slice.

use bytemuck::{Pod, Zeroable};
use tracing::{debug, trace, warn};

use super::error::{RenderError, Result};

/// Initial capacity in records. Matches the minimal buffer size the store
/// falls back to on [`DenseBufferStore::reset`].
pub const INITIAL_RECORD_CAPACITY: usize = 16;

/// Reported by [`DenseBufferStore::remove`] when a record changed slot.
///
/// The record that lived at `from` (always the previous last slot) now lives
/// at `to`. Callers holding an external id → slot map must update it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
}

/// Growable array of fixed-width records with O(1) append and O(1) removal.
#[derive(Debug)]
pub struct DenseBufferStore<V: Pod> {
    /// Backing storage, always `capacity * vertices_per_record` long.
    /// Anything past `count` records is stale and never rendered.
    vertices: Vec<V>,
    vertices_per_record: usize,
    capacity: usize,
    count: usize,
    /// Number of times the storage has been reallocated since the last reset
    reallocations: usize,
}

impl<V: Pod> DenseBufferStore<V> {
    /// Create a store whose records are `vertices_per_record` vertices wide.
    ///
    /// # Panics
    /// Panics if `vertices_per_record` is zero.
    pub fn new(vertices_per_record: usize) -> Self {
        assert!(vertices_per_record > 0, "records must hold at least one vertex");
        Self {
            vertices: vec![V::zeroed(); INITIAL_RECORD_CAPACITY * vertices_per_record],
            vertices_per_record,
            capacity: INITIAL_RECORD_CAPACITY,
            count: 0,
            reallocations: 0,
        }
    }

    /// Append a new record and return its dense index.
    ///
    /// The record starts zeroed, which draws as nothing until the caller
    /// writes it via [`Self::record_mut`].
    pub fn create(&mut self) -> usize {
        if self.count == self.capacity {
            self.grow();
        }
        let id = self.count;
        let width = self.vertices_per_record;
        self.vertices[id * width..(id + 1) * width].fill(V::zeroed());
        self.count += 1;
        trace!(id, count = self.count, "Record created");
        id
    }

    /// Remove the record at `id`, filling the hole with the last record.
    ///
    /// Returns `Ok(Some(relocation))` when a record changed slot,
    /// `Ok(None)` when the removed record was the last one or the store was
    /// already empty (removal from an empty store is a no-op).
    pub fn remove(&mut self, id: usize) -> Result<Option<Relocation>> {
        if self.count == 0 {
            return Ok(None);
        }
        if id >= self.count {
            warn!(id, count = self.count, "Removal of slot outside live range rejected");
            return Err(RenderError::SlotOutOfRange {
                slot: id,
                count: self.count,
            });
        }

        let last = self.count - 1;
        self.count = last;

        if id == last {
            trace!(id, count = self.count, "Last record removed");
            return Ok(None);
        }

        let width = self.vertices_per_record;
        self.vertices
            .copy_within(last * width..(last + 1) * width, id * width);

        trace!(from = last, to = id, count = self.count, "Record relocated");
        Ok(Some(Relocation { from: last, to: id }))
    }

    /// Exchange the contents of two live records.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_live(a)?;
        self.check_live(b)?;
        if a == b {
            return Ok(());
        }

        let width = self.vertices_per_record;
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.vertices.split_at_mut(high * width);
        head[low * width..(low + 1) * width].swap_with_slice(&mut tail[..width]);
        Ok(())
    }

    /// Drop every record and return to the initial minimal capacity.
    pub fn reset(&mut self) {
        self.vertices = vec![V::zeroed(); INITIAL_RECORD_CAPACITY * self.vertices_per_record];
        self.capacity = INITIAL_RECORD_CAPACITY;
        self.count = 0;
        self.reallocations = 0;
    }

    /// Vertices of one live record.
    pub fn record(&self, id: usize) -> Result<&[V]> {
        self.check_live(id)?;
        let width = self.vertices_per_record;
        Ok(&self.vertices[id * width..(id + 1) * width])
    }

    /// Zero one live record so it draws as nothing.
    pub fn clear_record(&mut self, id: usize) -> Result<()> {
        self.record_mut(id)?.fill(V::zeroed());
        Ok(())
    }

    /// Mutable vertices of one live record.
    pub fn record_mut(&mut self, id: usize) -> Result<&mut [V]> {
        self.check_live(id)?;
        let width = self.vertices_per_record;
        Ok(&mut self.vertices[id * width..(id + 1) * width])
    }

    /// All live vertices, in slot order.
    pub fn live_vertices(&self) -> &[V] {
        &self.vertices[..self.count * self.vertices_per_record]
    }

    /// Live vertices as raw bytes, ready for upload.
    pub fn live_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.live_vertices())
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Allocated capacity in records.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocated capacity in bytes.
    #[inline]
    pub fn byte_capacity(&self) -> usize {
        self.capacity * self.record_bytes()
    }

    /// Width of one record in bytes.
    #[inline]
    pub fn record_bytes(&self) -> usize {
        self.vertices_per_record * std::mem::size_of::<V>()
    }

    #[inline]
    pub fn vertices_per_record(&self) -> usize {
        self.vertices_per_record
    }

    /// Reallocations performed since construction or the last reset.
    #[inline]
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    fn grow(&mut self) {
        let old_bytes = self.byte_capacity();
        let new_capacity = self.capacity * 2;

        let mut extended = vec![V::zeroed(); new_capacity * self.vertices_per_record];
        extended[..self.vertices.len()].copy_from_slice(&self.vertices);
        self.vertices = extended;
        self.capacity = new_capacity;
        self.reallocations += 1;

        debug!(
            old_bytes,
            new_bytes = self.byte_capacity(),
            records = self.capacity,
            "Record storage grown"
        );
    }

    #[inline]
    fn check_live(&self, id: usize) -> Result<()> {
        if id < self.count {
            Ok(())
        } else {
            Err(RenderError::SlotOutOfRange {
                slot: id,
                count: self.count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-vertex record with a recognizable payload per slot
    fn filled_store(records: usize) -> DenseBufferStore<[u32; 2]> {
        let mut store = DenseBufferStore::new(2);
        for i in 0..records {
            let id = store.create();
            assert_eq!(id, i);
            let rec = store.record_mut(id).unwrap();
            rec[0] = [i as u32, 0xAAAA];
            rec[1] = [i as u32, 0xBBBB];
        }
        store
    }

    fn payload(store: &DenseBufferStore<[u32; 2]>, id: usize) -> u32 {
        store.record(id).unwrap()[0][0]
    }

    #[test]
    fn create_returns_dense_indices() {
        let mut store = DenseBufferStore::<f32>::new(1);
        assert!(store.is_empty());
        assert_eq!(store.create(), 0);
        assert_eq!(store.create(), 1);
        assert_eq!(store.create(), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn remove_middle_moves_last_record_bit_for_bit() {
        let mut store = filled_store(5);
        let last_before: Vec<[u32; 2]> = store.record(4).unwrap().to_vec();

        let moved = store.remove(1).unwrap();
        assert_eq!(moved, Some(Relocation { from: 4, to: 1 }));
        assert_eq!(store.len(), 4);
        assert_eq!(store.record(1).unwrap(), last_before.as_slice());
    }

    #[test]
    fn remove_last_does_not_copy() {
        let mut store = filled_store(3);
        let before: Vec<u8> = store.live_bytes().to_vec();

        assert_eq!(store.remove(2).unwrap(), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.live_bytes(), &before[..2 * store.record_bytes()]);
    }

    #[test]
    fn remove_from_empty_store_is_noop() {
        let mut store = DenseBufferStore::<[u32; 2]>::new(2);
        let before: Vec<u8> = bytemuck::cast_slice(&store.vertices).to_vec();

        assert_eq!(store.remove(0).unwrap(), None);
        assert_eq!(store.remove(7).unwrap(), None);
        assert_eq!(store.len(), 0);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&store.vertices), before.as_slice());
    }

    #[test]
    fn remove_out_of_range_is_rejected() {
        let mut store = filled_store(3);
        let err = store.remove(3).unwrap_err();
        assert!(matches!(err, RenderError::SlotOutOfRange { slot: 3, count: 3 }));
        assert_eq!(store.len(), 3);
        assert_eq!(payload(&store, 2), 2);
    }

    #[test]
    fn growth_doubles_bytes_and_preserves_content() {
        let mut store = filled_store(INITIAL_RECORD_CAPACITY);
        let bytes_before = store.byte_capacity();
        let content_before: Vec<u8> = store.live_bytes().to_vec();
        assert_eq!(store.reallocations(), 0);

        store.create();

        assert_eq!(store.reallocations(), 1);
        assert_eq!(store.byte_capacity(), bytes_before * 2);
        assert_eq!(&store.live_bytes()[..content_before.len()], content_before.as_slice());
    }

    #[test]
    fn density_holds_under_churn() {
        let mut store = DenseBufferStore::<[u32; 2]>::new(2);
        // external id per slot, updated from relocations the way a caller would
        let mut owners: Vec<u32> = Vec::new();
        let mut next_owner = 0u32;

        let mut created = 0usize;
        let mut removed = 0usize;
        for step in 0..400usize {
            if step % 3 == 2 && !owners.is_empty() {
                let victim = (step * 7) % owners.len();
                match store.remove(victim).unwrap() {
                    Some(Relocation { from, to }) => {
                        owners.swap_remove(victim);
                        assert_eq!(to, victim);
                        assert_eq!(from, owners.len());
                    }
                    None => {
                        owners.swap_remove(victim);
                    }
                }
                removed += 1;
            } else {
                let id = store.create();
                store.record_mut(id).unwrap()[0] = [next_owner, 0];
                owners.push(next_owner);
                next_owner += 1;
                created += 1;
            }

            assert_eq!(store.len(), created - removed);
            for (slot, owner) in owners.iter().enumerate() {
                assert_eq!(payload(&store, slot), *owner);
            }
        }
    }

    #[test]
    fn recycled_slot_starts_zeroed() {
        let mut store = filled_store(3);
        store.remove(2).unwrap();
        let id = store.create();
        assert_eq!(id, 2);
        assert_eq!(store.record(id).unwrap(), &[[0, 0], [0, 0]]);

        store.clear_record(0).unwrap();
        assert_eq!(store.record(0).unwrap(), &[[0, 0], [0, 0]]);
        assert_eq!(payload(&store, 1), 1);
        assert!(store.clear_record(3).is_err());
    }

    #[test]
    fn swap_exchanges_full_records() {
        let mut store = filled_store(4);
        store.swap(3, 0).unwrap();
        assert_eq!(payload(&store, 0), 3);
        assert_eq!(payload(&store, 3), 0);
        assert_eq!(store.record(0).unwrap()[1], [3, 0xBBBB]);
        assert!(store.swap(0, 4).is_err());
    }

    #[test]
    fn reset_returns_to_initial_capacity() {
        let mut store = filled_store(40);
        assert!(store.capacity() > INITIAL_RECORD_CAPACITY);
        store.reset();
        assert_eq!(store.len(), 0);
        assert_eq!(store.capacity(), INITIAL_RECORD_CAPACITY);
        assert_eq!(store.reallocations(), 0);
    }
}
