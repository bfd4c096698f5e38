use crate::agents::VehicleID;
use std::cmp::Ordering;

/// One `(s, id)` entry of the index.
///
/// Entries are ordered by position first and vehicle id second; the id
/// tie-break keeps every query deterministic even while two vehicles briefly
/// share a position during lane-change insertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    /// Longitudinal position along the lane, metres.
    pub s: f64,
    /// Vehicle identifier.
    pub id: VehicleID,
}

impl IndexEntry {
    fn key_cmp(&self, other: &IndexEntry) -> Ordering {
        self.s
            .total_cmp(&other.s)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// The leader and follower a vehicle would have at a queried position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Neighborhood {
    /// Nearest entry strictly ahead of the queried position, if any.
    pub leader: Option<IndexEntry>,
    /// Nearest entry strictly behind the queried position, if any.
    pub follower: Option<IndexEntry>,
}

/// Per-lane 1-D bucketed spatial index.
///
/// Vehicles are hashed into buckets keyed by `floor(s / bucket_size)`.
/// Within a bucket, entries stay sorted by `(s, id)`, so leader/follower
/// queries walk at most a handful of buckets and never scan the whole lane.
///
/// # Example
///
/// ```
/// use hybrid_traffic_sim_core::spatial_index::BucketIndex;
/// let mut index = BucketIndex::new(1000.0, 150.0);
/// index.insert(1, 100.0);
/// index.insert(2, 400.0);
/// let leader = index.leader(100.0, 1).unwrap();
/// assert_eq!(leader.id, 2);
/// assert!(index.follower(100.0, 1).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct BucketIndex {
    /// Bucket width in metres; at least the maximum model interaction range.
    bucket_size: f64,
    /// Buckets of `(s, id)` entries, each sorted ascending by `(s, id)`.
    buckets: Vec<Vec<IndexEntry>>,
    /// Total number of indexed vehicles.
    len: usize,
}

impl BucketIndex {
    /// Creates an empty index covering a lane of the given length.
    ///
    /// # Arguments
    /// * `lane_length` - Arc length of the indexed lane, metres.
    /// * `bucket_size` - Bucket width, metres; clamped to be ≥ 1.
    pub fn new(lane_length: f64, bucket_size: f64) -> Self {
        let bucket_size = bucket_size.max(1.0);
        let num_buckets = (lane_length / bucket_size).ceil().max(1.0) as usize;
        BucketIndex {
            bucket_size,
            buckets: vec![Vec::new(); num_buckets],
            len: 0,
        }
    }

    /// Builds an index from an iterator of `(id, s)` pairs.
    pub fn from_entries(
        lane_length: f64,
        bucket_size: f64,
        entries: impl IntoIterator<Item = (VehicleID, f64)>,
    ) -> Self {
        let mut index = Self::new(lane_length, bucket_size);
        for (id, s) in entries {
            index.insert(id, s);
        }
        index
    }

    /// Number of indexed vehicles.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every entry, keeping the bucket layout.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    fn bucket_of(&self, s: f64) -> usize {
        let raw = (s / self.bucket_size).floor();
        (raw.max(0.0) as usize).min(self.buckets.len() - 1)
    }

    /// Inserts a vehicle at position `s`. O(1) amortized.
    ///
    /// # Arguments
    /// * `id` - Vehicle identifier.
    /// * `s` - Position along the lane, metres.
    pub fn insert(&mut self, id: VehicleID, s: f64) {
        let entry = IndexEntry { s, id };
        let bucket_idx = self.bucket_of(s);
        let bucket = &mut self.buckets[bucket_idx];
        let pos = bucket
            .binary_search_by(|probe| probe.key_cmp(&entry))
            .unwrap_or_else(|pos| pos);
        bucket.insert(pos, entry);
        self.len += 1;
    }

    /// Removes the vehicle indexed at position `s`.
    ///
    /// # Arguments
    /// * `id` - Vehicle identifier.
    /// * `s` - The position the vehicle was indexed under.
    ///
    /// # Returns
    /// `true` when the entry was present.
    pub fn remove(&mut self, id: VehicleID, s: f64) -> bool {
        let entry = IndexEntry { s, id };
        let bucket_idx = self.bucket_of(s);
        let bucket = &mut self.buckets[bucket_idx];
        match bucket.binary_search_by(|probe| probe.key_cmp(&entry)) {
            Ok(pos) => {
                bucket.remove(pos);
                self.len -= 1;
                true
            }
            Err(_) => false,
        }
    }

    /// Moves a vehicle from `old_s` to `new_s`. O(1) amortized.
    ///
    /// # Returns
    /// `true` when the entry was present under `old_s`.
    pub fn update(&mut self, id: VehicleID, old_s: f64, new_s: f64) -> bool {
        if !self.remove(id, old_s) {
            return false;
        }
        self.insert(id, new_s);
        true
    }

    /// Returns the leader of the vehicle `(s, id)`: the entry with the
    /// smallest position strictly greater than `s`, ties broken by id.
    ///
    /// # Arguments
    /// * `s` - The querying vehicle's position.
    /// * `id` - The querying vehicle's id (excluded from the result).
    ///
    /// # Returns
    /// The leader entry, or `None` when nobody is ahead within the lane.
    pub fn leader(&self, s: f64, id: VehicleID) -> Option<IndexEntry> {
        let probe = IndexEntry { s, id };
        let start = self.bucket_of(s);
        for bucket_idx in start..self.buckets.len() {
            let bucket = &self.buckets[bucket_idx];
            let pos = match bucket.binary_search_by(|e| e.key_cmp(&probe)) {
                Ok(pos) => pos + 1,
                Err(pos) => pos,
            };
            if pos < bucket.len() {
                return Some(bucket[pos]);
            }
        }
        None
    }

    /// Returns the follower of the vehicle `(s, id)`: the entry with the
    /// largest position strictly smaller than `s`, ties broken by id.
    ///
    /// # Arguments
    /// * `s` - The querying vehicle's position.
    /// * `id` - The querying vehicle's id (excluded from the result).
    ///
    /// # Returns
    /// The follower entry, or `None` when nobody is behind within the lane.
    pub fn follower(&self, s: f64, id: VehicleID) -> Option<IndexEntry> {
        let probe = IndexEntry { s, id };
        let start = self.bucket_of(s);
        for bucket_idx in (0..=start).rev() {
            let bucket = &self.buckets[bucket_idx];
            let pos = match bucket.binary_search_by(|e| e.key_cmp(&probe)) {
                Ok(pos) | Err(pos) => pos,
            };
            if pos > 0 {
                return Some(bucket[pos - 1]);
            }
        }
        None
    }

    /// Returns the leader and follower a vehicle would have after a
    /// hypothetical move to position `s_query` on this lane, restricted to
    /// `radius` metres. Used by lane-change evaluation.
    ///
    /// An entry exactly level with `s_query` is neither ahead nor behind and
    /// is not reported: a level vehicle is either the mirror half of a
    /// mutual swap, which the lane-change reservation arbitrates at commit,
    /// or a transient insertion overlap separated by the end-of-tick patch.
    ///
    /// # Arguments
    /// * `s_query` - The hypothetical position on this lane.
    /// * `radius` - Maximum distance of interest, metres.
    pub fn neighbors_on(&self, s_query: f64, radius: f64) -> Neighborhood {
        let leader = self
            .leader(s_query, VehicleID::MAX)
            .filter(|entry| entry.s - s_query <= radius);
        let follower = self
            .follower(s_query, VehicleID::MIN)
            .filter(|entry| s_query - entry.s <= radius);
        Neighborhood { leader, follower }
    }

    /// Iterates all entries ascending by `(s, id)`. Used to rebuild the
    /// per-lane ordered vehicle sequence after mutation.
    pub fn iter_ordered(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.buckets.iter().flat_map(|bucket| bucket.iter().copied())
    }
}
