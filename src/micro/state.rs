use crate::agents::VehicleID;
use crate::spatial_index::BucketIndex;

/// The microscopic state of one lane: the vehicle sequence ordered ascending
/// by position, plus the bucket index answering neighbor queries.
///
/// The order vector and the index always agree; every mutation goes through
/// this type. Ordering ties (two vehicles momentarily at the same position
/// during lane-change insertion) resolve by vehicle id.
#[derive(Debug, Clone)]
pub struct MicroState {
    /// Vehicle ids sorted ascending by `(s, id)`.
    order: Vec<VehicleID>,
    /// Bucket index over the same vehicles.
    index: BucketIndex,
}

impl MicroState {
    /// Creates an empty state for a lane.
    ///
    /// # Arguments
    /// * `lane_length` - Arc length of the lane, metres.
    /// * `bucket_size` - Bucket width for the index; at least the maximum
    ///   model interaction range.
    pub fn new(lane_length: f64, bucket_size: f64) -> Self {
        MicroState {
            order: Vec::new(),
            index: BucketIndex::new(lane_length, bucket_size),
        }
    }

    /// Builds a state from `(id, s)` pairs in any order.
    pub fn from_vehicles(
        lane_length: f64,
        bucket_size: f64,
        vehicles: impl IntoIterator<Item = (VehicleID, f64)>,
    ) -> Self {
        let index = BucketIndex::from_entries(lane_length, bucket_size, vehicles);
        let order = index.iter_ordered().map(|entry| entry.id).collect();
        MicroState { order, index }
    }

    /// The vehicle sequence, ascending by position.
    pub fn order(&self) -> &[VehicleID] {
        &self.order
    }

    /// The bucket index.
    pub fn index(&self) -> &BucketIndex {
        &self.index
    }

    /// Number of vehicles on the lane.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the lane is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Inserts a vehicle and restores ordering.
    pub fn insert(&mut self, id: VehicleID, s: f64) {
        self.index.insert(id, s);
        self.resort();
    }

    /// Removes a vehicle indexed at position `s`.
    ///
    /// # Returns
    /// `true` when the vehicle was present.
    pub fn remove(&mut self, id: VehicleID, s: f64) -> bool {
        let removed = self.index.remove(id, s);
        if removed {
            self.resort();
        }
        removed
    }

    /// Moves a vehicle to a new position and restores ordering.
    pub fn update(&mut self, id: VehicleID, old_s: f64, new_s: f64) -> bool {
        let updated = self.index.update(id, old_s, new_s);
        if updated {
            self.resort();
        }
        updated
    }

    /// Rebuilds the order vector from the index.
    fn resort(&mut self) {
        self.order.clear();
        self.order.extend(self.index.iter_ordered().map(|entry| entry.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vehicles_sorts() {
        let state =
            MicroState::from_vehicles(1000.0, 150.0, [(5, 700.0), (1, 100.0), (3, 400.0)]);
        assert_eq!(state.order(), &[1, 3, 5], "Order must ascend by position");
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_mutations_keep_order_and_index_consistent() {
        let mut state = MicroState::from_vehicles(1000.0, 150.0, [(1, 100.0), (2, 500.0)]);
        state.insert(3, 300.0);
        assert_eq!(state.order(), &[1, 3, 2]);
        assert!(state.update(1, 100.0, 600.0));
        assert_eq!(state.order(), &[3, 2, 1]);
        assert!(state.remove(2, 500.0));
        assert_eq!(state.order(), &[3, 1]);
        assert_eq!(state.index().len(), 2, "Index must track mutations");
    }
}
