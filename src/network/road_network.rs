use crate::network::lane::{Lane, LaneID, NetworkError};
use indexmap::IndexMap;

/// `RoadNetwork` owns every lane of the simulated network.
///
/// Lanes are stored in registration order; the dense position of a lane in
/// that order (its *lane index*) is what the scheduler uses to key per-lane
/// runtime state, so iteration over the network is deterministic.
#[derive(Debug, Default)]
pub struct RoadNetwork {
    /// All lanes keyed by their unique id, in registration order.
    lanes: IndexMap<LaneID, Lane>,
}

impl RoadNetwork {
    /// Creates a new, empty `RoadNetwork`.
    ///
    /// # Example
    /// ```
    /// use hybrid_traffic_sim_core::network::RoadNetwork;
    /// let network = RoadNetwork::new();
    /// assert!(network.is_empty());
    /// ```
    pub fn new() -> Self {
        RoadNetwork {
            lanes: IndexMap::new(),
        }
    }

    /// Adds a lane to the network.
    ///
    /// # Arguments
    /// * `lane` - The lane to register.
    ///
    /// # Returns
    /// `Ok(())`, or `NetworkError::DuplicateLane` when the id is taken.
    ///
    /// # Example
    /// ```
    /// use hybrid_traffic_sim_core::geom::Point;
    /// use hybrid_traffic_sim_core::network::{Lane, RoadNetwork};
    /// let mut network = RoadNetwork::new();
    /// let lane = Lane::new(1)
    ///     .with_points(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])
    ///     .build()
    ///     .unwrap();
    /// network.add_lane(lane).unwrap();
    /// ```
    pub fn add_lane(&mut self, lane: Lane) -> Result<(), NetworkError> {
        if self.lanes.contains_key(&lane.id()) {
            return Err(NetworkError::DuplicateLane(lane.id()));
        }
        self.lanes.insert(lane.id(), lane);
        Ok(())
    }

    /// Retrieves a lane by its id.
    pub fn get_lane(&self, id: LaneID) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    /// Returns the dense index of a lane in registration order.
    pub fn lane_index(&self, id: LaneID) -> Option<usize> {
        self.lanes.get_index_of(&id)
    }

    /// Retrieves a lane by its dense index.
    pub fn lane_at(&self, index: usize) -> Option<&Lane> {
        self.lanes.get_index(index).map(|(_, lane)| lane)
    }

    /// Iterates over all lanes in registration order.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// Number of registered lanes.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Whether the network holds no lanes.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Validates structural integrity: every referenced neighbor,
    /// predecessor and successor must exist in the network.
    ///
    /// # Returns
    /// `Ok(())`, or the first `NetworkError::DanglingReference` found, in
    /// registration order.
    pub fn validate(&self) -> Result<(), NetworkError> {
        for lane in self.lanes.values() {
            for referenced in lane.referenced_lanes() {
                if !self.lanes.contains_key(&referenced) {
                    return Err(NetworkError::DanglingReference {
                        lane_id: lane.id(),
                        missing_id: referenced,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;

    fn straight_lane(id: LaneID) -> Lane {
        Lane::new(id)
            .with_points(vec![Point::new(0.0, id as f64), Point::new(100.0, id as f64)])
            .build()
            .unwrap()
    }

    #[test]
    fn test_add_and_lookup() {
        let mut network = RoadNetwork::new();
        network.add_lane(straight_lane(10)).unwrap();
        network.add_lane(straight_lane(20)).unwrap();
        assert_eq!(network.len(), 2);
        assert!(network.get_lane(10).is_some());
        assert_eq!(network.lane_index(20), Some(1), "Dense index follows registration order");
        assert_eq!(network.lane_at(0).unwrap().id(), 10);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut network = RoadNetwork::new();
        network.add_lane(straight_lane(1)).unwrap();
        assert!(
            matches!(network.add_lane(straight_lane(1)), Err(NetworkError::DuplicateLane(1))),
            "Duplicate lane id must be rejected"
        );
    }

    #[test]
    fn test_validate_dangling_reference() {
        let mut network = RoadNetwork::new();
        let lane = Lane::new(1)
            .with_points(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])
            .with_successors(vec![99])
            .build()
            .unwrap();
        network.add_lane(lane).unwrap();
        assert!(
            matches!(
                network.validate(),
                Err(NetworkError::DanglingReference { lane_id: 1, missing_id: 99 })
            ),
            "Dangling successor must be reported"
        );
    }
}
