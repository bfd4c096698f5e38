use crate::agents::{Vehicle, VehicleID};
use indexmap::IndexMap;

/// The central vehicle arena.
///
/// Every vehicle in the simulation lives here exactly once, keyed by id;
/// lanes and scratch buffers refer to vehicles by id only, so there is no
/// shared ownership to manage. The arena iterates in insertion order, which
/// keeps whole-population sweeps (snapshots, conservation checks)
/// deterministic without re-sorting.
///
/// # Example
///
/// ```
/// use hybrid_traffic_sim_core::agents::{Vehicle, VehiclesStorage};
///
/// let mut arena = VehiclesStorage::new();
/// arena.insert_vehicle(Vehicle::new(7).with_lane(1).with_position(50.0).build());
/// assert!(arena.contains(7));
/// assert_eq!(arena.get(7).map(|vehicle| vehicle.lane), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct VehiclesStorage {
    arena: IndexMap<VehicleID, Vehicle>,
}

impl VehiclesStorage {
    /// Creates an empty arena.
    pub fn new() -> Self {
        VehiclesStorage { arena: IndexMap::new() }
    }

    /// Adds a vehicle under its own id. An existing vehicle with the same id
    /// is replaced.
    pub fn insert_vehicle(&mut self, vehicle: Vehicle) {
        self.arena.insert(vehicle.id, vehicle);
    }

    /// Takes a vehicle out of the arena, keeping the relative order of the
    /// remaining vehicles intact.
    ///
    /// # Returns
    /// The removed vehicle, or `None` for an unknown id.
    pub fn remove_vehicle(&mut self, id: VehicleID) -> Option<Vehicle> {
        self.arena.shift_remove(&id)
    }

    /// Read access to a vehicle.
    pub fn get(&self, id: VehicleID) -> Option<&Vehicle> {
        self.arena.get(&id)
    }

    /// Write access to a vehicle. Only steppers, the translator and the
    /// resolution pass go through this.
    pub fn get_mut(&mut self, id: VehicleID) -> Option<&mut Vehicle> {
        self.arena.get_mut(&id)
    }

    /// Whether a vehicle with this id exists.
    pub fn contains(&self, id: VehicleID) -> bool {
        self.arena.contains_key(&id)
    }

    /// Number of vehicles in the arena.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Iterates vehicles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> + '_ {
        self.arena.values()
    }

    /// Iterates vehicle ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = VehicleID> + '_ {
        self.arena.keys().copied()
    }
}
