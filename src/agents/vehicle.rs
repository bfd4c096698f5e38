use crate::agents::DriverProfile;
use crate::network::LaneID;
use std::collections::VecDeque;

pub type VehicleID = u64; // Alias for VehicleID

/// Represents one vehicle of the microscopic representation.
///
/// The longitudinal state lives in lane coordinates: `s` is the arc length
/// along the current lane, `v` the speed and `a` the acceleration applied on
/// the last tick. A vehicle only ever exists on a lane whose representation is
/// microscopic; macroscopic lanes carry density instead of vehicle objects.
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// Unique identifier.
    pub id: VehicleID,
    /// Vehicle length `ℓ` in metres.
    pub length: f64,
    /// The lane currently owning this vehicle.
    pub lane: LaneID,
    /// Longitudinal position `s ∈ [0, L)` along the current lane, metres.
    pub s: f64,
    /// Current speed `v ≥ 0` in m/s.
    pub v: f64,
    /// Acceleration applied on the last tick, m/s².
    pub a: f64,
    /// Driver-model parameters.
    pub profile: DriverProfile,
    /// Remaining route: lanes to take at upcoming lane ends, front first.
    /// When empty, the first registered successor is taken.
    pub route: VecDeque<LaneID>,
}

impl Vehicle {
    /// Constructs a new `VehicleBuilder` for building a `Vehicle` object.
    ///
    /// # Arguments
    /// * `id` - A unique identifier for the vehicle.
    ///
    /// # Returns
    /// A `VehicleBuilder` used to configure and build the `Vehicle`.
    ///
    /// # Example
    /// ```
    /// use hybrid_traffic_sim_core::agents::Vehicle;
    /// let vehicle = Vehicle::new(1)
    ///     .with_lane(5)
    ///     .with_position(120.0)
    ///     .with_speed(25.0)
    ///     .build();
    /// assert_eq!(vehicle.s, 120.0);
    /// ```
    pub fn new(id: VehicleID) -> VehicleBuilder {
        VehicleBuilder {
            vehicle: Vehicle {
                id,
                length: 5.0,
                lane: 0,
                s: 0.0,
                v: 0.0,
                a: 0.0,
                profile: DriverProfile::default(),
                route: VecDeque::new(),
            },
        }
    }

    /// Picks the lane to enter when this vehicle crosses the end of `lane`:
    /// the next route entry when it matches a registered successor, otherwise
    /// the first registered successor.
    ///
    /// # Arguments
    /// * `successors` - The current lane's registered successors, in priority
    ///   order.
    ///
    /// # Returns
    /// The chosen successor, or `None` when the lane has none (network exit).
    pub fn pick_successor(&mut self, successors: &[LaneID]) -> Option<LaneID> {
        if successors.is_empty() {
            return None;
        }
        if let Some(&preferred) = self.route.front() {
            if successors.contains(&preferred) {
                self.route.pop_front();
                return Some(preferred);
            }
        }
        Some(successors[0])
    }

    /// Rear end of the vehicle: `s − ℓ`.
    pub fn rear(&self) -> f64 {
        self.s - self.length
    }
}

/// A builder pattern implementation for constructing `Vehicle` objects.
///
/// `VehicleBuilder` allows optional configuration of `Vehicle` fields before
/// building the final `Vehicle` object.
pub struct VehicleBuilder {
    vehicle: Vehicle,
}

impl VehicleBuilder {
    /// Sets the owning lane.
    ///
    /// # Arguments
    /// * `lane_id` - The lane the vehicle starts on.
    ///
    /// # Returns
    /// A `VehicleBuilder` instance for further method chaining.
    pub fn with_lane(mut self, lane_id: LaneID) -> Self {
        self.vehicle.lane = lane_id;
        self
    }

    /// Sets the longitudinal position along the owning lane.
    ///
    /// # Arguments
    /// * `s` - Arc length in metres.
    pub fn with_position(mut self, s: f64) -> Self {
        self.vehicle.s = s;
        self
    }

    /// Sets the current speed.
    ///
    /// # Arguments
    /// * `v` - Speed in m/s; clamped to be non-negative.
    pub fn with_speed(mut self, v: f64) -> Self {
        self.vehicle.v = v.max(0.0);
        self
    }

    /// Sets the vehicle length.
    ///
    /// # Arguments
    /// * `length` - Length in metres.
    pub fn with_length(mut self, length: f64) -> Self {
        self.vehicle.length = length;
        self
    }

    /// Sets the driver-model parameters.
    ///
    /// # Arguments
    /// * `profile` - The driver profile. See the ref. at `DriverProfile`.
    pub fn with_profile(mut self, profile: DriverProfile) -> Self {
        self.vehicle.profile = profile;
        self
    }

    /// Sets the remaining route as an ordered list of lanes to take at
    /// upcoming lane ends.
    ///
    /// # Arguments
    /// * `route` - Lane ids, the first to be taken at the next lane end.
    pub fn with_route(mut self, route: Vec<LaneID>) -> Self {
        self.vehicle.route = route.into();
        self
    }

    /// Builds the final `Vehicle` object.
    ///
    /// # Returns
    /// The fully constructed `Vehicle` object.
    pub fn build(self) -> Vehicle {
        self.vehicle
    }
}
