use crate::adaptive::LaneMode;
use crate::agents::VehicleID;
use crate::network::LaneID;
use serde_json::json;

/// State of a single vehicle at a committed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub id: VehicleID,
    pub lane_id: LaneID,
    /// Longitudinal position along the lane, metres.
    pub s: f64,
    /// Speed, m/s.
    pub v: f64,
    /// Acceleration applied on the last tick, m/s².
    pub a: f64,
    /// Vehicle length, metres.
    pub length: f64,
    /// Heading at the vehicle's position, radians.
    pub heading: f64,
}

/// State of a single lane at a committed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneRecord {
    pub lane_id: LaneID,
    pub mode: LaneMode,
    /// Vehicle count (MICRO) or `∫ρ dx` (MACRO).
    pub vehicle_count: f64,
    /// Mean density over the lane, veh/m.
    pub mean_density: f64,
    /// Mean speed over the lane, m/s.
    pub mean_speed: f64,
}

/// Per-tick counters published with each snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCounters {
    /// Lanes in the microscopic representation after the commit.
    pub micro_lanes: usize,
    /// Lanes in the macroscopic representation after the commit.
    pub macro_lanes: usize,
    /// Lanes that ran the translator this tick.
    pub transitioning_lanes: usize,
    /// Translation events this tick.
    pub translations: u64,
    /// Lane changes committed this tick.
    pub lane_change_commits: u64,
    /// Lane-change requests dropped by the reservation rule this tick.
    pub lane_change_conflicts: u64,
    /// Consistency patches applied this tick.
    pub patches: u64,
    /// Influences dropped as invalid this tick.
    pub influence_drops: u64,
}

/// Read-only view of the whole simulation after a committed tick.
///
/// Snapshots are deterministic: vehicles sort by id, lanes follow network
/// registration order, and no wall-clock data is included.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The committed tick.
    pub tick: u64,
    /// Simulation time `tick · dt`, seconds.
    pub sim_time: f64,
    /// All vehicles, ascending by id.
    pub vehicles: Vec<VehicleRecord>,
    /// All lanes, in registration order.
    pub lanes: Vec<LaneRecord>,
    /// This tick's counters.
    pub counters: TickCounters,
}

impl Snapshot {
    /// Serializes the snapshot to a JSON string for external consumers.
    ///
    /// # Example
    /// ```
    /// use hybrid_traffic_sim_core::simulation::{Snapshot, TickCounters};
    /// let snapshot = Snapshot {
    ///     tick: 3,
    ///     sim_time: 0.3,
    ///     vehicles: vec![],
    ///     lanes: vec![],
    ///     counters: TickCounters::default(),
    /// };
    /// let json = snapshot.to_json_string();
    /// assert!(json.contains("\"tick\":3"));
    /// ```
    pub fn to_json_string(&self) -> String {
        let vehicles: Vec<_> = self
            .vehicles
            .iter()
            .map(|vehicle| {
                json!({
                    "id": vehicle.id,
                    "lane_id": vehicle.lane_id,
                    "s": vehicle.s,
                    "v": vehicle.v,
                    "a": vehicle.a,
                    "length": vehicle.length,
                    "heading": vehicle.heading,
                })
            })
            .collect();
        let lanes: Vec<_> = self
            .lanes
            .iter()
            .map(|lane| {
                json!({
                    "lane_id": lane.lane_id,
                    "mode": lane.mode.to_string(),
                    "vehicle_count": lane.vehicle_count,
                    "mean_density": lane.mean_density,
                    "mean_speed": lane.mean_speed,
                })
            })
            .collect();
        json!({
            "tick": self.tick,
            "sim_time": self.sim_time,
            "vehicles": vehicles,
            "lanes": lanes,
            "counters": {
                "micro_lanes": self.counters.micro_lanes,
                "macro_lanes": self.counters.macro_lanes,
                "transitioning_lanes": self.counters.transitioning_lanes,
                "translations": self.counters.translations,
                "lane_change_commits": self.counters.lane_change_commits,
                "lane_change_conflicts": self.counters.lane_change_conflicts,
                "patches": self.counters.patches,
                "influence_drops": self.counters.influence_drops,
            },
        })
        .to_string()
    }

    /// Total mass on the network: vehicles plus integrated density.
    pub fn total_mass(&self) -> f64 {
        let macro_mass: f64 = self
            .lanes
            .iter()
            .filter(|lane| lane.mode == LaneMode::Macro)
            .map(|lane| lane.vehicle_count)
            .sum();
        self.vehicles.len() as f64 + macro_mass
    }
}

/// Cumulative counters and timing since construction. Unlike snapshots,
/// statistics may carry wall-clock data; they are not part of the
/// determinism contract.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationStatistics {
    pub total_lanes: usize,
    pub micro_lanes: usize,
    pub macro_lanes: usize,
    pub transitioning_lanes: usize,
    pub total_vehicles: usize,
    /// Mean of all lanes' mean densities, veh/m.
    pub avg_density: f64,
    pub translations_total: u64,
    pub lane_change_commits_total: u64,
    pub lane_change_conflicts_total: u64,
    pub patches_total: u64,
    pub influence_drops_total: u64,
    /// Vehicles that left the network through exits, cumulative.
    pub exits_total: u64,
    /// Wall-clock duration of the last step, microseconds.
    pub last_step_micros: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_shape() {
        let snapshot = Snapshot {
            tick: 7,
            sim_time: 0.7,
            vehicles: vec![VehicleRecord {
                id: 1,
                lane_id: 2,
                s: 10.0,
                v: 20.0,
                a: 0.5,
                length: 5.0,
                heading: 0.0,
            }],
            lanes: vec![LaneRecord {
                lane_id: 2,
                mode: LaneMode::Micro,
                vehicle_count: 1.0,
                mean_density: 0.001,
                mean_speed: 20.0,
            }],
            counters: TickCounters::default(),
        };
        let json = snapshot.to_json_string();
        assert!(json.contains("\"mode\":\"micro\""));
        assert!(json.contains("\"lane_change_commits\":0"));
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("output must be valid JSON");
        assert_eq!(parsed["vehicles"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_total_mass_mixes_representations() {
        let snapshot = Snapshot {
            tick: 0,
            sim_time: 0.0,
            vehicles: vec![
                VehicleRecord {
                    id: 1,
                    lane_id: 1,
                    s: 0.0,
                    v: 0.0,
                    a: 0.0,
                    length: 5.0,
                    heading: 0.0,
                };
                3
            ],
            lanes: vec![
                LaneRecord {
                    lane_id: 1,
                    mode: LaneMode::Micro,
                    vehicle_count: 3.0,
                    mean_density: 0.003,
                    mean_speed: 10.0,
                },
                LaneRecord {
                    lane_id: 2,
                    mode: LaneMode::Macro,
                    vehicle_count: 42.5,
                    mean_density: 0.0425,
                    mean_speed: 15.0,
                },
            ],
            counters: TickCounters::default(),
        };
        assert!((snapshot.total_mass() - 45.5).abs() < 1e-12);
    }
}
