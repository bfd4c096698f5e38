use crate::adaptive::{ForcedMode, LaneMode, ModeController, PendingMode};
use crate::agents::{DriverProfile, Vehicle, VehicleID, VehiclesStorage};
use crate::flows::FlowSource;
use crate::macroscopic::step_interior;
use crate::micro::{perceive_lane, step_lane, AdjacentLane, MicroState};
use crate::models::FundamentalDiagram;
use crate::network::{LaneID, NetworkError, RoadNetwork};
use crate::simulation::resolution::{self, Influence, LaneStepOutput, ResolveContext};
use crate::simulation::{
    ConfigError, LaneRecord, LaneRuntime, LaneState, SimulationConfig, SimulationStatistics,
    Snapshot, SnapshotTap, TickCounters, VehicleRecord,
};
use crate::translate::{
    decode_micro, encode_macro, MacroEncoding, TranslationError, TranslationProfilePolicy,
};
use crate::verbose::{
    EVENT_MODE_SWITCH, EVENT_STEP, EVENT_STEP_ABORTED, EVENT_STOP, EVENT_TRANSLATE_TO_MACRO,
    EVENT_TRANSLATE_TO_MICRO,
};
use crate::{log_additional, log_main};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Unified error type for all simulation operations.
#[derive(Debug)]
pub enum SimulationError {
    /// Configuration rejected at construction.
    Config(ConfigError),
    /// Network rejected at construction.
    Network(NetworkError),
    /// Translator broke the conservation contract; the tick was aborted.
    Translation(TranslationError),
    /// A worker found a lane referencing a vehicle missing from the arena;
    /// the tick was aborted before commit.
    CorruptLaneState {
        lane_id: LaneID,
        vehicle_id: VehicleID,
    },
    /// An initial vehicle or an operation referenced an unknown lane.
    UnknownLane(LaneID),
    /// Two initial vehicles carried the same id.
    DuplicateVehicle(VehicleID),
    /// The worker pool could not be built.
    WorkerPool(String),
    /// A cooperative stop was requested; state is at the last committed tick.
    Stopped,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(err) => write!(f, "Configuration error: {}", err),
            SimulationError::Network(err) => write!(f, "Network error: {}", err),
            SimulationError::Translation(err) => write!(f, "Translation error: {}", err),
            SimulationError::CorruptLaneState { lane_id, vehicle_id } => {
                write!(
                    f,
                    "Lane '{}' references vehicle '{}' missing from the arena",
                    lane_id, vehicle_id
                )
            }
            SimulationError::UnknownLane(lane_id) => {
                write!(f, "Unknown lane '{}'", lane_id)
            }
            SimulationError::DuplicateVehicle(vehicle_id) => {
                write!(f, "Duplicate vehicle id '{}'", vehicle_id)
            }
            SimulationError::WorkerPool(message) => {
                write!(f, "Worker pool construction failed: {}", message)
            }
            SimulationError::Stopped => write!(f, "Simulation stopped"),
        }
    }
}

impl std::error::Error for SimulationError {}

impl From<ConfigError> for SimulationError {
    fn from(err: ConfigError) -> Self {
        SimulationError::Config(err)
    }
}

impl From<NetworkError> for SimulationError {
    fn from(err: NetworkError) -> Self {
        SimulationError::Network(err)
    }
}

impl From<TranslationError> for SimulationError {
    fn from(err: TranslationError) -> Self {
        SimulationError::Translation(err)
    }
}

/// A translation plan computed read-only in the parallel translation pass
/// and applied sequentially.
enum TranslationPlan {
    ToMacro(MacroEncoding),
    /// Restored vehicles carrying placeholder ids `0..n`; real ids are
    /// assigned sequentially at apply time.
    ToMicro(Vec<Vehicle>),
    /// The pending mode no longer matched the live representation.
    Skip,
}

/// Cumulative totals since construction.
#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    translations: u64,
    lane_change_commits: u64,
    lane_change_conflicts: u64,
    patches: u64,
    influence_drops: u64,
    exits: u64,
    last_step_micros: u128,
}

/// The adaptive hybrid traffic simulation scheduler.
///
/// The single owning object of the core: road network, vehicle arena,
/// per-lane representations and mode records, seeded RNG, worker pool and
/// snapshot tap. A single logical thread advances time in fixed `dt` ticks;
/// within a tick, lane-local work fans out over the worker pool and all
/// cross-lane work runs sequentially, which makes committed state
/// deterministic for a given configuration, initial population, influence
/// sequence and seed.
///
/// # Example
///
/// ```
/// use hybrid_traffic_sim_core::geom::Point;
/// use hybrid_traffic_sim_core::network::{Lane, RoadNetwork};
/// use hybrid_traffic_sim_core::simulation::{Simulation, SimulationConfig};
/// use hybrid_traffic_sim_core::agents::Vehicle;
///
/// let mut network = RoadNetwork::new();
/// network.add_lane(
///     Lane::new(1)
///         .with_points(vec![Point::new(0.0, 0.0), Point::new(1000.0, 0.0)])
///         .with_speed_limit(30.0)
///         .build()
///         .unwrap(),
/// ).unwrap();
/// let config = SimulationConfig::new().build().unwrap();
/// let vehicles = vec![Vehicle::new(1).with_lane(1).with_position(100.0).with_speed(20.0).build()];
/// let mut simulation = Simulation::new(network, config, vehicles).unwrap();
/// let snapshot = simulation.step().unwrap();
/// assert_eq!(snapshot.tick, 1);
/// ```
pub struct Simulation {
    /// Unique simulation identifier.
    id: Uuid,
    config: SimulationConfig,
    diagram: FundamentalDiagram,
    controller: ModeController,
    network: RoadNetwork,
    vehicles: VehiclesStorage,
    /// Per-lane runtime state, indexed by the network's dense lane order.
    runtimes: Vec<LaneRuntime>,
    tick: u64,
    next_vehicle_id: VehicleID,
    rng: StdRng,
    /// Fractional-vehicle carries per directed macro→micro boundary.
    boundary_carries: IndexMap<(LaneID, LaneID), f64>,
    /// Influences queued for the next resolution pass.
    influences: Vec<Influence>,
    flow_sources: Vec<FlowSource>,
    totals: Totals,
    tap: SnapshotTap,
    stop_flag: Arc<AtomicBool>,
    pool: rayon::ThreadPool,
}

impl Simulation {
    /// Creates a simulation over a validated network with an initial vehicle
    /// population. All lanes start microscopic; the first controller pass
    /// may switch loaded lanes immediately.
    ///
    /// # Arguments
    /// * `network` - The road network; validated here.
    /// * `config` - A configuration built by `SimulationConfig::new()`.
    /// * `initial_vehicles` - Vehicles with caller-chosen unique ids placed
    ///   on existing lanes.
    ///
    /// # Returns
    /// The simulation, or the first construction error found (network
    /// integrity, per-lane CFL, population validity, worker pool).
    pub fn new(
        network: RoadNetwork,
        config: SimulationConfig,
        initial_vehicles: Vec<Vehicle>,
    ) -> Result<Self, SimulationError> {
        network.validate()?;

        // Per-lane CFL check for every macro-eligible lane.
        let max_speed = config.max_characteristic_speed();
        for lane in network.lanes() {
            if lane.is_critical() {
                continue;
            }
            let cell_length = lane.length() / config.cells_per_lane as f64;
            if config.dt > cell_length / max_speed {
                return Err(ConfigError::CflViolation {
                    lane_id: lane.id(),
                    dt: config.dt,
                    cell_length,
                    max_speed,
                }
                .into());
            }
        }

        let mut runtimes: Vec<LaneRuntime> = network
            .lanes()
            .map(|lane| LaneRuntime::new(lane, config.cells_per_lane, config.interaction_range))
            .collect();

        // Place the initial population.
        let mut vehicles = VehiclesStorage::new();
        let mut members: Vec<Vec<(VehicleID, f64)>> = vec![Vec::new(); network.len()];
        let mut next_vehicle_id: VehicleID = 1;
        for vehicle in initial_vehicles {
            let Some(idx) = network.lane_index(vehicle.lane) else {
                return Err(SimulationError::UnknownLane(vehicle.lane));
            };
            if vehicles.contains(vehicle.id) {
                return Err(SimulationError::DuplicateVehicle(vehicle.id));
            }
            next_vehicle_id = next_vehicle_id.max(vehicle.id + 1);
            members[idx].push((vehicle.id, vehicle.s));
            vehicles.insert_vehicle(vehicle);
        }
        for (idx, entries) in members.into_iter().enumerate() {
            if entries.is_empty() {
                continue;
            }
            let lane = network
                .lane_at(idx)
                .ok_or(SimulationError::UnknownLane(idx as LaneID))?;
            runtimes[idx].state = LaneState::Micro(MicroState::from_vehicles(
                lane.length(),
                config.interaction_range,
                entries,
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|err| SimulationError::WorkerPool(err.to_string()))?;

        let diagram = config.diagram();
        let controller = config.controller();
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Simulation {
            id: Uuid::new_v4(),
            diagram,
            controller,
            network,
            vehicles,
            runtimes,
            tick: 0,
            next_vehicle_id,
            rng,
            boundary_carries: IndexMap::new(),
            influences: Vec::new(),
            flow_sources: Vec::new(),
            totals: Totals::default(),
            tap: SnapshotTap::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            pool,
            config,
        })
    }

    /// The unique simulation identifier.
    pub fn get_id(&self) -> Uuid {
        self.id
    }

    /// The current committed tick.
    pub fn get_tick(&self) -> u64 {
        self.tick
    }

    /// The configuration the simulation runs with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Advances the simulation by one tick.
    ///
    /// A cooperative stop observed at a phase boundary aborts the tick
    /// before commit, leaving state at the previous tick; a worker failure
    /// or translator conservation violation does the same and propagates.
    ///
    /// # Returns
    /// The snapshot committed by this tick.
    pub fn step(&mut self) -> Result<Arc<Snapshot>, SimulationError> {
        if self.is_stopped() {
            log_main!(EVENT_STOP, "step refused, simulation stopped", tick = self.tick);
            return Err(SimulationError::Stopped);
        }
        let started = Instant::now();
        let tick = self.tick;
        log_main!(EVENT_STEP, "tick started", tick = tick, vehicles_num = self.vehicles.len());

        // Phase 1: mode controller pass (sequential, read-only).
        let pending = self.controller_pass(tick);
        if self.is_stopped() {
            log_main!(EVENT_STEP_ABORTED, "stop observed before translation", tick = tick);
            return Err(SimulationError::Stopped);
        }

        // Phase 2: translation pass. Plans are computed against pre-tick
        // state (parallelizable, fallible), then applied sequentially.
        let plans = self.build_translation_plans(&pending)?;
        if self.is_stopped() {
            log_main!(EVENT_STEP_ABORTED, "stop observed before steppers", tick = tick);
            return Err(SimulationError::Stopped);
        }
        let mut counters = TickCounters::default();
        counters.transitioning_lanes = plans.len();
        self.apply_translation_plans(plans, tick, &mut counters);

        // Phase 3: stepper pass, parallel across lanes, scratch only.
        let outputs = self.stepper_pass()?;

        // Phase 4: barrier (the collect above), then the last abort point.
        if self.is_stopped() {
            log_main!(EVENT_STEP_ABORTED, "stop observed before resolution", tick = tick);
            return Err(SimulationError::Stopped);
        }

        // Phase 5: sequential resolution pass.
        let outcome = resolution::resolve_tick(
            ResolveContext {
                network: &self.network,
                config: &self.config,
                diagram: &self.diagram,
                vehicles: &mut self.vehicles,
                runtimes: &mut self.runtimes,
                boundary_carries: &mut self.boundary_carries,
                influences: &mut self.influences,
                flow_sources: &mut self.flow_sources,
                rng: &mut self.rng,
                next_vehicle_id: &mut self.next_vehicle_id,
                tick,
            },
            outputs,
        );
        counters.lane_change_commits = outcome.counters.lane_change_commits;
        counters.lane_change_conflicts = outcome.counters.lane_change_conflicts;
        counters.patches = outcome.counters.patches;
        counters.influence_drops = outcome.counters.influence_drops;

        // Phase 6: commit.
        self.tick += 1;
        for idx in 0..self.runtimes.len() {
            let Some(lane) = self.network.lane_at(idx) else {
                continue;
            };
            let density = self.runtimes[idx].load(lane).density;
            self.runtimes[idx].record.push_history(density);
        }
        self.totals.translations += counters.translations;
        self.totals.lane_change_commits += counters.lane_change_commits;
        self.totals.lane_change_conflicts += counters.lane_change_conflicts;
        self.totals.patches += counters.patches;
        self.totals.influence_drops += counters.influence_drops;
        self.totals.exits += outcome.exits;

        // Phase 7: observability tap.
        let snapshot = Arc::new(self.build_snapshot(counters));
        self.tap.publish(Arc::clone(&snapshot));
        self.totals.last_step_micros = started.elapsed().as_micros();
        Ok(snapshot)
    }

    /// Advances the simulation by `n` ticks, halting cleanly when a stop is
    /// requested.
    ///
    /// # Returns
    /// The last committed snapshot.
    pub fn step_n(&mut self, n: u64) -> Result<Arc<Snapshot>, SimulationError> {
        let mut last = self.snapshot();
        for _ in 0..n {
            if self.is_stopped() {
                break;
            }
            last = self.step()?;
        }
        Ok(last)
    }

    /// Sets the forced-mode flag of a lane; the controller honors it on the
    /// next tick.
    pub fn force_mode(&mut self, lane_id: LaneID, forced: ForcedMode) -> Result<(), SimulationError> {
        let idx = self
            .network
            .lane_index(lane_id)
            .ok_or(SimulationError::UnknownLane(lane_id))?;
        self.runtimes[idx].record.set_forced(forced);
        Ok(())
    }

    /// Sets the critical flag of a lane; critical lanes hold the
    /// microscopic representation.
    pub fn mark_critical(&mut self, lane_id: LaneID, critical: bool) -> Result<(), SimulationError> {
        let idx = self
            .network
            .lane_index(lane_id)
            .ok_or(SimulationError::UnknownLane(lane_id))?;
        self.runtimes[idx].record.set_critical(critical);
        self.runtimes[idx].macro_eligible = !critical;
        Ok(())
    }

    /// Queues a vehicle to appear at the next resolution pass. An unknown
    /// lane is reported then dropped at that point, per the influence error
    /// taxonomy.
    ///
    /// # Arguments
    /// * `lane_id` - Target lane.
    /// * `s` - Position along the lane, metres.
    /// * `v` - Initial speed, m/s.
    /// * `length` - Vehicle length, metres.
    /// * `profile` - Driver parameters.
    ///
    /// # Returns
    /// The id the vehicle will carry.
    pub fn add_vehicle(
        &mut self,
        lane_id: LaneID,
        s: f64,
        v: f64,
        length: f64,
        profile: DriverProfile,
    ) -> VehicleID {
        let id = self.next_vehicle_id;
        self.next_vehicle_id += 1;
        let vehicle = Vehicle::new(id)
            .with_lane(lane_id)
            .with_position(s)
            .with_speed(v)
            .with_length(length)
            .with_profile(profile)
            .build();
        self.influences.push(Influence::AddVehicle(vehicle));
        id
    }

    /// Queues a vehicle removal for the next resolution pass. An unknown id
    /// is reported then dropped at that point.
    pub fn remove_vehicle(&mut self, vehicle_id: VehicleID) {
        self.influences.push(Influence::RemoveVehicle(vehicle_id));
    }

    /// Registers a flow source feeding a lane entry.
    pub fn add_flow_source(&mut self, source: FlowSource) -> Result<(), SimulationError> {
        if self.network.lane_index(source.lane).is_none() {
            return Err(SimulationError::UnknownLane(source.lane));
        }
        self.flow_sources.push(source);
        Ok(())
    }

    /// The latest committed snapshot, or a freshly built view of the current
    /// state when no tick has committed yet.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tap
            .latest()
            .unwrap_or_else(|| Arc::new(self.build_snapshot(TickCounters::default())))
    }

    /// Requests a cooperative stop. Observed at the next phase boundary.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// A cloneable handle other threads can use to request a stop.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Cumulative statistics since construction. May carry wall-clock data;
    /// not part of the determinism contract.
    pub fn statistics(&self) -> SimulationStatistics {
        let mut micro_lanes = 0;
        let mut macro_lanes = 0;
        let mut density_sum = 0.0;
        for (idx, runtime) in self.runtimes.iter().enumerate() {
            match runtime.record.mode() {
                LaneMode::Micro | LaneMode::TransitioningToMicro => micro_lanes += 1,
                LaneMode::Macro | LaneMode::TransitioningToMacro => macro_lanes += 1,
            }
            if let Some(lane) = self.network.lane_at(idx) {
                density_sum += runtime.load(lane).density;
            }
        }
        SimulationStatistics {
            total_lanes: self.runtimes.len(),
            micro_lanes,
            macro_lanes,
            transitioning_lanes: 0,
            total_vehicles: self.vehicles.len(),
            avg_density: if self.runtimes.is_empty() {
                0.0
            } else {
                density_sum / self.runtimes.len() as f64
            },
            translations_total: self.totals.translations,
            lane_change_commits_total: self.totals.lane_change_commits,
            lane_change_conflicts_total: self.totals.lane_change_conflicts,
            patches_total: self.totals.patches,
            influence_drops_total: self.totals.influence_drops,
            exits_total: self.totals.exits,
            last_step_micros: self.totals.last_step_micros,
        }
    }

    /// Phase 1: computes pending modes for every lane without mutating
    /// anything.
    fn controller_pass(&self, tick: u64) -> Vec<Option<PendingMode>> {
        let mut pending = Vec::with_capacity(self.runtimes.len());
        for (idx, runtime) in self.runtimes.iter().enumerate() {
            let Some(lane) = self.network.lane_at(idx) else {
                pending.push(None);
                continue;
            };
            let load = runtime.load(lane);
            pending.push(self.controller.decide(
                &runtime.record,
                load,
                runtime.macro_eligible,
                tick,
            ));
        }
        pending
    }

    /// Phase 2a: computes translation plans against pre-tick state. Runs on
    /// the worker pool; nothing is mutated, so an error here aborts the tick
    /// with state untouched.
    fn build_translation_plans(
        &self,
        pending: &[Option<PendingMode>],
    ) -> Result<Vec<(usize, TranslationPlan)>, SimulationError> {
        let transitioning: Vec<(usize, PendingMode)> = pending
            .iter()
            .enumerate()
            .filter_map(|(idx, pending)| pending.map(|mode| (idx, mode)))
            .collect();
        if transitioning.is_empty() {
            return Ok(Vec::new());
        }
        self.pool.install(|| {
            transitioning
                .par_iter()
                .map(|&(idx, mode)| self.plan_translation(idx, mode).map(|plan| (idx, plan)))
                .collect::<Result<Vec<_>, SimulationError>>()
        })
    }

    fn plan_translation(
        &self,
        idx: usize,
        mode: PendingMode,
    ) -> Result<TranslationPlan, SimulationError> {
        let lane = self
            .network
            .lane_at(idx)
            .ok_or(SimulationError::UnknownLane(idx as LaneID))?;
        let runtime = &self.runtimes[idx];
        match (mode, &runtime.state) {
            (PendingMode::ToMacro, LaneState::Micro(state)) => {
                let encoding = encode_macro(
                    lane,
                    state,
                    &self.vehicles,
                    runtime.cells,
                    self.config.jam_density,
                )?;
                Ok(TranslationPlan::ToMacro(encoding))
            }
            (PendingMode::ToMicro, LaneState::Macro(grid)) => {
                let profile = match self.config.profile_policy {
                    TranslationProfilePolicy::DefaultProfile => self.config.default_profile,
                    TranslationProfilePolicy::RetainedSummary => {
                        runtime.summary.mean_profile(self.config.default_profile)
                    }
                };
                let length = match self.config.profile_policy {
                    TranslationProfilePolicy::DefaultProfile => self.config.nominal_vehicle_length,
                    TranslationProfilePolicy::RetainedSummary => {
                        runtime.summary.mean_length(self.config.nominal_vehicle_length)
                    }
                };
                let mut placeholder: VehicleID = 0;
                let mut allocate = || {
                    placeholder += 1;
                    placeholder
                };
                let restored =
                    decode_micro(lane, grid, &self.diagram, profile, length, &mut allocate)?;
                Ok(TranslationPlan::ToMicro(restored))
            }
            // The pending mode no longer matches the representation; the
            // controller re-evaluates next tick.
            _ => Ok(TranslationPlan::Skip),
        }
    }

    /// Phase 2b: applies translation plans sequentially in lane order. The
    /// lane passes through its transitioning state and settles within this
    /// tick.
    fn apply_translation_plans(
        &mut self,
        plans: Vec<(usize, TranslationPlan)>,
        tick: u64,
        counters: &mut TickCounters,
    ) {
        for (idx, plan) in plans {
            let Some(lane) = self.network.lane_at(idx) else {
                continue;
            };
            match plan {
                TranslationPlan::Skip => continue,
                TranslationPlan::ToMacro(encoding) => {
                    let runtime = &mut self.runtimes[idx];
                    runtime.record.set_mode(LaneMode::TransitioningToMacro);
                    for vehicle_id in &encoding.evicted {
                        self.vehicles.remove_vehicle(*vehicle_id);
                    }
                    runtime.summary = encoding.summary;
                    runtime.state = LaneState::Macro(encoding.grid);
                    runtime.record.set_mode(LaneMode::Macro);
                    runtime.record.mark_switched(tick);
                    counters.translations += 1;
                    log_additional!(
                        EVENT_TRANSLATE_TO_MACRO,
                        "lane switched to the macroscopic representation",
                        lane_id = lane.id(),
                        tick = tick
                    );
                }
                TranslationPlan::ToMicro(restored) => {
                    let runtime = &mut self.runtimes[idx];
                    runtime.record.set_mode(LaneMode::TransitioningToMicro);
                    let mut entries = Vec::with_capacity(restored.len());
                    for mut vehicle in restored {
                        // Replace the placeholder id with a real one, in
                        // emission order so ids ascend downstream.
                        vehicle.id = self.next_vehicle_id;
                        self.next_vehicle_id += 1;
                        entries.push((vehicle.id, vehicle.s));
                        self.vehicles.insert_vehicle(vehicle);
                    }
                    runtime.state = LaneState::Micro(MicroState::from_vehicles(
                        lane.length(),
                        self.config.interaction_range,
                        entries,
                    ));
                    runtime.record.set_mode(LaneMode::Micro);
                    runtime.record.mark_switched(tick);
                    counters.translations += 1;
                    log_additional!(
                        EVENT_TRANSLATE_TO_MICRO,
                        "lane switched to the microscopic representation",
                        lane_id = lane.id(),
                        tick = tick
                    );
                }
            }
            log_additional!(
                EVENT_MODE_SWITCH,
                "mode switch settled",
                lane_id = lane.id(),
                tick = tick
            );
        }
    }

    /// Phase 3: per-lane scratch computation, parallel across lanes on the
    /// worker pool. Read-only against live state.
    fn stepper_pass(&self) -> Result<Vec<LaneStepOutput>, SimulationError> {
        let runtimes = &self.runtimes;
        self.pool.install(|| {
            runtimes
                .par_iter()
                .enumerate()
                .map(|(idx, runtime)| self.step_one_lane(idx, runtime))
                .collect::<Result<Vec<_>, SimulationError>>()
        })
    }

    fn step_one_lane(
        &self,
        idx: usize,
        runtime: &LaneRuntime,
    ) -> Result<LaneStepOutput, SimulationError> {
        let lane = self
            .network
            .lane_at(idx)
            .ok_or(SimulationError::UnknownLane(idx as LaneID))?;
        match &runtime.state {
            LaneState::Macro(grid) => {
                Ok(LaneStepOutput::Macro(step_interior(grid, &self.diagram, self.config.dt)))
            }
            LaneState::Micro(state) => {
                // Worker-failure check: the lane must not reference vehicles
                // missing from the arena.
                for &vehicle_id in state.order() {
                    if !self.vehicles.contains(vehicle_id) {
                        return Err(SimulationError::CorruptLaneState {
                            lane_id: lane.id(),
                            vehicle_id,
                        });
                    }
                }
                let left = self.adjacent_lane(lane.left_neighbor());
                let right = self.adjacent_lane(lane.right_neighbor());
                let perceptions = perceive_lane(
                    state,
                    &self.vehicles,
                    left,
                    right,
                    self.config.interaction_range,
                );
                Ok(LaneStepOutput::Micro(step_lane(
                    lane,
                    &perceptions,
                    &self.vehicles,
                    self.config.car_following,
                    self.config.lane_change,
                    self.config.dt,
                )))
            }
        }
    }

    /// An adjacent lane is a lane-change target only while it is
    /// microscopic this tick.
    fn adjacent_lane(&self, neighbor: Option<LaneID>) -> Option<AdjacentLane<'_>> {
        let neighbor_id = neighbor?;
        let idx = self.network.lane_index(neighbor_id)?;
        let lane = self.network.lane_at(idx)?;
        let state = self.runtimes[idx].state.as_micro()?;
        Some(AdjacentLane { lane, index: state.index() })
    }

    /// Builds the deterministic snapshot of current committed state.
    fn build_snapshot(&self, mut counters: TickCounters) -> Snapshot {
        let mut vehicles: Vec<VehicleRecord> = self
            .vehicles
            .iter()
            .map(|vehicle| {
                let heading = self
                    .network
                    .get_lane(vehicle.lane)
                    .map_or(0.0, |lane| lane.heading_at(vehicle.s));
                VehicleRecord {
                    id: vehicle.id,
                    lane_id: vehicle.lane,
                    s: vehicle.s,
                    v: vehicle.v,
                    a: vehicle.a,
                    length: vehicle.length,
                    heading,
                }
            })
            .collect();
        vehicles.sort_by_key(|record| record.id);

        let mut lanes = Vec::with_capacity(self.runtimes.len());
        for (idx, runtime) in self.runtimes.iter().enumerate() {
            let Some(lane) = self.network.lane_at(idx) else {
                continue;
            };
            let load = runtime.load(lane);
            let mean_speed = match &runtime.state {
                LaneState::Macro(grid) => grid.mean_speed(&self.diagram),
                LaneState::Micro(state) => {
                    if state.is_empty() {
                        lane.speed_limit()
                    } else {
                        let sum: f64 = state
                            .order()
                            .iter()
                            .filter_map(|&id| self.vehicles.get(id))
                            .map(|vehicle| vehicle.v)
                            .sum();
                        sum / state.len() as f64
                    }
                }
            };
            match runtime.record.mode() {
                LaneMode::Micro | LaneMode::TransitioningToMicro => counters.micro_lanes += 1,
                LaneMode::Macro | LaneMode::TransitioningToMacro => counters.macro_lanes += 1,
            }
            lanes.push(LaneRecord {
                lane_id: lane.id(),
                mode: runtime.record.mode(),
                vehicle_count: load.count,
                mean_density: load.density,
                mean_speed,
            });
        }

        Snapshot {
            tick: self.tick,
            sim_time: self.tick as f64 * self.config.dt,
            vehicles,
            lanes,
            counters,
        }
    }
}
