// Single-writer world engine: one task owns every store mutation

mod scheduler;

pub use scheduler::{every_n_ticks, expire_agents, TickReport, TickScheduler};

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::commands::{
    self, AgentPosition, MoveMeRequest, MoveResult, SpawnAgentRequest, SpawnHazardRequest,
    SuppressFireRequest, UpdateStatusRequest, VisionReport, WhatDoISeeRequest,
};
use crate::config::EmberConfig;
use crate::event::{EventBus, WorldEvent};
use crate::hazard::SuppressOutcome;
use crate::movement::{self, PlannedMove};
use crate::routing::RouteService;
use crate::world::{self, AgentState, HazardState, Location, WorldError, WorldStore};


type Reply<T> = oneshot::Sender<Result<T, WorldError>>;

/// Mutation requests queued for the engine task
pub enum WorldCommand {
    SpawnAgent {
        request: SpawnAgentRequest,
        reply: Reply<AgentState>,
    },
    DespawnAgent {
        agent_id: String,
        reply: Reply<AgentState>,
    },
    UpdateStatus {
        request: UpdateStatusRequest,
        reply: Reply<AgentState>,
    },
    SpawnHazard {
        request: SpawnHazardRequest,
        reply: Reply<HazardState>,
    },
    SuppressFire {
        request: SuppressFireRequest,
        reply: Reply<SuppressOutcome>,
    },
    BeginMovement {
        plan: PlannedMove,
        reply: Reply<PlannedMove>,
    },
}

/// Owns the world store and applies ticks and commands in arrival order
pub struct WorldEngine {
    store: Arc<WorldStore>,
    bus: EventBus,
    config: Arc<EmberConfig>,
    scheduler: TickScheduler,
    commands: mpsc::Receiver<WorldCommand>,
}

impl WorldEngine {
    /// Create the engine and a cloneable handle for callers
    pub fn new(config: Arc<EmberConfig>, routes: Arc<RouteService>) -> (Self, WorldHandle) {
        let store = Arc::new(WorldStore::new(config.locations.clone()));
        let bus = EventBus::new(config.simulation.event_buffer);
        let (tx, rx) = mpsc::channel(config.simulation.command_buffer.max(1));
        let scheduler = TickScheduler::new(&config.simulation);

        let handle = WorldHandle {
            store: Arc::clone(&store),
            bus: bus.clone(),
            routes,
            config: Arc::clone(&config),
            commands: tx,
        };

        let engine = Self {
            store,
            bus,
            config,
            scheduler,
            commands: rx,
        };

        (engine, handle)
    }

    pub fn store(&self) -> &Arc<WorldStore> {
        &self.store
    }

    /// Run one tick at `now`
    pub fn tick(&mut self, now: i64) -> TickReport {
        self.scheduler
            .run_tick(&self.store, &self.bus, &self.config.hazard, now)
    }

    /// Apply a single command at `now` and send its reply
    pub fn apply(&self, command: WorldCommand, now: i64) {
        let store = &self.store;
        let bus = &self.bus;

        // A dropped reply receiver means the caller gave up; the mutation stands
        match command {
            WorldCommand::SpawnAgent { request, reply } => {
                let _ = reply.send(commands::spawn_agent(store, bus, request, now));
            }
            WorldCommand::DespawnAgent { agent_id, reply } => {
                let _ = reply.send(commands::despawn_agent(store, bus, &agent_id, now));
            }
            WorldCommand::UpdateStatus { request, reply } => {
                let _ = reply.send(commands::update_agent_status(store, bus, request, now));
            }
            WorldCommand::SpawnHazard { request, reply } => {
                let _ = reply.send(commands::spawn_hazard(
                    store,
                    bus,
                    &self.config.hazard,
                    request,
                    now,
                ));
            }
            WorldCommand::SuppressFire { request, reply } => {
                let _ = reply.send(commands::suppress_fire(
                    store,
                    bus,
                    &self.config.hazard,
                    request,
                    now,
                ));
            }
            WorldCommand::BeginMovement { mut plan, reply } => {
                // Timing starts when the movement is registered, not when routing began
                plan.movement.start_time = now;
                let result = movement::begin_movement(store, &plan, now).map(|()| plan);
                let _ = reply.send(result);
            }
        }
    }

    /// Drive the world until every handle is dropped.
    ///
    /// Ticks that overrun their period are skipped rather than queued.
    pub async fn run(mut self) {
        let mut ticker = interval(self.scheduler.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            period_ms = self.scheduler.period().as_millis() as u64,
            "World engine started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(world::now_ms());
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command, world::now_ms()),
                    None => break,
                },
            }
        }

        info!(
            ticks = self.scheduler.tick_count(),
            "World engine stopped"
        );
    }
}

/// Cloneable façade used by every adapter.
///
/// Reads go straight to the store; mutations are queued to the engine.
#[derive(Clone)]
pub struct WorldHandle {
    store: Arc<WorldStore>,
    bus: EventBus,
    routes: Arc<RouteService>,
    config: Arc<EmberConfig>,
    commands: mpsc::Sender<WorldCommand>,
}

fn engine_stopped() -> WorldError {
    WorldError::InternalInconsistency("world engine is not running".to_string())
}

impl WorldHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> WorldCommand,
    ) -> Result<T, WorldError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| engine_stopped())?;
        rx.await.map_err(|_| engine_stopped())?
    }

    pub fn store(&self) -> &Arc<WorldStore> {
        &self.store
    }

    pub fn config(&self) -> &EmberConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.bus.subscribe()
    }

    pub fn agents(&self) -> Vec<AgentState> {
        self.store.agents()
    }

    pub fn hazards(&self) -> Vec<HazardState> {
        self.store.hazards()
    }

    pub fn locations(&self) -> &[Location] {
        self.store.locations()
    }

    pub fn what_do_i_see(&self, request: &WhatDoISeeRequest) -> Result<VisionReport, WorldError> {
        commands::what_do_i_see(&self.store, &self.config.vision, request)
    }

    pub fn get_agent_position(&self, agent_id: &str) -> Result<AgentPosition, WorldError> {
        commands::get_agent_position(&self.store, agent_id)
    }

    pub async fn spawn_agent(&self, request: SpawnAgentRequest) -> Result<AgentState, WorldError> {
        self.request(|reply| WorldCommand::SpawnAgent { request, reply })
            .await
    }

    pub async fn despawn_agent(&self, agent_id: String) -> Result<AgentState, WorldError> {
        self.request(|reply| WorldCommand::DespawnAgent { agent_id, reply })
            .await
    }

    pub async fn update_agent_status(
        &self,
        request: UpdateStatusRequest,
    ) -> Result<AgentState, WorldError> {
        self.request(|reply| WorldCommand::UpdateStatus { request, reply })
            .await
    }

    pub async fn spawn_hazard(
        &self,
        request: SpawnHazardRequest,
    ) -> Result<HazardState, WorldError> {
        self.request(|reply| WorldCommand::SpawnHazard { request, reply })
            .await
    }

    pub async fn suppress_fire(
        &self,
        request: SuppressFireRequest,
    ) -> Result<SuppressOutcome, WorldError> {
        self.request(|reply| WorldCommand::SuppressFire { request, reply })
            .await
    }

    /// Route the agent to a destination.
    ///
    /// The route lookup runs here, off the tick path; only the finished
    /// movement is handed to the engine, which re-checks the agent.
    pub async fn move_me(&self, request: MoveMeRequest) -> Result<MoveResult, WorldError> {
        commands::validate_position("destination", &request.destination)?;
        let agent = self
            .store
            .get_agent(&request.agent_id)
            .ok_or_else(|| WorldError::AgentNotFound(request.agent_id.clone()))?;

        let route = self
            .routes
            .get_route(agent.position, request.destination, request.profile)
            .await;

        let plan = movement::plan_movement(
            &request.agent_id,
            &route,
            self.routes.profile_speed(request.profile),
            request.urgency,
            request.speed,
            world::now_ms(),
        )?;

        debug!(
            agent_id = %request.agent_id,
            route_success = plan.route_success,
            duration_s = plan.duration_secs(),
            "Movement planned"
        );

        let plan = self
            .request(|reply| WorldCommand::BeginMovement { plan, reply })
            .await?;
        Ok(MoveResult::from_plan(&plan))
    }
}
