// End-to-end world scenarios driven with explicit millisecond clocks

use ember::commands::{
    self, SpawnAgentRequest, SpawnHazardRequest, SuppressFireRequest, WhatDoISeeRequest,
};
use ember::config::{EmberConfig, HazardConfig, SimulationConfig, VisionConfig};
use ember::engine::TickScheduler;
use ember::event::{subjects, EventBus, WorldEvent};
use ember::geo::{self, Position};
use ember::movement::{self, Urgency};
use ember::routing::{RouteService, TravelProfile};
use ember::world::{AgentStatus, AgentType, HazardType, WorldStore};
use tokio::sync::broadcast;

const CIV_START: Position = Position { lat: 32.7825, lon: -96.7849 };
const CIV_DEST: Position = Position { lat: 32.7767, lon: -96.7970 };

fn agent(id: &str, agent_type: AgentType, position: Position, lifetime: Option<i64>) -> SpawnAgentRequest {
    SpawnAgentRequest {
        agent_id: id.to_string(),
        agent_type,
        position,
        status: AgentStatus::Available,
        lifetime,
    }
}

fn drain(rx: &mut broadcast::Receiver<WorldEvent>) -> Vec<WorldEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_emergency_move_halves_duration_and_arrives_in_view() {
    let config = EmberConfig::default();
    let store = WorldStore::new(config.locations.clone());
    let bus = EventBus::new(4096);
    let mut scheduler = TickScheduler::new(&config.simulation);

    commands::spawn_agent(&store, &bus, agent("civ1", AgentType::Civilian, CIV_START, None), 0)
        .unwrap();
    let watcher = Position::new(CIV_DEST.lat, CIV_DEST.lon + 0.0003);
    commands::spawn_agent(&store, &bus, agent("watcher", AgentType::Police, watcher, None), 0)
        .unwrap();

    let routes = RouteService::new(None, &config.routing);
    let route = routes.fallback(
        CIV_START,
        CIV_DEST,
        TravelProfile::Driving,
        "routing provider disabled".to_string(),
    );
    let speed = routes.profile_speed(TravelProfile::Driving);

    let baseline = movement::plan_movement("civ1", &route, speed, Urgency::Normal, None, 0).unwrap();
    let plan = movement::plan_movement("civ1", &route, speed, Urgency::Emergency, None, 0).unwrap();
    assert!((plan.duration_secs() - baseline.duration_secs() / 2.0).abs() < 1e-6);

    movement::begin_movement(&store, &plan, 0).unwrap();
    let arrival = plan.estimated_arrival();

    let mut rx = bus.subscribe();
    let mut now = 0;
    while now <= arrival + 100 {
        now += 100;
        scheduler.run_tick(&store, &bus, &config.hazard, now);
    }

    let events = drain(&mut rx);
    let completions = events
        .iter()
        .filter(|e| e.subject() == subjects::MOVEMENT_COMPLETED)
        .count();
    assert_eq!(completions, 1);

    let civ = store.get_agent("civ1").unwrap();
    assert!(!civ.moving);
    assert!(geo::distance(civ.position, CIV_DEST) < 0.01);

    let report = commands::what_do_i_see(
        &store,
        &VisionConfig::default(),
        &WhatDoISeeRequest {
            agent_id: "watcher".to_string(),
            vision_range: None,
        },
    )
    .unwrap();
    assert!(report.agents.iter().any(|a| a.agent_id == "civ1"));
}

#[test]
fn test_suppression_extinguishes_fire() {
    let store = WorldStore::new(Vec::new());
    let bus = EventBus::new(256);
    let cfg = HazardConfig::default();

    let fire_pos = Position::new(32.7800, -96.7900);
    let crew_pos = Position::new(32.7803, -96.7900); // ~33 m north
    commands::spawn_agent(&store, &bus, agent("agentX", AgentType::Firefighter, crew_pos, None), 0)
        .unwrap();
    commands::spawn_hazard(
        &store,
        &bus,
        &cfg,
        SpawnHazardRequest {
            hazard_id: "fire1".to_string(),
            hazard_type: HazardType::Fire,
            position: fire_pos,
            intensity: 0.5,
            radius: 20.0,
            spread_rate: 0.1,
            fire_intensity: None,
        },
        0,
    )
    .unwrap();

    let mut rx = bus.subscribe();
    let outcome = commands::suppress_fire(
        &store,
        &bus,
        &cfg,
        SuppressFireRequest {
            agent_id: "agentX".to_string(),
            hazard_id: "fire1".to_string(),
            rate: 0.6,
        },
        500,
    )
    .unwrap();

    assert!(outcome.fire_extinguished);
    assert_eq!(outcome.remaining_intensity, 0.0);
    assert!(store.get_hazard("fire1").is_none());

    let seen: Vec<&str> = drain(&mut rx).iter().map(|e| e.subject()).collect();
    assert_eq!(seen, vec![subjects::FIRE_UPDATED, subjects::FIRE_REMOVED]);

    let report = commands::what_do_i_see(
        &store,
        &VisionConfig::default(),
        &WhatDoISeeRequest {
            agent_id: "agentX".to_string(),
            vision_range: None,
        },
    )
    .unwrap();
    assert!(report.hazards.is_empty());
}

#[test]
fn test_lifetime_expiry_is_reported_once() {
    let store = WorldStore::new(Vec::new());
    let bus = EventBus::new(4096);
    let hazard_cfg = HazardConfig::default();
    let mut scheduler = TickScheduler::new(&SimulationConfig::default());

    commands::spawn_agent(
        &store,
        &bus,
        agent("visitor", AgentType::HumanCivilian, CIV_START, Some(1000)),
        0,
    )
    .unwrap();

    let mut rx = bus.subscribe();
    for i in 1..=20 {
        scheduler.run_tick(&store, &bus, &hazard_cfg, i * 100);
    }

    assert!(commands::get_agent_position(&store, "visitor").is_err());
    let expiries = drain(&mut rx)
        .into_iter()
        .filter(|e| e.subject() == subjects::AGENT_EXPIRED)
        .count();
    assert_eq!(expiries, 1);
}

#[test]
fn test_unsuppressed_fire_grows_over_ticks() {
    let store = WorldStore::new(Vec::new());
    let bus = EventBus::new(4096);
    let hazard_cfg = HazardConfig::default();
    let mut scheduler = TickScheduler::new(&SimulationConfig::default());

    commands::spawn_hazard(
        &store,
        &bus,
        &hazard_cfg,
        SpawnHazardRequest {
            hazard_id: "fire2".to_string(),
            hazard_type: HazardType::Fire,
            position: CIV_START,
            intensity: 0.3,
            radius: 10.0,
            spread_rate: 0.5,
            fire_intensity: None,
        },
        0,
    )
    .unwrap();

    for i in 1..=100 {
        scheduler.run_tick(&store, &bus, &hazard_cfg, i * 100);
    }

    // 10 s elapsed: +0.1 intensity, +5 m radius
    let fire = store.get_hazard("fire2").unwrap();
    assert!((fire.intensity - 0.4).abs() < 1e-6);
    assert!((fire.radius - 15.0).abs() < 1e-6);
}
