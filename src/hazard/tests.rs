use super::*;
use crate::geo::Position;
use crate::world::{AgentState, AgentStatus, AgentType, HazardType};

const FIRE_POS: Position = Position { lat: 32.7800, lon: -96.7900 };

fn fire(id: &str, intensity: f64, radius: f64, spread_rate: f64) -> HazardState {
    HazardState {
        hazard_id: id.to_string(),
        hazard_type: HazardType::Fire,
        position: FIRE_POS,
        intensity,
        radius,
        fire_intensity: None,
        spread_rate,
        suppression_effort: 0.0,
        created_at: 0,
        last_updated: 0,
    }
}

fn firefighter(id: &str, position: Position) -> AgentState {
    AgentState::new(
        id.to_string(),
        AgentType::Firefighter,
        position,
        AgentStatus::OnScene,
        None,
        0,
    )
}

/// ~22 m north of the fire
fn near() -> Position {
    Position::new(FIRE_POS.lat + 0.0002, FIRE_POS.lon)
}

fn setup() -> (WorldStore, EventBus, HazardConfig) {
    let store = WorldStore::default();
    store.insert_agent(firefighter("ff1", near())).unwrap();
    (store, EventBus::new(64), HazardConfig::default())
}

#[test]
fn test_unsuppressed_fire_grows() {
    let mut hazard = fire("fire1", 0.6, 25.0, 0.5);
    step_fire(&mut hazard, 10.0, &HazardConfig::default()).unwrap();

    assert!((hazard.intensity - 0.7).abs() < 1e-9);
    assert!((hazard.radius - 30.0).abs() < 1e-9);
    assert_eq!(hazard.fire_intensity, Some(FireIntensity::High));
}

#[test]
fn test_growth_respects_caps() {
    let mut hazard = fire("fire1", 0.95, 98.0, 0.5);
    step_fire(&mut hazard, 10.0, &HazardConfig::default()).unwrap();

    assert_eq!(hazard.intensity, 1.0);
    assert_eq!(hazard.radius, 100.0);
}

#[test]
fn test_suppressed_fire_decays_without_spreading() {
    let mut hazard = fire("fire1", 0.5, 25.0, 0.5);
    hazard.suppression_effort = 0.05;

    step_fire(&mut hazard, 10.0, &HazardConfig::default()).unwrap();

    // Effort below the floor decays at the 0.1 factor
    assert!((hazard.intensity - 0.48).abs() < 1e-9);
    assert_eq!(hazard.radius, 25.0);
}

#[test]
fn test_decay_scales_with_effort() {
    let mut hazard = fire("fire1", 0.5, 25.0, 0.5);
    hazard.suppression_effort = 1.0;

    step_fire(&mut hazard, 10.0, &HazardConfig::default()).unwrap();
    assert!((hazard.intensity - 0.3).abs() < 1e-9);
}

#[test]
fn test_non_fire_hazards_do_not_evolve() {
    let mut hazard = fire("smoke1", 0.5, 25.0, 0.5);
    hazard.hazard_type = HazardType::Smoke;

    step_fire(&mut hazard, 10.0, &HazardConfig::default()).unwrap();
    assert_eq!(hazard.intensity, 0.5);
    assert_eq!(hazard.radius, 25.0);
}

#[test]
fn test_non_finite_state_is_reported() {
    let cfg = HazardConfig {
        radius_cap_m: f64::INFINITY,
        ..HazardConfig::default()
    };
    let mut hazard = fire("fire1", 0.5, 25.0, f64::INFINITY);
    let err = step_fire(&mut hazard, 1.0, &cfg).unwrap_err();
    assert_eq!(err.code(), "internal_inconsistency");
}

#[test]
fn test_step_all_updates_and_emits() {
    let (store, bus, cfg) = setup();
    let mut rx = bus.subscribe();
    store.insert_hazard(fire("fire1", 0.6, 25.0, 0.5)).unwrap();

    let pass = step_all(&store, &bus, &cfg, 10_000);

    assert_eq!(pass.updated, 1);
    let hazard = store.get_hazard("fire1").unwrap();
    assert!(hazard.intensity > 0.6);
    assert!((hazard.radius - 30.0).abs() < 1e-9);
    assert_eq!(hazard.last_updated, 10_000);
    assert_eq!(rx.try_recv().unwrap().subject(), "world.hazard.fire.updated");
}

#[test]
fn test_step_all_skips_bad_record_and_continues() {
    let (store, bus, _) = setup();
    let cfg = HazardConfig {
        radius_cap_m: f64::INFINITY,
        ..HazardConfig::default()
    };
    store.insert_hazard(fire("bad", 0.5, 25.0, f64::INFINITY)).unwrap();
    store.insert_hazard(fire("good", 0.5, 25.0, 0.5)).unwrap();

    let pass = step_all(&store, &bus, &cfg, 1_000);

    assert_eq!(pass.skipped, 1);
    assert_eq!(pass.updated, 1);
    assert_eq!(store.get_hazard("bad").unwrap().last_updated, 0);
}

#[test]
fn test_step_all_removes_burned_out_fire() {
    let (store, bus, cfg) = setup();
    let mut rx = bus.subscribe();
    let mut hazard = fire("fire1", 0.01, 25.0, 0.5);
    hazard.suppression_effort = 1.0;
    store.insert_hazard(hazard).unwrap();

    let pass = step_all(&store, &bus, &cfg, 10_000);

    assert_eq!(pass.removed, 1);
    assert!(store.get_hazard("fire1").is_none());

    match rx.try_recv().unwrap() {
        WorldEvent::FireUpdated(update) => {
            assert_eq!(update.intensity, 0.0);
            assert_eq!(update.radius, 0.0);
            assert!(update.extinguished);
        }
        other => panic!("unexpected event {}", other.subject()),
    }
    assert_eq!(rx.try_recv().unwrap().subject(), "world.hazard.fire.removed");
}

#[test]
fn test_suppress_validation_order() {
    let (store, bus, cfg) = setup();

    let err = suppress(&store, &bus, &cfg, "ff1", "missing", 0.3, 0).unwrap_err();
    assert_eq!(err, WorldError::HazardNotFound("missing".to_string()));

    let mut smoke = fire("smoke1", 0.5, 20.0, 0.0);
    smoke.hazard_type = HazardType::Smoke;
    store.insert_hazard(smoke).unwrap();
    let err = suppress(&store, &bus, &cfg, "ff1", "smoke1", 0.3, 0).unwrap_err();
    assert_eq!(err.code(), "hazard_not_found");

    store.insert_hazard(fire("fire1", 0.5, 20.0, 0.5)).unwrap();
    let err = suppress(&store, &bus, &cfg, "ghost", "fire1", 0.3, 0).unwrap_err();
    assert_eq!(err, WorldError::AgentNotFound("ghost".to_string()));

    let err = suppress(&store, &bus, &cfg, "ff1", "fire1", -1.0, 0).unwrap_err();
    assert_eq!(err.code(), "validation_error");
}

#[test]
fn test_suppress_out_of_range() {
    let (store, bus, cfg) = setup();
    store.insert_hazard(fire("fire1", 0.5, 20.0, 0.5)).unwrap();
    // ~111 m away
    store
        .insert_agent(firefighter("ff2", Position::new(FIRE_POS.lat + 0.001, FIRE_POS.lon)))
        .unwrap();

    match suppress(&store, &bus, &cfg, "ff2", "fire1", 0.3, 0).unwrap_err() {
        WorldError::OutOfRange { distance, max } => {
            assert!(distance > 100.0);
            assert_eq!(max, 45.0);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(store.get_hazard("fire1").unwrap().intensity, 0.5);
}

#[test]
fn test_repeated_suppression_extinguishes_for_good() {
    let (store, bus, cfg) = setup();
    store.insert_hazard(fire("fire1", 1.0, 20.0, 0.5)).unwrap();

    let mut last = 1.0;
    let mut extinguished = false;
    for i in 0..10 {
        let outcome = suppress(&store, &bus, &cfg, "ff1", "fire1", 0.3, i * 100).unwrap();
        assert!(outcome.remaining_intensity < last);
        last = outcome.remaining_intensity;
        if outcome.fire_extinguished {
            extinguished = true;
            break;
        }
    }

    assert!(extinguished);
    assert_eq!(last, 0.0);
    assert!(store.get_hazard("fire1").is_none());

    // Late traffic for the same id never brings it back
    assert!(!store.update_hazard("fire1", |h| h.intensity = 1.0));
    step_all(&store, &bus, &cfg, 60_000);
    assert!(store.get_hazard("fire1").is_none());
    assert_eq!(
        suppress(&store, &bus, &cfg, "ff1", "fire1", 0.3, 70_000).unwrap_err(),
        WorldError::HazardNotFound("fire1".to_string())
    );
}

#[test]
fn test_partial_suppression_reports_remaining() {
    let (store, bus, cfg) = setup();
    let mut rx = bus.subscribe();
    store.insert_hazard(fire("fire1", 0.8, 20.0, 0.5)).unwrap();

    let outcome = suppress(&store, &bus, &cfg, "ff1", "fire1", 0.3, 500).unwrap();

    assert!(!outcome.fire_extinguished);
    assert!((outcome.remaining_intensity - 0.5).abs() < 1e-9);
    assert!((outcome.suppression_effort - 0.3).abs() < 1e-9);
    assert!(outcome.distance < 45.0);

    let hazard = store.get_hazard("fire1").unwrap();
    assert!((hazard.intensity - 0.5).abs() < 1e-9);
    assert_eq!(hazard.last_updated, 500);
    assert_eq!(rx.try_recv().unwrap().subject(), "world.hazard.fire.updated");
}

#[test]
fn test_suppression_effort_is_capped() {
    let (store, bus, cfg) = setup();
    let mut hazard = fire("fire1", 1.0, 20.0, 0.5);
    hazard.suppression_effort = 0.9;
    store.insert_hazard(hazard).unwrap();

    let outcome = suppress(&store, &bus, &cfg, "ff1", "fire1", 0.2, 0).unwrap();
    assert_eq!(outcome.suppression_effort, 1.0);
}

#[test]
fn test_suppression_below_threshold_extinguishes() {
    let (store, bus, cfg) = setup();
    let mut rx = bus.subscribe();
    store.insert_hazard(fire("fire1", 0.5, 20.0, 0.5)).unwrap();

    let outcome = suppress(&store, &bus, &cfg, "ff1", "fire1", 0.6, 0).unwrap();

    assert!(outcome.fire_extinguished);
    assert_eq!(outcome.remaining_intensity, 0.0);
    assert!(store.is_retired_hazard("fire1"));

    match rx.try_recv().unwrap() {
        WorldEvent::FireUpdated(update) => assert!(update.extinguished),
        other => panic!("unexpected event {}", other.subject()),
    }
    assert_eq!(rx.try_recv().unwrap().subject(), "world.hazard.fire.removed");
}
