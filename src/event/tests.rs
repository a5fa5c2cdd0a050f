use super::*;

fn fire_state() -> HazardState {
    HazardState {
        hazard_id: "fire1".to_string(),
        hazard_type: HazardType::Fire,
        position: Position::new(32.78, -96.79),
        intensity: 0.4,
        radius: 30.0,
        fire_intensity: Some(FireIntensity::Moderate),
        spread_rate: 0.5,
        suppression_effort: 0.6,
        created_at: 1_000,
        last_updated: 2_000,
    }
}

#[test]
fn test_subjects_match_event_kinds() {
    let removed = WorldEvent::FireRemoved(HazardRemoved {
        hazard_id: "fire1".to_string(),
        timestamp: 5,
    });
    assert_eq!(removed.subject(), "world.hazard.fire.removed");
    assert_eq!(removed.timestamp(), 5);

    let tick = WorldEvent::Tick(TickHeartbeat {
        tick: 7,
        agents: 0,
        hazards: 0,
        movements: 0,
        timestamp: 9,
    });
    assert_eq!(tick.subject(), "world.tick");
}

#[test]
fn test_event_serializes_as_payload() {
    let event = WorldEvent::PositionUpdated(PositionUpdate {
        agent_id: "civ1".to_string(),
        position: Position::new(1.0, 2.0),
        moving: true,
        bearing: Some(90.0),
        velocity: None,
        timestamp: 42,
    });

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["agentId"], "civ1");
    assert_eq!(value["position"]["lat"], 1.0);
    assert_eq!(value["moving"], true);
    assert_eq!(value["bearing"], 90.0);
    assert!(value.get("velocity").is_none());
}

#[test]
fn test_extinguished_update_zeroes_fire() {
    let update = FireUpdated::extinguished(&fire_state(), 3_000);
    assert_eq!(update.intensity, 0.0);
    assert_eq!(update.radius, 0.0);
    assert!(update.extinguished);
    assert_eq!(update.suppression_effort, 0.6);
    assert_eq!(update.timestamp, 3_000);
}

#[test]
fn test_envelope_has_uuid_and_subject() {
    let event = WorldEvent::FireSpawned(HazardSpawned::from_state(&fire_state()));
    let envelope = EventEnvelope::from_event(&event).unwrap();

    assert_eq!(envelope.event_id.len(), 36);
    assert_eq!(envelope.subject, "world.hazard.fire.spawned");
    assert_eq!(envelope.timestamp, 1_000);
    assert_eq!(envelope.payload["hazardId"], "fire1");
    assert_eq!(envelope.payload["type"], "fire");
}

#[test]
fn test_bus_emit_without_subscribers_is_silent() {
    let bus = EventBus::new(8);
    bus.emit(WorldEvent::AgentDespawned(AgentRemoved {
        agent_id: "civ1".to_string(),
        timestamp: 1,
    }));
    assert_eq!(bus.receiver_count(), 0);
}

#[test]
fn test_bus_delivers_to_subscribers() {
    let bus = EventBus::new(8);
    let mut rx = bus.subscribe();

    bus.emit(WorldEvent::AgentDespawned(AgentRemoved {
        agent_id: "civ1".to_string(),
        timestamp: 1,
    }));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.subject(), "world.agent.despawned");
}
