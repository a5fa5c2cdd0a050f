use super::*;

/// Build a position from 1e-5 degree units so decoded values compare exactly
fn p(lat_e5: i64, lon_e5: i64) -> Position {
    Position::new(lat_e5 as f64 / 1e5, lon_e5 as f64 / 1e5)
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) + 63) as u8 as char);
        v >>= 5;
    }
    out.push((v + 63) as u8 as char);
}

fn encode(points: &[Position]) -> String {
    let mut out = String::new();
    let (mut prev_lat, mut prev_lon) = (0i64, 0i64);
    for point in points {
        let lat = (point.lat * 1e5).round() as i64;
        let lon = (point.lon * 1e5).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }
    out
}

struct StaticProvider(Result<RawRoute, String>);

#[async_trait]
impl RouteProvider for StaticProvider {
    async fn fetch_route(&self, _: Position, _: Position, _: TravelProfile) -> Result<RawRoute> {
        self.0.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

struct SlowProvider;

#[async_trait]
impl RouteProvider for SlowProvider {
    async fn fetch_route(&self, _: Position, _: Position, _: TravelProfile) -> Result<RawRoute> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        bail!("unreachable")
    }
}

fn service(provider: Option<Arc<dyn RouteProvider>>) -> RouteService {
    RouteService::new(provider, &RoutingConfig::default())
}

fn stepped(steps: Vec<(Vec<Position>, f64)>) -> RawRoute {
    let duration = steps.iter().map(|(_, d)| d).sum();
    RawRoute {
        distance: 1_000.0,
        duration,
        geometry: None,
        steps: steps
            .into_iter()
            .map(|(points, duration)| RawStep {
                geometry: encode(&points),
                duration,
            })
            .collect(),
        precision: 5,
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_encoder_matches_reference_vector() {
    let points = [
        Position::new(38.5, -120.2),
        Position::new(40.7, -120.95),
        Position::new(43.252, -126.453),
    ];
    assert_eq!(encode(&points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
}

#[tokio::test]
async fn test_fallback_on_provider_error() {
    let svc = service(Some(Arc::new(StaticProvider(Err("connection refused".into())))));
    let from = p(3_278_250, -9_678_490);
    let to = p(3_277_670, -9_679_700);

    let route = svc.get_route(from, to, TravelProfile::Driving).await;

    assert!(!route.success);
    assert!(route.error.unwrap().contains("connection refused"));
    assert_eq!(route.waypoints, vec![from, to]);
    assert!(route.segment_durations.is_none());
    assert!(approx(route.distance, distance(from, to)));
    assert!(approx(route.duration, distance(from, to) / 8.0));
}

#[tokio::test]
async fn test_fallback_when_disabled_uses_walking_speed() {
    let svc = service(None);
    let from = p(3_278_250, -9_678_490);
    let to = p(3_277_670, -9_679_700);

    let route = svc.get_route(from, to, TravelProfile::Walking).await;

    assert!(!route.success);
    assert!(approx(route.duration, distance(from, to) / 1.4));
}

#[tokio::test]
async fn test_fallback_on_timeout() {
    let config = RoutingConfig {
        timeout_ms: 50,
        ..RoutingConfig::default()
    };
    let svc = RouteService::new(Some(Arc::new(SlowProvider)), &config);

    let route = svc
        .get_route(p(0, 0), p(100, 0), TravelProfile::Driving)
        .await;

    assert!(!route.success);
    assert!(route.error.unwrap().contains("timed out"));
    assert_eq!(route.waypoints.len(), 2);
}

#[tokio::test]
async fn test_steps_concatenate_without_duplicate_boundaries() {
    // ~111 m between consecutive points
    let a = p(3_200_000, -9_600_000);
    let b = p(3_200_100, -9_600_000);
    let c = p(3_200_200, -9_600_000);
    let d = p(3_200_300, -9_600_000);

    let raw = stepped(vec![(vec![a, b, c], 30.0), (vec![c, d], 10.0), (vec![d, d], 0.0)]);
    let svc = service(Some(Arc::new(StaticProvider(Ok(raw)))));

    let route = svc.get_route(a, d, TravelProfile::Driving).await;

    assert!(route.success);
    assert_eq!(route.waypoints, vec![a, b, c, d]);
    let durations = route.segment_durations.unwrap();
    assert_eq!(durations.len(), 3);
    assert!(approx(durations[0], 15.0));
    assert!(approx(durations[1], 15.0));
    assert!(approx(durations[2], 10.0));
    assert_eq!(route.duration, 40.0);
}

#[tokio::test]
async fn test_step_without_segments_carries_time_forward() {
    let a = p(3_200_000, -9_600_000);
    let b = p(3_200_100, -9_600_000);
    let c = p(3_200_200, -9_600_000);

    // The lone-point step adds no segment; its 4s land on the next step
    let raw = stepped(vec![(vec![a], 4.0), (vec![a, b], 6.0), (vec![b, c], 10.0)]);
    let svc = service(Some(Arc::new(StaticProvider(Ok(raw)))));

    let durations = svc
        .get_route(a, c, TravelProfile::Driving)
        .await
        .segment_durations
        .unwrap();

    assert!(approx(durations[0], 10.0));
    assert!(approx(durations[1], 10.0));
}

#[tokio::test]
async fn test_untimed_steps_take_route_total() {
    let a = p(3_200_000, -9_600_000);
    let b = p(3_200_100, -9_600_000);
    let c = p(3_200_200, -9_600_000);

    let mut raw = stepped(vec![(vec![a, b], 0.0), (vec![b, c], 0.0)]);
    raw.duration = 30.0;
    let svc = service(Some(Arc::new(StaticProvider(Ok(raw)))));

    let route = svc.get_route(a, c, TravelProfile::Driving).await;

    assert!(route.success);
    let durations = route.segment_durations.unwrap();
    assert_eq!(durations.len(), 2);
    assert!(approx(durations[0], 15.0));
    assert!(approx(durations[1], 15.0));
}

#[tokio::test]
async fn test_overview_geometry_when_no_steps() {
    let a = p(3_200_000, -9_600_000);
    let b = p(3_200_100, -9_600_000);
    let c = p(3_200_300, -9_600_000);

    let raw = RawRoute {
        distance: 333.0,
        duration: 30.0,
        geometry: Some(encode(&[a, b, c])),
        steps: Vec::new(),
        precision: 5,
    };
    let svc = service(Some(Arc::new(StaticProvider(Ok(raw)))));

    let route = svc.get_route(a, c, TravelProfile::Driving).await;

    assert!(route.success);
    assert_eq!(route.waypoints, vec![a, b, c]);
    let durations = route.segment_durations.unwrap();
    // b->c is twice as long as a->b
    assert!((durations[0] - 10.0).abs() < 1e-3);
    assert!((durations[1] - 20.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_simplification_preserves_total_duration() {
    // ~11 m spacing, simplified at 50 m
    let points: Vec<Position> = (0..11).map(|i| p(3_200_000 + i * 10, -9_600_000)).collect();

    let raw = stepped(vec![(points.clone(), 100.0)]);
    let svc = service(Some(Arc::new(StaticProvider(Ok(raw)))));

    let route = svc
        .get_route(points[0], points[10], TravelProfile::Driving)
        .await;

    assert_eq!(route.waypoints, vec![points[0], points[5], points[10]]);
    let durations = route.segment_durations.unwrap();
    assert_eq!(durations.len(), 2);
    assert!(approx(durations.iter().sum::<f64>(), 100.0));
    assert!((durations[0] - 50.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_degenerate_geometry_falls_back() {
    let a = p(3_200_000, -9_600_000);
    let raw = RawRoute {
        distance: 0.0,
        duration: 0.0,
        geometry: Some(encode(&[a, a])),
        steps: Vec::new(),
        precision: 5,
    };
    let svc = service(Some(Arc::new(StaticProvider(Ok(raw)))));

    let route = svc.get_route(a, p(3_200_100, -9_600_000), TravelProfile::Driving).await;

    assert!(!route.success);
    assert_eq!(route.waypoints.len(), 2);
}

#[test]
fn test_distribute_equal_split_for_zero_length() {
    assert_eq!(distribute(9.0, &[0.0, 0.0, 0.0]), vec![3.0, 3.0, 3.0]);
    assert!(distribute(9.0, &[]).is_empty());
}
