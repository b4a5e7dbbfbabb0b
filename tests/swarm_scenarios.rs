use dronesim::models::{
    math_utils::approx_eq, AgentStatus, DronePhysics, NeighborGraph, NeighborMode, Vector3D,
};
use dronesim::scenario::ScenarioConfig;
use dronesim::simulation::{SimulationEngine, Swarm};
use std::path::PathBuf;

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name)
}

#[test]
fn single_drone_without_neighbors_advances_by_step() {
    let mut swarm = Swarm::initialize(
        1,
        &[Vector3D::new(0.0, 0.0, 0.0)],
        &[Vector3D::new(1.0, 0.0, 0.0)],
        &[Vector3D::new(100.0, 0.0, 0.0)],
    )
    .unwrap();

    let drones = swarm.tick(0.1).unwrap();
    let drone = &drones[0];

    assert!(drone.neighbors.is_empty());
    assert!(approx_eq(drone.state.position.length(), 0.1, 1e-12));
    assert!(approx_eq(drone.state.velocity.length(), 1.0, 1e-12));
    assert!(drone.state.position.x > 0.0);
    assert_eq!(drone.target, Vector3D::new(100.0, 0.0, 0.0));
    assert_eq!(swarm.tick_count(), 1);
}

#[test]
fn drones_inside_collision_radius_deviate_from_straight_pursuit() {
    let mut swarm = Swarm::initialize(
        2,
        &[Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(8.0, 0.0, 0.0)],
        &[Vector3D::new(1.0, 0.0, 0.0), Vector3D::new(-1.0, 0.0, 0.0)],
        &[Vector3D::new(100.0, 0.0, 0.0), Vector3D::new(-92.0, 0.0, 0.0)],
    )
    .unwrap();

    let drones = swarm.tick(0.1).unwrap();

    for drone in drones {
        // 直進すると拒否されるため、進行方向がx軸から外れる
        assert!(drone.state.velocity.y.abs() > 0.1, "{} kept a straight heading", drone.id);
        assert!(drone.state.position.y.abs() > 0.0);
        assert_eq!(drone.quality, Some(0.0));
    }
}

#[test]
fn drone_approaching_neighbor_turns_before_the_radius() {
    // 衝突半径の外側では直進より離れる方向を選ぶ
    let mut swarm = Swarm::initialize(
        2,
        &[Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(15.0, -5.0, 0.0)],
        &[Vector3D::new(1.0, 0.0, 0.0), Vector3D::new(0.0, 0.0, 0.0)],
        &[Vector3D::new(1000.0, 0.0, 0.0), Vector3D::new(15.0, -5.0, 0.0)],
    )
    .unwrap();

    let drones = swarm.tick(1.0).unwrap();
    assert!(drones[0].state.velocity.y > 0.0);
    // 速度0のドローンはその場に留まる
    assert_eq!(drones[1].state.position, Vector3D::new(15.0, -5.0, 0.0));
}

#[test]
fn radius_mode_with_large_radius_matches_complete_graph() {
    let positions = [
        Vector3D::new(0.0, 0.0, 0.0),
        Vector3D::new(12.0, 5.0, 0.0),
        Vector3D::new(-6.0, 14.0, 0.0),
        Vector3D::new(20.0, -8.0, 0.0),
    ];
    let velocities = [
        Vector3D::new(1.0, 0.0, 0.0),
        Vector3D::new(-1.0, 0.0, 0.0),
        Vector3D::new(0.0, -1.0, 0.0),
        Vector3D::new(-0.7, 0.7, 0.0),
    ];
    let targets = [
        Vector3D::new(40.0, 0.0, 0.0),
        Vector3D::new(-40.0, 5.0, 0.0),
        Vector3D::new(-6.0, -40.0, 0.0),
        Vector3D::new(-20.0, 30.0, 0.0),
    ];

    let mut complete = Swarm::initialize(4, &positions, &velocities, &targets).unwrap();
    let mut radius = Swarm::initialize(4, &positions, &velocities, &targets)
        .unwrap()
        .with_neighbor_graph(NeighborGraph::new(NeighborMode::Radius { radius: 1.0e4 }).unwrap());

    for _ in 0..20 {
        complete.tick(0.2).unwrap();
        radius.tick(0.2).unwrap();
    }
    assert_eq!(complete.positions(), radius.positions());
}

#[test]
fn radius_mode_keeps_far_neighbor_that_steers_the_planner() {
    // 半径外の近傍でも Tclose を通じて進行方向を変えるので、半径方式でも同じ選択になる
    let positions = [Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(30.0, -10.0, 0.0)];
    let velocities = [Vector3D::new(1.0, 0.0, 0.0), Vector3D::zero()];
    let targets = [Vector3D::new(1000.0, 0.0, 0.0), Vector3D::new(30.0, -10.0, 0.0)];

    let mut complete = Swarm::initialize(2, &positions, &velocities, &targets).unwrap();
    let mut radius = Swarm::initialize(2, &positions, &velocities, &targets)
        .unwrap()
        .with_neighbor_graph(NeighborGraph::new(NeighborMode::Radius { radius: 20.0 }).unwrap());

    complete.tick(1.0).unwrap();
    radius.tick(1.0).unwrap();
    assert!(complete.positions()[0].y > 0.0);
    assert_eq!(complete.positions(), radius.positions());
    assert_eq!(radius.drones()[0].neighbors, vec![1]);

    for _ in 0..30 {
        complete.tick(1.0).unwrap();
        radius.tick(1.0).unwrap();
    }
    assert_eq!(complete.positions(), radius.positions());
}

#[test]
fn radius_mode_matches_complete_graph_in_dense_swarm() {
    let mut positions = Vec::new();
    let mut velocities = Vec::new();
    let mut targets = Vec::new();
    for i in 0..6 {
        let offset = i as f64 * 12.0;
        positions.push(Vector3D::new(offset, 0.0, 0.0));
        velocities.push(Vector3D::new(0.0, 1.0, 0.0));
        targets.push(Vector3D::new(offset, 200.0, 0.0));
        positions.push(Vector3D::new(offset + 6.0, 60.0, 0.0));
        velocities.push(Vector3D::new(0.0, -1.0, 0.0));
        targets.push(Vector3D::new(offset + 6.0, -140.0, 0.0));
    }

    let mut complete = Swarm::initialize(12, &positions, &velocities, &targets).unwrap();
    let mut radius = Swarm::initialize(12, &positions, &velocities, &targets)
        .unwrap()
        .with_neighbor_graph(NeighborGraph::new(NeighborMode::Radius { radius: 25.0 }).unwrap());

    for _ in 0..80 {
        complete.tick(0.5).unwrap();
        radius.tick(0.5).unwrap();
        assert_eq!(complete.positions(), radius.positions());
        assert_eq!(
            complete.drones().iter().map(|d| d.quality).collect::<Vec<_>>(),
            radius.drones().iter().map(|d| d.quality).collect::<Vec<_>>()
        );
    }
}

#[test]
fn default_swarm_uses_forward_euler() {
    let swarm = Swarm::initialize(0, &[], &[], &[]).unwrap();
    assert!(swarm.is_empty());
    assert_eq!(swarm.physics().integrator_name(), "euler");

    let custom = swarm.with_physics(DronePhysics::default());
    assert_eq!(custom.physics().config().candidate_count, 3);
}

#[test]
fn shipped_scenarios_load_and_run() {
    for name in ["crossing_rows.yaml", "head_on.yaml", "merge_radius.yaml"] {
        let scenario = ScenarioConfig::from_file(scenario_path(name))
            .unwrap_or_else(|e| panic!("{}: {}", name, e));
        let expected_drones = scenario.build_drones().len();
        let max_steps = scenario.sim.max_steps;

        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        let summary = engine.run().unwrap();

        assert_eq!(summary.drones, expected_drones, "{}", name);
        assert_eq!(summary.final_state.len(), expected_drones, "{}", name);
        assert!(summary.steps > 0 && summary.steps <= max_steps, "{}", name);
        assert!(summary.min_separation_m.is_some_and(|d| d > 0.0), "{}", name);
        assert!(
            summary
                .final_state
                .iter()
                .all(|d| d.position.is_finite() && d.velocity.is_finite()),
            "{}",
            name
        );
        if summary.reached == summary.drones {
            assert!(summary.final_state.iter().all(|d| d.status == AgentStatus::Reached));
        }
    }
}

#[test]
fn paced_run_honors_step_limit() {
    let yaml = r#"
meta:
  version: "1.0"
  name: paced
sim:
  dt_s: 0.1
  t_max_s: 100.0
  max_steps: 3
drones:
  - id: A
    pos: { x: 0.0, y: 0.0 }
    vel: { x: 1.0, y: 0.0 }
    target: { x: 100.0, y: 0.0 }
"#;
    let scenario = ScenarioConfig::from_yaml_str(yaml).unwrap();
    let mut engine = SimulationEngine::new(scenario, 0);
    engine.initialize().unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let summary = runtime.block_on(engine.run_paced(200.0)).unwrap();
    assert_eq!(summary.steps, 3);

    let mut engine = SimulationEngine::new(ScenarioConfig::from_yaml_str(yaml).unwrap(), 0);
    engine.initialize().unwrap();
    assert!(runtime.block_on(engine.run_paced(0.0)).is_err());
}
