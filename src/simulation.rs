//! # Simulation モジュール
//!
//! ドローンスウォームの時間駆動シミュレーションを提供します。
//!
//! [`Swarm`] は全ドローンを1つの配列で所有し、外部の描画ループから
//! 1フレームに1回 [`Swarm::tick`] を呼ばれる中核です。
//! [`SimulationEngine`] はシナリオファイルから [`Swarm`] を構築し、
//! 固定時間刻みでティックを進めるヘッドレスな駆動ループです。
//!
//! ## ティック処理順序
//!
//! 1. **スナップショット取得**: 全ドローンの運動状態を複製
//! 2. **近傍グラフ再構築**: 各ドローンの近傍リストを作り直す
//! 3. **進行方向決定と積分**: 全ドローンをスナップショットに対して計画
//! 4. **一括反映**: 全ドローンの新しい状態を同時に置き換える
//!
//! ティック内であるドローンの更新結果が他のドローンの計画に影響することはなく、
//! 結果は処理順序に依存しません。
//!
//! ## 使用例
//!
//! ```rust
//! use dronesim::models::Vector3D;
//! use dronesim::simulation::Swarm;
//!
//! let mut swarm = Swarm::initialize(
//!     1,
//!     &[Vector3D::new(0.0, 0.0, 0.0)],
//!     &[Vector3D::new(1.0, 0.0, 0.0)],
//!     &[Vector3D::new(100.0, 0.0, 0.0)],
//! )?;
//! swarm.tick(0.1)?;
//! let positions = swarm.positions();
//! # Ok::<(), dronesim::models::SwarmError>(())
//! ```

use crate::models::*;
use crate::scenario::ScenarioConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn, debug, trace};

/// ドローンスウォーム
///
/// 全ドローンを所有するアリーナです。近傍リストはこの配列へのインデックスです。
pub struct Swarm {
    drones: Vec<Drone>,
    physics: DronePhysics,
    graph: NeighborGraph,
    tick_count: u64,
}

impl Default for Swarm {
    fn default() -> Self {
        Self::from_drones(Vec::new(), DronePhysics::default(), NeighborGraph::default())
    }
}

impl Swarm {
    /// 初期位置・初期速度・目標からスウォームを生成
    ///
    /// プランナーと近傍グラフは既定設定（前進オイラー法、完全グラフ）になります。
    ///
    /// # 引数
    ///
    /// * `count` - ドローン数
    /// * `positions` - 初期位置（長さ `count`）
    /// * `velocities` - 初期速度（長さ `count`）
    /// * `targets` - 目標地点（長さ `count`）
    ///
    /// # エラー
    ///
    /// 配列の長さが `count` と一致しない場合は `InvalidArgument`
    pub fn initialize(
        count: usize,
        positions: &[Vector3D],
        velocities: &[Vector3D],
        targets: &[Vector3D],
    ) -> Result<Self, SwarmError> {
        if positions.len() != count || velocities.len() != count || targets.len() != count {
            return Err(SwarmError::InvalidArgument(format!(
                "expected {} positions, velocities and targets, got {}, {} and {}",
                count,
                positions.len(),
                velocities.len(),
                targets.len()
            )));
        }

        let drones = (0..count)
            .map(|i| {
                Drone::new(
                    format!("D{:03}", i + 1),
                    positions[i],
                    velocities[i],
                    targets[i],
                )
            })
            .collect();

        Ok(Self::default().with_drones(drones))
    }

    pub fn from_drones(drones: Vec<Drone>, physics: DronePhysics, graph: NeighborGraph) -> Self {
        Self {
            drones,
            physics,
            graph,
            tick_count: 0,
        }
    }

    fn with_drones(mut self, drones: Vec<Drone>) -> Self {
        self.drones = drones;
        self
    }

    pub fn with_physics(mut self, physics: DronePhysics) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_neighbor_graph(mut self, graph: NeighborGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn physics(&self) -> &DronePhysics {
        &self.physics
    }

    /// 描画用の現在位置一覧（シミュレーション座標系のまま）
    pub fn positions(&self) -> Vec<Vector3D> {
        self.drones.iter().map(|d| d.get_position()).collect()
    }

    /// 全ドローンの運動状態のスナップショット
    pub fn snapshot(&self) -> Vec<KinematicState> {
        self.drones.iter().map(|d| d.get_state()).collect()
    }

    /// 1ティック進める
    ///
    /// 近傍グラフを再構築し、全ドローンをティック開始時のスナップショットに対して
    /// 計画・積分してから一括で反映します。
    ///
    /// # 引数
    ///
    /// * `h` - 時間刻み（正の有限値）
    ///
    /// # 戻り値
    ///
    /// 更新後のドローン一覧
    pub fn tick(&mut self, h: f64) -> Result<&[Drone], SwarmError> {
        validate_step_size(h)?;

        let snapshot = self.snapshot();
        let neighbor_lists = self.graph.rebuild(&snapshot, h);
        for (drone, neighbors) in self.drones.iter_mut().zip(neighbor_lists) {
            drone.neighbors = neighbors;
        }

        let updated = self
            .drones
            .iter()
            .map(|drone| self.physics.step(drone, &snapshot, h))
            .collect::<Result<Vec<_>, _>>()?;

        for (before, after) in self.drones.iter().zip(&updated) {
            if before.is_active() && !after.is_active() {
                info!("{} が目標に到達しました ({})", after.get_id(), after.get_position());
            }
        }

        self.drones = updated;
        self.tick_count += 1;
        Ok(&self.drones)
    }

    /// 全ドローンが目標に到達したか
    pub fn all_reached(&self) -> bool {
        !self.drones.is_empty() && self.drones.iter().all(|d| d.status == AgentStatus::Reached)
    }

    pub fn reached_count(&self) -> usize {
        self.drones
            .iter()
            .filter(|d| d.status == AgentStatus::Reached)
            .count()
    }

    /// ドローン間の最小XY距離（2機未満の場合はNone）
    pub fn min_separation(&self) -> Option<f64> {
        let mut min: Option<f64> = None;
        for (i, a) in self.drones.iter().enumerate() {
            for b in &self.drones[i + 1..] {
                let distance = a.state.position.distance_to(&b.state.position);
                if min.is_none_or(|m| distance < m) {
                    min = Some(distance);
                }
            }
        }
        min
    }
}

/// ドローン1機分の出力レコード
#[derive(Debug, Clone, Serialize)]
pub struct DroneReport {
    pub id: String,
    pub position: Vector3D,
    pub velocity: Vector3D,
    pub target: Vector3D,
    pub status: AgentStatus,
    pub quality: Option<f64>,
}

/// シミュレーション結果の集計
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub integrator: String,
    pub steps: u64,
    pub sim_time_s: f64,
    pub drones: usize,
    pub reached: usize,
    /// 実行中に観測したドローン間の最小距離
    pub min_separation_m: Option<f64>,
    /// 衝突判定半径内に入ったドローン対が存在したステップ数
    pub close_approach_steps: u64,
    pub final_state: Vec<DroneReport>,
}

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub max_steps: u64,
    pub step_count: u64,

    pub swarm: Swarm,

    pub min_separation: Option<f64>,
    pub close_approach_steps: u64,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        Self {
            current_time: 0.0,
            dt: scenario.sim.dt_s,
            max_time: scenario.sim.t_max_s,
            max_steps: scenario.sim.max_steps,
            step_count: 0,
            swarm: Swarm::default(),
            min_separation: None,
            close_approach_steps: 0,
            scenario_config: scenario,
            verbose_level,
        }
    }

    pub fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        let physics = self.scenario_config.build_physics()?;
        let graph = NeighborGraph::new(self.scenario_config.neighbors)?;
        let drones = self.scenario_config.build_drones();

        if self.verbose_level > 1 {
            for drone in &drones {
                debug!("ドローン初期化: {} (位置: {}, 目標: {})",
                        drone.id, drone.state.position, drone.target);
            }
        }

        self.swarm = Swarm::from_drones(drones, physics, graph);
        self.min_separation = self.swarm.min_separation();

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  ドローン: {}機", self.swarm.len());
            info!("  積分法: {}", self.swarm.physics().integrator_name());
            info!("  近傍: {:?}", self.scenario_config.neighbors);
        }

        Ok(())
    }

    /// 継続条件: 最大時間・最大ステップ数に達しておらず、未到達のドローンが残っている
    fn should_continue(&self) -> bool {
        self.current_time < self.max_time
            && self.step_count < self.max_steps
            && !self.swarm.all_reached()
    }

    pub fn run(&mut self) -> Result<RunSummary, Box<dyn std::error::Error>> {
        info!("=== シミュレーション実行開始 ===");

        while self.should_continue() {
            self.step()?;
        }

        Ok(self.finish())
    }

    /// 実時間に合わせてティックを進める
    ///
    /// 外部の描画ループの代わりに、`fps` 回/秒の間隔でティックを実行します。
    pub async fn run_paced(&mut self, fps: f64) -> Result<RunSummary, Box<dyn std::error::Error>> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SwarmError::InvalidArgument(format!(
                "fps must be positive, got {}",
                fps
            ))
            .into());
        }

        info!("=== シミュレーション実行開始 ({:.1} fps) ===", fps);

        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
        while self.should_continue() {
            interval.tick().await;
            self.step()?;
        }

        Ok(self.finish())
    }

    fn step(&mut self) -> Result<(), SwarmError> {
        self.swarm.tick(self.dt)?;

        self.current_time += self.dt;
        self.step_count += 1;

        if let Some(separation) = self.swarm.min_separation() {
            if self.min_separation.is_none_or(|m| separation < m) {
                self.min_separation = Some(separation);
            }
            if separation < self.swarm.physics().config().collision_radius {
                self.close_approach_steps += 1;
                if self.verbose_level > 1 {
                    warn!("ステップ{}: ドローン間距離 {:.2}m が衝突判定半径未満",
                          self.step_count, separation);
                }
            }
        }

        if self.verbose_level > 2 {
            trace!("時刻: {:.2}秒 (ステップ: {})", self.current_time, self.step_count);
            for drone in self.swarm.drones() {
                trace!("  {}: {} 評価値={:?}", drone.id, drone.state.position, drone.quality);
            }
        }

        if self.step_count % 100 == 0 && self.verbose_level > 0 {
            let progress = (self.current_time / self.max_time) * 100.0;
            info!("進行状況: {:.1}% ({:.1}/{:.1}秒, 到達 {}/{}機)",
                  progress, self.current_time, self.max_time,
                  self.swarm.reached_count(), self.swarm.len());
        }

        Ok(())
    }

    fn finish(&self) -> RunSummary {
        info!("=== シミュレーション完了 ===");
        info!("実行時間: {:.1}秒", self.current_time);
        info!("総ステップ数: {}", self.step_count);
        info!("到達: {}/{}機", self.swarm.reached_count(), self.swarm.len());

        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            scenario: self.scenario_config.meta.name.clone(),
            integrator: self.swarm.physics().integrator_name().to_string(),
            steps: self.step_count,
            sim_time_s: self.current_time,
            drones: self.swarm.len(),
            reached: self.swarm.reached_count(),
            min_separation_m: self.min_separation,
            close_approach_steps: self.close_approach_steps,
            final_state: self
                .swarm
                .drones()
                .iter()
                .map(|d| DroneReport {
                    id: d.id.clone(),
                    position: d.state.position,
                    velocity: d.state.velocity,
                    target: d.target,
                    status: d.status,
                    quality: d.quality,
                })
                .collect(),
        }
    }
}
