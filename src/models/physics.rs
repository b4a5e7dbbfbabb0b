//! # Physics モジュール
//!
//! ドローンの進行方向決定（モーションプランナー）と時間積分を提供します。
//!
//! 各ドローンについて、現在の速度ベクトルを基準に少数の候補方向を生成し、
//! 目標への接近と近傍との衝突回避のバランスを評価関数で採点して、
//! 最良の方向を選びます。選ばれた方向で位置を1ステップ進めます。
//!
//! ## 処理手順
//!
//! 1. 現在速度を `-θ` 回転した基準方向を求める（θ: 走査角、既定20度）
//! 2. 基準方向を `i * θ` (i = 0..K) 回転して K 個の候補を生成（既定 K = 3）
//! 3. 各候補を評価関数で採点し、厳密に大きい場合のみ最良を更新
//! 4. 積分器で位置を進め、速度を選んだ方向に置き換える
//!
//! 1ステップ先だけを見る貪欲な局所プランナーであり、経路計画は行いません。

use crate::models::{
    traits::{IAgent, IIntegrator, IMovable},
    common::{Vector3D, KinematicState, SwarmError, math_utils, validate_step_size},
    drone::Drone,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// 目標接近項 `Ttarget` の計算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMetric {
    /// `|target - (target - v*h)| / |v|` をそのまま計算（ほぼ定数 h になる）
    #[default]
    Literal,
    /// 目標までの距離の減少量を移動量で正規化した値
    Progress,
}

/// プランナー設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// 候補方向の走査角（度）
    pub scan_angle_deg: f64,
    /// 候補方向の数
    pub candidate_count: u32,
    /// 衝突判定半径（m）
    pub collision_radius: f64,
    /// 目標接近項の計算方式
    pub target_metric: TargetMetric,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            scan_angle_deg: 20.0,
            candidate_count: 3,
            collision_radius: 10.0,
            target_metric: TargetMetric::Literal,
        }
    }
}

/// プランナーが選んだ進行方向とその評価値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingChoice {
    pub heading: Vector3D,
    pub quality: f64,
}

/// 単段の前進オイラー法（既定）
///
/// `position += h * heading`、`velocity = heading`
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardEuler;

impl IIntegrator for ForwardEuler {
    fn name(&self) -> &'static str {
        "euler"
    }

    fn integrate(
        &self,
        state: &KinematicState,
        h: f64,
        plan: &mut dyn FnMut(Vector3D) -> HeadingChoice,
    ) -> (KinematicState, f64) {
        let choice = plan(state.position);
        (
            KinematicState::new(state.position + h * choice.heading, choice.heading),
            choice.quality,
        )
    }
}

/// 古典的4段ルンゲ・クッタ法（明示的に選択した場合のみ使用）
///
/// 各段の位置で進行方向を再計画します。近傍スナップショットは全段で共通です。
/// 位置は4段の加重平均で進め、速度と評価値は第1段のものを採用します。
#[derive(Debug, Clone, Copy, Default)]
pub struct RungeKutta4;

impl IIntegrator for RungeKutta4 {
    fn name(&self) -> &'static str {
        "rk4"
    }

    fn integrate(
        &self,
        state: &KinematicState,
        h: f64,
        plan: &mut dyn FnMut(Vector3D) -> HeadingChoice,
    ) -> (KinematicState, f64) {
        let p = state.position;
        let k1 = plan(p);
        let k2 = plan(p + (h / 2.0) * k1.heading);
        let k3 = plan(p + (h / 2.0) * k2.heading);
        let k4 = plan(p + h * k3.heading);

        let heading = (k1.heading + 2.0 * k2.heading + 2.0 * k3.heading + k4.heading) / 6.0;
        (KinematicState::new(p + h * heading, k1.heading), k1.quality)
    }
}

/// ドローンのモーションプランナー
pub struct DronePhysics {
    config: PlannerConfig,
    scan_angle: f64,
    integrator: Box<dyn IIntegrator>,
}

impl Default for DronePhysics {
    fn default() -> Self {
        let config = PlannerConfig::default();
        Self {
            config,
            scan_angle: math_utils::deg_to_rad(config.scan_angle_deg),
            integrator: Box::new(ForwardEuler),
        }
    }
}

impl DronePhysics {
    /// 設定を検証してプランナーを作成
    ///
    /// 積分器は前進オイラー法になります。
    pub fn new(config: PlannerConfig) -> Result<Self, SwarmError> {
        if config.candidate_count == 0 {
            return Err(SwarmError::InvalidArgument(
                "candidate_count must be at least 1".to_string(),
            ));
        }
        if !config.scan_angle_deg.is_finite() {
            return Err(SwarmError::InvalidArgument(format!(
                "scan_angle_deg must be finite, got {}",
                config.scan_angle_deg
            )));
        }
        if !config.collision_radius.is_finite() || config.collision_radius < 0.0 {
            return Err(SwarmError::InvalidArgument(format!(
                "collision_radius must be non-negative, got {}",
                config.collision_radius
            )));
        }

        Ok(Self {
            config,
            scan_angle: math_utils::deg_to_rad(config.scan_angle_deg),
            integrator: Box::new(ForwardEuler),
        })
    }

    /// 積分器を差し替える
    pub fn with_integrator(mut self, integrator: Box<dyn IIntegrator>) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn integrator_name(&self) -> &'static str {
        self.integrator.name()
    }

    /// 速度ベクトルから候補方向を生成
    ///
    /// 候補はすべて元の速度と同じ大きさになります。
    pub fn candidate_headings(&self, velocity: Vector3D) -> Vec<Vector3D> {
        let base = velocity.rotate_z(-self.scan_angle);
        (0..self.config.candidate_count)
            .map(|i| base.rotate_z(i as f64 * self.scan_angle))
            .collect()
    }

    /// 候補方向の評価値を計算
    ///
    /// # 引数
    ///
    /// * `drone` - 評価対象のドローン
    /// * `snapshot` - ティック開始時点の全ドローンの運動状態
    /// * `candidate` - 候補速度ベクトル
    /// * `h` - 時間刻み
    ///
    /// # 戻り値
    ///
    /// `Ttarget + Tclose`。衝突半径内に入る候補は0（拒否）
    ///
    /// `Tclose` は `(移動後距離 - 現在距離) / |v|` で、離れる候補ほど正になります。
    pub fn quality(
        &self,
        drone: &Drone,
        snapshot: &[KinematicState],
        candidate: Vector3D,
        h: f64,
    ) -> f64 {
        self.quality_at(drone, drone.state.position, snapshot, candidate, h)
    }

    fn quality_at(
        &self,
        drone: &Drone,
        position: Vector3D,
        snapshot: &[KinematicState],
        candidate: Vector3D,
        h: f64,
    ) -> f64 {
        let speed = candidate.length();
        if speed == 0.0 {
            return 0.0;
        }

        let displacement = candidate * h;
        let next_position = position + displacement;

        let t_target = match self.config.target_metric {
            TargetMetric::Literal => {
                (drone.target - (drone.target - displacement)).length() / speed
            }
            TargetMetric::Progress => {
                (drone.target.distance_to(&position) - drone.target.distance_to(&next_position))
                    / displacement.length()
            }
        };

        // 移動後に最も近くなる近傍
        let mut closest: Option<(f64, f64)> = None;
        for neighbor in drone.neighbors.iter().filter_map(|&i| snapshot.get(i)) {
            let next_dist = neighbor.position.distance_to(&next_position);
            if closest.is_none_or(|(next_closest, _)| next_dist < next_closest) {
                let current_dist = neighbor.position.distance_to(&position);
                closest = Some((next_dist, current_dist));
            }
        }

        let t_close = match closest {
            None => 0.0,
            Some((next_closest, _)) if next_closest < self.config.collision_radius => {
                return 0.0;
            }
            Some((next_closest, current_closest)) => (next_closest - current_closest) / speed,
        };

        t_target + t_close
    }

    fn choose_heading(
        &self,
        drone: &Drone,
        position: Vector3D,
        snapshot: &[KinematicState],
        h: f64,
    ) -> HeadingChoice {
        let candidates = self.candidate_headings(drone.state.velocity);

        let mut best = HeadingChoice {
            heading: candidates[0],
            quality: 0.0,
        };
        for (index, candidate) in candidates.iter().enumerate() {
            let quality = self.quality_at(drone, position, snapshot, *candidate, h);
            trace!("{} 候補{}: {} 評価値={:.4}", drone.id, index, candidate, quality);
            if quality > best.quality {
                best = HeadingChoice {
                    heading: *candidate,
                    quality,
                };
            }
        }

        best
    }

    /// 1ドローン分の進行方向を決定し、1ステップ積分する
    ///
    /// # 引数
    ///
    /// * `drone` - 更新対象のドローン
    /// * `snapshot` - ティック開始時点の全ドローンの運動状態
    /// * `h` - 時間刻み（正の有限値）
    ///
    /// # 戻り値
    ///
    /// 状態を更新したドローン。目標と近傍リストはそのまま引き継がれます。
    pub fn step(
        &self,
        drone: &Drone,
        snapshot: &[KinematicState],
        h: f64,
    ) -> Result<Drone, SwarmError> {
        validate_step_size(h)?;

        let mut next = drone.clone();
        if !drone.is_active() {
            return Ok(next);
        }

        let mut plan = |position: Vector3D| self.choose_heading(drone, position, snapshot, h);
        let (state, quality) = self.integrator.integrate(&drone.state, h, &mut plan);

        next.set_state(state);
        next.quality = Some(quality);
        next.check_arrival();
        Ok(next)
    }
}
