use crate::models::{
    traits::{IAgent, IMovable},
    common::{Vector3D, KinematicState, AgentStatus},
};

/// ドローンエージェント
///
/// 自身の目標地点に向かって移動しつつ、近傍のドローンとの衝突を回避する質点です。
/// 近傍リストはスウォーム内のインデックスで保持され、毎ティック再構築されます。
/// 近傍関係は所有関係を意味しません。
#[derive(Debug, Clone, PartialEq)]
pub struct Drone {
    /// ドローンの一意識別子
    pub id: String,
    /// 現在の運動状態
    pub state: KinematicState,
    /// 目標地点（生存期間中は固定）
    pub target: Vector3D,
    /// 近傍ドローンのインデックス（スウォーム配列への参照）
    pub neighbors: Vec<usize>,
    /// 現在状態
    pub status: AgentStatus,
    /// 直前のティックで採用した進行方向の評価値
    pub quality: Option<f64>,
    /// 目標到達判定範囲（0で判定しない）
    pub arrival_radius: f64,
}

impl Drone {
    /// 新しいDroneインスタンスを作成
    ///
    /// # 引数
    ///
    /// * `id` - ドローンの一意識別子
    /// * `position` - 初期位置
    /// * `velocity` - 初期速度
    /// * `target` - 目標地点
    pub fn new(id: String, position: Vector3D, velocity: Vector3D, target: Vector3D) -> Self {
        Self {
            id,
            state: KinematicState::new(position, velocity),
            target,
            neighbors: Vec::new(),
            status: AgentStatus::Active,
            quality: None,
            arrival_radius: 0.0,
        }
    }

    pub fn with_arrival_radius(mut self, arrival_radius: f64) -> Self {
        self.arrival_radius = arrival_radius.max(0.0);
        self
    }

    /// 目標までのXY平面距離
    pub fn distance_to_target(&self) -> f64 {
        self.state.position.distance_to(&self.target)
    }

    /// 到達判定をチェック
    ///
    /// 目標地点の到達範囲内に入った場合、状態をReachedに変更し速度を0にします。
    pub fn check_arrival(&mut self) {
        if self.status == AgentStatus::Active
            && self.arrival_radius > 0.0
            && self.distance_to_target() <= self.arrival_radius
        {
            self.status = AgentStatus::Reached;
            self.state.velocity = Vector3D::zero();
        }
    }
}

impl IAgent for Drone {
    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

impl IMovable for Drone {
    fn get_position(&self) -> Vector3D {
        self.state.position
    }

    fn get_velocity(&self) -> Vector3D {
        self.state.velocity
    }

    fn get_state(&self) -> KinematicState {
        self.state
    }

    fn set_state(&mut self, state: KinematicState) {
        self.state = state;
    }
}

/// 直線状に並んだドローン群を一括生成するヘルパー構造体
///
/// 開始位置から `spacing` ずつずらしてドローンを配置し、
/// 目標地点も `target_start` から `target_spacing` ずつずらして割り当てます。
/// 全ドローンに同じ初期速度が設定されます。
pub struct DroneGroup {
    /// グループの一意識別子
    pub id: String,
    /// グループ内のドローン数
    pub count: u32,
    /// 先頭ドローンの初期位置
    pub start: Vector3D,
    /// ドローン間の配置間隔
    pub spacing: Vector3D,
    /// 全ドローン共通の初期速度
    pub velocity: Vector3D,
    /// 先頭ドローンの目標地点
    pub target_start: Vector3D,
    /// 目標地点の間隔
    pub target_spacing: Vector3D,
    /// 目標到達判定範囲
    pub arrival_radius: f64,
}

impl DroneGroup {
    /// グループ内の全ドローンを生成
    ///
    /// IDは `{グループID}_D{連番:03}` の形式になります。
    pub fn generate_drones(&self) -> Vec<Drone> {
        (0..self.count)
            .map(|index| {
                let offset = index as f64;
                Drone::new(
                    format!("{}_D{:03}", self.id, index + 1),
                    self.start + self.spacing * offset,
                    self.velocity,
                    self.target_start + self.target_spacing * offset,
                )
                .with_arrival_radius(self.arrival_radius)
            })
            .collect()
    }
}
