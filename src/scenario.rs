use crate::models::{
    Drone, DroneGroup, DronePhysics, ForwardEuler, IIntegrator, NeighborMode, PlannerConfig,
    RungeKutta4, SwarmError, TargetMetric, Vector3D,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// シナリオメタデータ
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
    pub max_steps: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_s: 0.1,
            t_max_s: 60.0,
            max_steps: 10_000,
        }
    }
}

/// 積分法の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegratorKind {
    /// 単段の前進オイラー法（既定）
    #[default]
    Euler,
    /// 4段ルンゲ・クッタ法（明示的に選択した場合のみ）
    Rk4,
}

impl IntegratorKind {
    pub fn build(self) -> Box<dyn IIntegrator> {
        match self {
            IntegratorKind::Euler => Box::new(ForwardEuler),
            IntegratorKind::Rk4 => Box::new(RungeKutta4),
        }
    }
}

/// プランナー設定
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub scan_angle_deg: f64,
    pub candidate_count: u32,
    pub collision_radius_m: f64,
    pub arrival_radius_m: f64,
    pub target_metric: TargetMetric,
    pub integrator: IntegratorKind,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        let defaults = PlannerConfig::default();
        Self {
            scan_angle_deg: defaults.scan_angle_deg,
            candidate_count: defaults.candidate_count,
            collision_radius_m: defaults.collision_radius,
            arrival_radius_m: 1.0,
            target_metric: defaults.target_metric,
            integrator: IntegratorKind::Euler,
        }
    }
}

/// 個別ドローン設定
#[derive(Debug, Deserialize, Serialize)]
pub struct DroneConfig {
    pub id: String,
    pub pos: Vector3D,
    pub vel: Vector3D,
    pub target: Vector3D,
}

/// 直線配置のドローングループ設定
#[derive(Debug, Deserialize, Serialize)]
pub struct DroneGroupConfig {
    pub id: String,
    pub count: u32,
    pub start: Vector3D,
    pub spacing: Vector3D,
    pub vel: Vector3D,
    pub target_start: Vector3D,
    /// 省略時は `spacing` と同じ
    #[serde(default)]
    pub target_spacing: Option<Vector3D>,
}

/// 完全なシナリオ設定
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub sim: SimulationConfig,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub neighbors: NeighborMode,
    #[serde(default)]
    pub drones: Vec<DroneConfig>,
    #[serde(default)]
    pub groups: Vec<DroneGroupConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        // YAML解析
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError("<inline>".into(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 時間設定の検証
        if !self.sim.dt_s.is_finite() || self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError("dt_s must be positive".to_string()));
        }
        if !self.sim.t_max_s.is_finite() || self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::ValidationError("t_max_s must be positive".to_string()));
        }

        if self.planner.arrival_radius_m < 0.0 {
            return Err(ScenarioError::ValidationError(
                "arrival_radius_m must not be negative".to_string(),
            ));
        }

        // プランナーと近傍設定はそれぞれの構築時検証に任せる
        self.build_physics()
            .map_err(|e| ScenarioError::ValidationError(e.to_string()))?;
        crate::models::NeighborGraph::new(self.neighbors)
            .map_err(|e| ScenarioError::ValidationError(e.to_string()))?;

        // ドローン数とIDの一意性
        let drones = self.build_drones();
        if drones.is_empty() {
            return Err(ScenarioError::ValidationError(
                "scenario must define at least one drone".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for drone in &drones {
            if !seen.insert(drone.id.as_str()) {
                return Err(ScenarioError::ValidationError(format!(
                    "duplicate drone id: {}",
                    drone.id
                )));
            }
        }

        Ok(())
    }

    /// プランナー設定への変換
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            scan_angle_deg: self.planner.scan_angle_deg,
            candidate_count: self.planner.candidate_count,
            collision_radius: self.planner.collision_radius_m,
            target_metric: self.planner.target_metric,
        }
    }

    /// 設定に従ってモーションプランナーを構築
    pub fn build_physics(&self) -> Result<DronePhysics, SwarmError> {
        Ok(DronePhysics::new(self.planner_config())?.with_integrator(self.planner.integrator.build()))
    }

    /// 個別設定とグループ設定から全ドローンを生成
    ///
    /// 個別設定のドローンが先、グループのドローンが後に並びます。
    pub fn build_drones(&self) -> Vec<Drone> {
        let arrival_radius = self.planner.arrival_radius_m;

        let mut drones: Vec<Drone> = self
            .drones
            .iter()
            .map(|d| {
                Drone::new(d.id.clone(), d.pos, d.vel, d.target).with_arrival_radius(arrival_radius)
            })
            .collect();

        for group in &self.groups {
            let drone_group = DroneGroup {
                id: group.id.clone(),
                count: group.count,
                start: group.start,
                spacing: group.spacing,
                velocity: group.vel,
                target_start: group.target_start,
                target_spacing: group.target_spacing.unwrap_or(group.spacing),
                arrival_radius,
            };
            drones.extend(drone_group.generate_drones());
        }

        drones
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!("最大ステップ数: {}", self.sim.max_steps);
        println!();

        println!("=== プランナー設定 ===");
        println!("走査角: {:.1}度 × 候補{}方向", self.planner.scan_angle_deg, self.planner.candidate_count);
        println!("衝突判定半径: {:.1}m", self.planner.collision_radius_m);
        println!("到達判定半径: {:.1}m", self.planner.arrival_radius_m);
        println!("目標評価: {:?}", self.planner.target_metric);
        println!("積分法: {:?}", self.planner.integrator);
        match self.neighbors {
            NeighborMode::Complete => println!("近傍: 完全グラフ"),
            NeighborMode::Radius { radius } => println!("近傍: 半径{:.1}m以内", radius),
        }
        println!();

        println!("=== スウォーム ===");
        println!("個別ドローン: {}機", self.drones.len());
        println!("グループ数: {}", self.groups.len());
        for group in &self.groups {
            println!("  {}: {}機", group.id, group.count);
        }
        let total: usize = self.drones.len() + self.groups.iter().map(|g| g.count as usize).sum::<usize>();
        println!("総ドローン数: {}機", total);
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}
