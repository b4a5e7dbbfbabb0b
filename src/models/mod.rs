// 基本的なデータ型と数学ユーティリティ
pub mod common;

// エージェントと積分器の基本インターフェース（trait）定義
pub mod traits;

// ドローンエージェント、近傍グラフ、モーションプランナー
pub mod drone;
pub mod neighbors;
pub mod physics;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use drone::{Drone, DroneGroup};
pub use neighbors::{NeighborGraph, NeighborMode};
pub use physics::{DronePhysics, ForwardEuler, HeadingChoice, PlannerConfig, RungeKutta4, TargetMetric};
