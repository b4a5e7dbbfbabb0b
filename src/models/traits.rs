use crate::models::common::*;
use crate::models::physics::HeadingChoice;

/// 全てのスウォームエージェントが実装する基本インターフェース
pub trait IAgent {
    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// エージェントがアクティブ（移動中）かどうか
    fn is_active(&self) -> bool;
}

/// 移動可能なエージェントのインターフェース
pub trait IMovable {
    /// 現在位置の取得
    fn get_position(&self) -> Vector3D;

    /// 現在速度の取得
    fn get_velocity(&self) -> Vector3D;

    /// 運動状態の取得
    fn get_state(&self) -> KinematicState;

    /// 運動状態の置き換え
    fn set_state(&mut self, state: KinematicState);
}

/// 数値積分法のインターフェース
///
/// `plan` は与えられた位置でプランナーが選んだ進行方向とその評価値を返します。
/// 近傍スナップショットはティック開始時のものが全ステージで共有されます。
pub trait IIntegrator {
    /// 積分法の名前（ログ表示用）
    fn name(&self) -> &'static str;

    /// 1ステップ分の状態を積分し、新しい状態と採用した評価値を返す
    fn integrate(
        &self,
        state: &KinematicState,
        h: f64,
        plan: &mut dyn FnMut(Vector3D) -> HeadingChoice,
    ) -> (KinematicState, f64);
}
