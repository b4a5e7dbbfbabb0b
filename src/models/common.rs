use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// 3次元ベクトルを表す構造体
///
/// 位置・速度の両方に使用する値型です。全ての演算子は新しい値を返し、
/// オペランドを変更しません。
/// 長さと距離はXY平面のみで計算します（z成分は保持するが使用しない）。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vector3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// XY平面でのベクトルの長さ
    ///
    /// z成分は意図的に除外されます: `sqrt(x² + y²)`
    pub fn length(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }

    /// XY平面での2点間の距離
    pub fn distance_to(&self, other: &Vector3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// 成分ごとの積
    pub fn mul_components(self, other: Vector3D) -> Self {
        self * other
    }

    /// 成分ごとの商
    ///
    /// 前提条件: `other` の全成分が非ゼロであること。
    /// ゼロ除算はIEEE 754に従い Inf / NaN を返します（検査しません）。
    pub fn div_components(self, other: Vector3D) -> Self {
        self / other
    }

    /// XY成分をZ軸周りに回転した新しいベクトルを返す
    ///
    /// # 引数
    ///
    /// * `angle` - 回転角（ラジアン、反時計回りが正）
    ///
    /// # 戻り値
    ///
    /// 回転後のベクトル（z成分は変化しない）
    pub fn rotate_z(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Vector3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={:.3} y={:.3} z={:.3}", self.x, self.y, self.z)
    }
}

impl Add for Vector3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vector3D {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Vector3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Neg for Vector3D {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

// h * v の記法を可能にする
impl Mul<Vector3D> for f64 {
    type Output = Vector3D;

    fn mul(self, vector: Vector3D) -> Self::Output {
        vector * self
    }
}

impl Mul<Vector3D> for Vector3D {
    type Output = Self;

    fn mul(self, other: Vector3D) -> Self::Output {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }
}

impl Div<f64> for Vector3D {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Div<Vector3D> for Vector3D {
    type Output = Self;

    fn div(self, other: Vector3D) -> Self::Output {
        Self::new(self.x / other.x, self.y / other.y, self.z / other.z)
    }
}

/// エージェントの運動状態
///
/// 各ティックでモーションプランナーの出力によって丸ごと置き換えられます。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KinematicState {
    pub position: Vector3D,
    pub velocity: Vector3D,
}

impl KinematicState {
    pub fn new(position: Vector3D, velocity: Vector3D) -> Self {
        Self { position, velocity }
    }
}

/// エージェントの状態を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,  // 移動中
    Reached, // 目標到達（停止）
}

/// スウォーム操作のエラー
#[derive(Debug, Clone, PartialEq)]
pub enum SwarmError {
    /// 前提条件違反（h <= 0、配列長の不一致など）
    InvalidArgument(String),
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwarmError::InvalidArgument(msg) => write!(f, "不正な引数: {}", msg),
        }
    }
}

impl std::error::Error for SwarmError {}

/// 時間刻み h の前提条件 (h > 0 かつ有限) を検査
pub fn validate_step_size(h: f64) -> Result<(), SwarmError> {
    if !h.is_finite() || h <= 0.0 {
        return Err(SwarmError::InvalidArgument(format!(
            "step size h must be positive and finite, got {}",
            h
        )));
    }
    Ok(())
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// 2つの値が許容誤差内で等しいか
    pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }
}
