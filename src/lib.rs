//! # dronesim
//!
//! 目標地点に向かいながら互いの衝突を回避する質点ドローン群のシミュレーション。
//!
//! - [`models`]: ベクトル、ドローン、近傍グラフ、モーションプランナー
//! - [`simulation`]: スウォーム（ティック単位の駆動）とシミュレーションエンジン
//! - [`scenario`]: YAMLシナリオ設定
//! - [`logging`]: tracingによるログ設定

pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
