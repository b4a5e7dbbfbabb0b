use crate::models::common::{KinematicState, SwarmError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// 近傍関係の構築方式
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum NeighborMode {
    /// 自分以外の全ドローンを近傍とする完全グラフ（既定）
    #[default]
    Complete,
    /// XY平面距離が `radius` 以内のドローンを近傍とする空間グリッド
    ///
    /// プランナーの選択が完全グラフと変わらないことを保証できないドローンは、
    /// 完全グラフの近傍に戻します。
    Radius {
        #[serde(rename = "radius_m")]
        radius: f64,
    },
}

/// 近傍グラフ構築器
///
/// 毎ティック、スナップショットから近傍リストを作り直します（追記はしません）。
/// どちらの方式でも自分自身は近傍に含めず、関係は対称で、
/// 各リストはインデックスの昇順に並びます。
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborGraph {
    mode: NeighborMode,
}

impl NeighborGraph {
    pub fn new(mode: NeighborMode) -> Result<Self, SwarmError> {
        if let NeighborMode::Radius { radius } = mode {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(SwarmError::InvalidArgument(format!(
                    "neighbor radius must be positive, got {}",
                    radius
                )));
            }
        }
        Ok(Self { mode })
    }

    pub fn mode(&self) -> NeighborMode {
        self.mode
    }

    /// スナップショットから全ドローンの近傍リストを構築
    ///
    /// # 引数
    ///
    /// * `states` - ティック開始時点の全ドローンの運動状態
    /// * `h` - このティックの時間刻み（半径方式で到達範囲の見積もりに使う）
    ///
    /// # 戻り値
    ///
    /// `states` と同じ長さのベクター。i番目はドローンiの近傍インデックス
    pub fn rebuild(&self, states: &[KinematicState], h: f64) -> Vec<Vec<usize>> {
        match self.mode {
            NeighborMode::Complete => Self::complete(states.len()),
            NeighborMode::Radius { radius } => Self::within_radius(states, radius, h),
        }
    }

    fn complete(count: usize) -> Vec<Vec<usize>> {
        (0..count)
            .map(|i| (0..count).filter(|&j| j != i).collect())
            .collect()
    }

    // セルサイズ = 半径の一様グリッドで周囲9セルのみ走査する。
    //
    // プランナーが評価する移動後の位置は、現在位置から最大 2|v|h 離れる（RK4の第4段）。
    // 最寄りの近傍までの距離を d とすると、d + 4|v|h を超えて離れたドローンが
    // 移動後の最近傍になることはない。この範囲が半径に収まらないドローンは完全グラフに戻す。
    fn within_radius(states: &[KinematicState], radius: f64, h: f64) -> Vec<Vec<usize>> {
        let cell_of = |state: &KinematicState| -> (i64, i64) {
            (
                (state.position.x / radius).floor() as i64,
                (state.position.y / radius).floor() as i64,
            )
        };

        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (index, state) in states.iter().enumerate() {
            grid.entry(cell_of(state)).or_default().push(index);
        }

        let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
        for (i, state) in states.iter().enumerate() {
            let (cx, cy) = cell_of(state);
            let mut in_range: Vec<usize> = Vec::new();
            let mut nearest = f64::INFINITY;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(cell) = grid.get(&(cx + dx, cy + dy)) else {
                        continue;
                    };
                    for &j in cell.iter().filter(|&&j| j != i) {
                        let distance = state.position.distance_to(&states[j].position);
                        if distance <= radius {
                            nearest = nearest.min(distance);
                            in_range.push(j);
                        }
                    }
                }
            }

            let reach = 2.0 * state.velocity.length() * h;
            if nearest + 2.0 * reach > radius {
                in_range = (0..states.len()).filter(|&j| j != i).collect();
            }
            for j in in_range {
                pairs.insert((i.min(j), i.max(j)));
            }
        }

        // 片側だけ完全グラフに戻した場合も関係が対称になるよう両方向に登録する
        let mut neighbors = vec![Vec::new(); states.len()];
        for (a, b) in pairs {
            neighbors[a].push(b);
            neighbors[b].push(a);
        }
        for list in &mut neighbors {
            list.sort_unstable();
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::Vector3D;

    fn states_at(points: &[(f64, f64)]) -> Vec<KinematicState> {
        points
            .iter()
            .map(|&(x, y)| KinematicState::new(Vector3D::new(x, y, 0.0), Vector3D::zero()))
            .collect()
    }

    #[test]
    fn test_complete_graph_excludes_self() {
        let graph = NeighborGraph::default();
        let neighbors = graph.rebuild(&states_at(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]), 0.1);

        assert_eq!(neighbors, vec![vec![1, 2], vec![0, 2], vec![0, 1]]);
    }

    #[test]
    fn test_complete_graph_of_single_drone_is_empty() {
        let graph = NeighborGraph::default();
        assert_eq!(graph.rebuild(&states_at(&[(5.0, 5.0)]), 0.1), vec![Vec::<usize>::new()]);
        assert!(graph.rebuild(&[], 0.1).is_empty());
    }

    #[test]
    fn test_radius_mode_limits_neighbors() {
        let graph = NeighborGraph::new(NeighborMode::Radius { radius: 10.0 }).unwrap();
        let neighbors = graph.rebuild(
            &states_at(&[
                (0.0, 0.0),
                (6.0, 8.0),   // 距離10: 境界上は含む
                (-9.0, -1.0), // 隣のセル
                (50.0, 0.0),
                (53.0, 4.0),
            ]),
            0.1,
        );

        assert_eq!(neighbors[0], vec![1, 2]);
        assert_eq!(neighbors[1], vec![0]);
        assert_eq!(neighbors[2], vec![0]);
        assert_eq!(neighbors[3], vec![4]);
        assert_eq!(neighbors[4], vec![3]);
    }

    #[test]
    fn test_radius_mode_isolated_drone_falls_back_to_complete() {
        let graph = NeighborGraph::new(NeighborMode::Radius { radius: 10.0 }).unwrap();
        let neighbors = graph.rebuild(&states_at(&[(0.0, 0.0), (4.0, 0.0), (100.0, 0.0)]), 0.1);

        assert_eq!(neighbors, vec![vec![1, 2], vec![0, 2], vec![0, 1]]);
    }

    #[test]
    fn test_radius_mode_fast_drone_falls_back_to_complete() {
        let graph = NeighborGraph::new(NeighborMode::Radius { radius: 10.0 }).unwrap();
        let mut states = states_at(&[(0.0, 0.0), (4.0, 0.0), (60.0, 0.0), (63.0, 0.0)]);
        // 4 + 4 * 5 * 1 > 10 なので半径内の近傍だけでは足りない
        states[0].velocity = Vector3D::new(5.0, 0.0, 0.0);

        let neighbors = graph.rebuild(&states, 1.0);
        assert_eq!(neighbors[0], vec![1, 2, 3]);
        assert_eq!(neighbors[1], vec![0]);
        assert_eq!(neighbors[2], vec![0, 3]);
        assert_eq!(neighbors[3], vec![0, 2]);

        // 時間刻みが小さければ半径内で足りる
        let neighbors = graph.rebuild(&states, 0.1);
        assert_eq!(neighbors[0], vec![1]);
        assert_eq!(neighbors[2], vec![3]);
    }

    #[test]
    fn test_radius_mode_is_symmetric() {
        let graph = NeighborGraph::new(NeighborMode::Radius { radius: 7.5 }).unwrap();
        let mut states = states_at(&[
            (0.0, 0.0),
            (3.0, 4.0),
            (-7.0, 2.0),
            (12.0, 12.0),
            (8.0, 9.0),
            (-100.0, 40.0),
        ]);
        states[1].velocity = Vector3D::new(2.0, 1.0, 0.0);
        let neighbors = graph.rebuild(&states, 0.5);

        for (i, list) in neighbors.iter().enumerate() {
            assert!(!list.contains(&i));
            for &j in list {
                assert!(neighbors[j].contains(&i), "{} -> {} is not symmetric", i, j);
            }
        }
    }

    #[test]
    fn test_radius_mode_rejects_non_positive_radius() {
        assert!(NeighborGraph::new(NeighborMode::Radius { radius: 0.0 }).is_err());
        assert!(NeighborGraph::new(NeighborMode::Radius { radius: f64::NAN }).is_err());
    }
}
