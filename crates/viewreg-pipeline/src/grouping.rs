//! Point sets of (possibly grouped) views.

use crate::ViewDescription;
use std::collections::{BTreeMap, HashMap};
use viewreg_core::{Group, Real, ViewId, ViewPoint};

/// Merge the points of several views, dropping points closer than
/// `min_distance` to an already kept one.
///
/// Points are processed in `(view, id)` order, so the earliest view wins. A
/// non-positive `min_distance` only sorts.
pub fn merge_group_points(mut points: Vec<ViewPoint>, min_distance: Real) -> Vec<ViewPoint> {
    points.sort_by_key(|p| (p.view, p.id));
    if min_distance <= 0.0 || !min_distance.is_finite() {
        return points;
    }

    let cell = |p: &ViewPoint| -> [i64; 3] {
        let c = p.world.coords / min_distance;
        [c.x.floor() as i64, c.y.floor() as i64, c.z.floor() as i64]
    };
    let mut grid: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
    let mut kept: Vec<ViewPoint> = Vec::with_capacity(points.len());
    let min2 = min_distance * min_distance;
    for p in points {
        let c = cell(&p);
        let mut close = false;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = grid.get(&[c[0] + dx, c[1] + dy, c[2] + dz]) else {
                        continue;
                    };
                    if bucket.iter().any(|&k| (kept[k].world - p.world).norm_squared() < min2) {
                        close = true;
                        break 'search;
                    }
                }
            }
        }
        if !close {
            grid.entry(c).or_default().push(kept.len());
            kept.push(p);
        }
    }
    kept
}

/// World points of every member of `group`.
///
/// Singleton groups return the view's points unchanged (sorted by id);
/// larger groups are merged with [`merge_group_points`].
pub fn group_points(
    group: &Group,
    views: &BTreeMap<ViewId, &ViewDescription>,
    min_distance: Real,
) -> Vec<ViewPoint> {
    let points: Vec<ViewPoint> = group
        .iter()
        .filter_map(|v| views.get(&v))
        .flat_map(|v| v.world_points())
        .collect();
    if group.len() > 1 {
        merge_group_points(points, min_distance)
    } else {
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewreg_core::{translation, InterestPoint, Pt3, Vec3};

    fn vp(setup: u32, id: u64, x: Real) -> ViewPoint {
        ViewPoint {
            view: ViewId::new(0, setup),
            id,
            world: Pt3::new(x, 0.0, 0.0),
        }
    }

    #[test]
    fn close_points_keep_the_first_view() {
        let merged = merge_group_points(vec![vp(1, 0, 0.2), vp(0, 0, 0.0), vp(0, 1, 10.0)], 1.0);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].view, ViewId::new(0, 0));
        assert_eq!(merged[1].id, 1);
    }

    #[test]
    fn points_across_cell_borders_are_found() {
        let merged = merge_group_points(vec![vp(0, 0, 0.99), vp(1, 0, 1.01)], 0.5);
        assert_eq!(merged.len(), 1);
        let zero = merge_group_points(vec![vp(0, 0, 0.0), vp(1, 0, 0.0)], 0.0);
        assert_eq!(zero.len(), 2);
    }

    #[test]
    fn group_points_are_placed_in_world() {
        let v0 = ViewDescription::new(ViewId::new(0, 0), translation(Vec3::new(5.0, 0.0, 0.0)))
            .with_points(vec![InterestPoint::new(7, Pt3::origin())]);
        let v1 = ViewDescription::new(ViewId::new(0, 1), translation(Vec3::new(5.0, 0.0, 0.0)))
            .with_points(vec![InterestPoint::new(7, Pt3::new(0.1, 0.0, 0.0))]);
        let map = BTreeMap::from([(v0.id, &v0), (v1.id, &v1)]);
        let single = group_points(&Group::single(v1.id), &map, 1.0);
        assert_eq!(single[0].world, Pt3::new(5.1, 0.0, 0.0));
        let both = group_points(&Group::new([v0.id, v1.id]), &map, 1.0);
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].view, v0.id);
    }
}
