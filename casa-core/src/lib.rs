pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 几何判等容差（单位：米）。
    pub const EPSILON: f64 = 1e-9;

    /// 二维点，内部以 `glam::DVec2` 表示，统一使用双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        /// 在容差范围内判断两点是否重合。
        #[inline]
        pub fn approx_eq(self, other: Point2) -> bool {
            self.distance(other) <= EPSILON
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于平移量与方向。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn zero() -> Self {
            Self(DVec2::ZERO)
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 三维点，家具与景观元素在 3D 视图中的位置（y 轴为高度）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维向量，当前主要用于缩放系数。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn splat(value: f64) -> Self {
            Self(DVec3::splat(value))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算项目/实体范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }
    }

    /// 点在线段上的投影结果。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct SegmentProjection {
        /// 沿线段的归一化位置，已限制在 `[0, 1]`。
        pub position: f64,
        /// 原始点到线段的最短距离。
        pub distance: f64,
        pub closest: Point2,
    }

    /// 将点投影到线段上；退化线段（起终点重合）统一投影到起点。
    pub fn project_point_onto_segment(
        point: Point2,
        seg_start: Point2,
        seg_end: Point2,
    ) -> SegmentProjection {
        let start = seg_start.as_vec2();
        let along = seg_end.as_vec2() - start;
        let len_sq = along.length_squared();
        let position = if len_sq <= EPSILON * EPSILON {
            0.0
        } else {
            ((point.as_vec2() - start).dot(along) / len_sq).clamp(0.0, 1.0)
        };
        let closest = Point2::from_vec(start + along * position);
        SegmentProjection {
            position,
            distance: point.distance(closest),
            closest,
        }
    }

    #[inline]
    pub fn distance_to_segment(point: Point2, seg_start: Point2, seg_end: Point2) -> f64 {
        project_point_onto_segment(point, seg_start, seg_end).distance
    }

    /// 捕捉配置的只读视图，角度以度为单位。
    #[derive(Debug, Clone, PartialEq)]
    pub struct SnapSettings {
        pub grid_size: f64,
        pub snap_to_grid: bool,
        pub snap_to_angle: bool,
        pub snap_angles: Vec<f64>,
    }

    impl SnapSettings {
        /// 关闭所有捕捉。
        pub fn disabled() -> Self {
            Self {
                grid_size: 0.0,
                snap_to_grid: false,
                snap_to_angle: false,
                snap_angles: Vec::new(),
            }
        }
    }

    /// 捕捉指针坐标：先对齐网格，再（存在参考点时）约束到最近的角度线上。
    ///
    /// 每个配置角度代表一条经过参考点的直线，因此 `a` 与 `a + 180°` 两个方向都可用。
    pub fn snap_point(point: Point2, settings: &SnapSettings, reference: Option<Point2>) -> Point2 {
        let mut snapped = point;
        if settings.snap_to_grid {
            snapped = snap_to_grid(snapped, settings.grid_size);
        }
        if settings.snap_to_angle {
            if let Some(origin) = reference {
                let constrained = snap_to_angle(snapped, origin, &settings.snap_angles);
                // 网格点本身已落在角度线上时保留网格坐标，避免三角函数噪声。
                if !constrained.approx_eq(snapped) {
                    snapped = constrained;
                }
            }
        }
        snapped
    }

    /// 四舍五入到最近的网格点；网格尺寸非法时原样返回。
    pub fn snap_to_grid(point: Point2, grid_size: f64) -> Point2 {
        if !grid_size.is_finite() || grid_size <= EPSILON {
            return point;
        }
        Point2::new(
            (point.x() / grid_size).round() * grid_size,
            (point.y() / grid_size).round() * grid_size,
        )
    }

    /// 将点投影到经过 `origin` 的最近角度线上。
    pub fn snap_to_angle(point: Point2, origin: Point2, angles_deg: &[f64]) -> Point2 {
        let offset = origin.vector_to(point).as_vec2();
        if offset.length_squared() <= EPSILON * EPSILON {
            return point;
        }
        let mut best: Option<(f64, DVec2)> = None;
        for angle in angles_deg.iter().copied().filter(|angle| angle.is_finite()) {
            let direction = DVec2::from_angle(angle.to_radians());
            let projected = direction * offset.dot(direction);
            let deviation = (offset - projected).length();
            if best.is_none_or(|(current, _)| deviation < current) {
                best = Some((deviation, projected));
            }
        }
        match best {
            Some((_, projected)) => Point2::from_vec(origin.as_vec2() + projected),
            None => point,
        }
    }

    /// 鞋带公式计算的有向面积（逆时针为正）。
    pub fn signed_polygon_area(points: &[Point2]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let twice: f64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.x() * b.y() - b.x() * a.y())
            .sum();
        twice * 0.5
    }

    #[inline]
    pub fn polygon_area(points: &[Point2]) -> f64 {
        signed_polygon_area(points).abs()
    }

    /// 闭合环的周长。
    pub fn polygon_perimeter(points: &[Point2]) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }
        points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.distance(*b))
            .sum()
    }

    pub fn polygon_bounds(points: &[Point2]) -> Option<Bounds2D> {
        if points.is_empty() {
            return None;
        }
        let mut bounds = Bounds2D::empty();
        for point in points {
            bounds.include_point(*point);
        }
        Some(bounds)
    }

    #[inline]
    fn orientation(a: Point2, b: Point2, c: Point2) -> i8 {
        let cross = (b.as_vec2() - a.as_vec2()).perp_dot(c.as_vec2() - a.as_vec2());
        if cross > EPSILON {
            1
        } else if cross < -EPSILON {
            -1
        } else {
            0
        }
    }

    /// 已知三点共线时，判断 `p` 是否落在线段 `a-b` 的范围内。
    #[inline]
    fn within_segment_box(a: Point2, b: Point2, p: Point2) -> bool {
        p.x() >= a.x().min(b.x()) - EPSILON
            && p.x() <= a.x().max(b.x()) + EPSILON
            && p.y() >= a.y().min(b.y()) - EPSILON
            && p.y() <= a.y().max(b.y()) + EPSILON
    }

    /// 线段相交判定，端点接触与共线重叠均视为相交。
    pub fn segments_intersect(a1: Point2, a2: Point2, b1: Point2, b2: Point2) -> bool {
        let d1 = orientation(b1, b2, a1);
        let d2 = orientation(b1, b2, a2);
        let d3 = orientation(a1, a2, b1);
        let d4 = orientation(a1, a2, b2);

        if d1 * d2 < 0 && d3 * d4 < 0 {
            return true;
        }

        (d1 == 0 && within_segment_box(b1, b2, a1))
            || (d2 == 0 && within_segment_box(b1, b2, a2))
            || (d3 == 0 && within_segment_box(a1, a2, b1))
            || (d4 == 0 && within_segment_box(a1, a2, b2))
    }

    /// 判断闭合环是否为简单多边形：至少三个顶点、无零长边、相邻边不折返、
    /// 非相邻边不相交且面积非零。
    pub fn is_simple_polygon(points: &[Point2]) -> bool {
        let n = points.len();
        if n < 3 || !points.iter().all(|point| point.is_finite()) {
            return false;
        }

        for i in 0..n {
            if points[i].approx_eq(points[(i + 1) % n]) {
                return false;
            }
        }

        for i in 0..n {
            let prev = points[(i + n - 1) % n].as_vec2();
            let current = points[i].as_vec2();
            let next = points[(i + 1) % n].as_vec2();
            let incoming = current - prev;
            let outgoing = next - current;
            let collinear = incoming.perp_dot(outgoing).abs()
                <= EPSILON * incoming.length() * outgoing.length();
            if collinear && incoming.dot(outgoing) < 0.0 {
                return false;
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                if segments_intersect(points[i], points[(i + 1) % n], points[j], points[(j + 1) % n])
                {
                    return false;
                }
            }
        }

        polygon_area(points) > EPSILON
    }

    /// 奇偶规则的点在多边形内判定。
    pub fn point_in_polygon(point: Point2, ring: &[Point2]) -> bool {
        let n = ring.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = ring[i];
            let pj = ring[j];
            if (pi.y() > point.y()) != (pj.y() > point.y()) {
                let x_cross = (pj.x() - pi.x()) * (point.y() - pi.y()) / (pj.y() - pi.y()) + pi.x();
                if point.x() < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn square(size: f64) -> Vec<Point2> {
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(size, 0.0),
                Point2::new(size, size),
                Point2::new(0.0, size),
            ]
        }

        #[test]
        fn projection_clamps_and_measures_distance() {
            let start = Point2::new(0.0, 0.0);
            let end = Point2::new(5.0, 0.0);

            let hit = project_point_onto_segment(Point2::new(2.4, 0.1), start, end);
            assert!((hit.position - 0.48).abs() < 1e-9);
            assert!((hit.distance - 0.1).abs() < 1e-9);
            assert!((hit.closest.x() - 2.4).abs() < 1e-9);

            let before = project_point_onto_segment(Point2::new(-3.0, 4.0), start, end);
            assert_eq!(before.position, 0.0);
            assert!((before.distance - 5.0).abs() < 1e-9);

            let after = project_point_onto_segment(Point2::new(9.0, 0.0), start, end);
            assert_eq!(after.position, 1.0);
            assert!((after.distance - 4.0).abs() < 1e-9);
        }

        #[test]
        fn projection_onto_degenerate_segment_uses_start() {
            let p = Point2::new(1.0, 1.0);
            let hit = project_point_onto_segment(Point2::new(4.0, 5.0), p, p);
            assert_eq!(hit.position, 0.0);
            assert!((hit.distance - 5.0).abs() < 1e-9);
        }

        #[test]
        fn grid_snapping_rounds_each_coordinate() {
            let settings = SnapSettings {
                grid_size: 0.5,
                snap_to_grid: true,
                snap_to_angle: false,
                snap_angles: Vec::new(),
            };
            let snapped = snap_point(Point2::new(1.23, 1.77), &settings, None);
            assert_eq!(snapped, Point2::new(1.0, 2.0));

            // 非法网格尺寸时保持原值
            let untouched = snap_to_grid(Point2::new(1.23, 1.77), 0.0);
            assert_eq!(untouched, Point2::new(1.23, 1.77));
        }

        #[test]
        fn angle_snapping_uses_reference_point() {
            let settings = SnapSettings {
                grid_size: 0.5,
                snap_to_grid: false,
                snap_to_angle: true,
                snap_angles: vec![0.0, 45.0, 90.0],
            };
            let origin = Point2::new(1.0, 1.0);

            let near_horizontal = snap_point(Point2::new(5.0, 1.3), &settings, Some(origin));
            assert!((near_horizontal.x() - 5.0).abs() < 1e-9);
            assert!((near_horizontal.y() - 1.0).abs() < 1e-9);

            let near_diagonal = snap_point(Point2::new(3.1, 2.9), &settings, Some(origin));
            assert!((near_diagonal.x() - 3.0).abs() < 1e-9);
            assert!((near_diagonal.y() - 3.0).abs() < 1e-9);

            // 反方向同样落在 0° 线上
            let backwards = snap_point(Point2::new(-2.0, 1.2), &settings, Some(origin));
            assert!((backwards.y() - 1.0).abs() < 1e-9);

            // 无参考点时不做角度约束
            let free = snap_point(Point2::new(3.1, 2.9), &settings, None);
            assert_eq!(free, Point2::new(3.1, 2.9));
        }

        #[test]
        fn grid_then_angle_keeps_exact_grid_points() {
            let settings = SnapSettings {
                grid_size: 0.5,
                snap_to_grid: true,
                snap_to_angle: true,
                snap_angles: vec![0.0, 90.0],
            };
            let snapped = snap_point(Point2::new(0.1, 3.2), &settings, Some(Point2::new(0.0, 0.0)));
            assert_eq!(snapped, Point2::new(0.0, 3.0));
        }

        #[test]
        fn shoelace_area_and_perimeter() {
            let ring = square(4.0);
            assert!((polygon_area(&ring) - 16.0).abs() < 1e-9);
            assert!((polygon_perimeter(&ring) - 16.0).abs() < 1e-9);

            let mut clockwise = ring.clone();
            clockwise.reverse();
            assert!(signed_polygon_area(&clockwise) < 0.0);
            assert!((polygon_area(&clockwise) - 16.0).abs() < 1e-9);

            let triangle = [
                Point2::new(0.0, 0.0),
                Point2::new(3.0, 0.0),
                Point2::new(0.0, 4.0),
            ];
            assert!((polygon_area(&triangle) - 6.0).abs() < 1e-9);
            assert!((polygon_perimeter(&triangle) - 12.0).abs() < 1e-9);

            assert_eq!(polygon_area(&triangle[..2]), 0.0);
        }

        #[test]
        fn segment_intersection_cases() {
            let o = Point2::new(0.0, 0.0);
            assert!(segments_intersect(
                o,
                Point2::new(2.0, 2.0),
                Point2::new(0.0, 2.0),
                Point2::new(2.0, 0.0)
            ));
            assert!(!segments_intersect(
                o,
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
                Point2::new(1.0, 1.0)
            ));
            // 端点接触
            assert!(segments_intersect(
                o,
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0)
            ));
            // 共线重叠
            assert!(segments_intersect(
                o,
                Point2::new(2.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(3.0, 0.0)
            ));
            // 共线但分离
            assert!(!segments_intersect(
                o,
                Point2::new(1.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(3.0, 0.0)
            ));
        }

        #[test]
        fn simple_polygon_detection() {
            assert!(is_simple_polygon(&square(2.0)));

            let bow_tie = [
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 2.0),
                Point2::new(2.0, 0.0),
                Point2::new(0.0, 2.0),
            ];
            assert!(!is_simple_polygon(&bow_tie));

            let collinear = [
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(2.0, 0.0),
            ];
            assert!(!is_simple_polygon(&collinear));

            let duplicate_vertex = [
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ];
            assert!(!is_simple_polygon(&duplicate_vertex));

            let fold_back = [
                Point2::new(0.0, 0.0),
                Point2::new(3.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 2.0),
            ];
            assert!(!is_simple_polygon(&fold_back));

            let l_shape = [
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 2.0),
                Point2::new(2.0, 2.0),
                Point2::new(2.0, 4.0),
                Point2::new(0.0, 4.0),
            ];
            assert!(is_simple_polygon(&l_shape));
            assert!((polygon_area(&l_shape) - 12.0).abs() < 1e-9);

            assert!(!is_simple_polygon(&square(1.0)[..2]));
        }

        #[test]
        fn point_in_polygon_even_odd() {
            let l_shape = [
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 2.0),
                Point2::new(2.0, 2.0),
                Point2::new(2.0, 4.0),
                Point2::new(0.0, 4.0),
            ];
            assert!(point_in_polygon(Point2::new(1.0, 1.0), &l_shape));
            assert!(point_in_polygon(Point2::new(1.0, 3.0), &l_shape));
            assert!(!point_in_polygon(Point2::new(3.0, 3.0), &l_shape));
            assert!(!point_in_polygon(Point2::new(-1.0, 1.0), &l_shape));
            assert!(!point_in_polygon(Point2::new(1.0, 1.0), &l_shape[..2]));
        }

        #[test]
        fn bounds_accumulate_points() {
            let bounds = polygon_bounds(&square(3.0)).expect("bounds");
            assert_eq!(bounds.min(), Point2::new(0.0, 0.0));
            assert_eq!(bounds.max(), Point2::new(3.0, 3.0));
            assert!((bounds.width() - 3.0).abs() < f64::EPSILON);
            assert_eq!(bounds.center(), Point2::new(1.5, 1.5));
            assert!(polygon_bounds(&[]).is_none());
        }
    }
}

pub mod model {
    use std::collections::BTreeMap;
    use std::f64::consts::TAU;
    use std::fmt;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::geometry::{
        self, Bounds2D, Point2, Point3, SegmentProjection, SnapSettings, Vector2, Vector3,
    };

    /// 不透明的实体标识，序列化为字符串。
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EntityId(String);

    impl EntityId {
        #[inline]
        pub fn new(raw: impl Into<String>) -> Self {
            Self(raw.into())
        }

        #[inline]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for EntityId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// 拥有 `EntityId` 的实体。
    pub trait Identified {
        fn id(&self) -> &EntityId;
    }

    /// 以 ID 为键的实体集合，序列化时展开为数组。
    pub type EntityMap<T> = BTreeMap<EntityId, T>;

    mod entity_seq {
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        use super::{EntityMap, Identified};

        pub fn serialize<S, T>(map: &EntityMap<T>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            T: Serialize,
        {
            serializer.collect_seq(map.values())
        }

        pub fn deserialize<'de, D, T>(deserializer: D) -> Result<EntityMap<T>, D::Error>
        where
            D: Deserializer<'de>,
            T: Deserialize<'de> + Identified,
        {
            let items = Vec::<T>::deserialize(deserializer)?;
            let mut map = EntityMap::new();
            for item in items {
                let id = item.id().clone();
                if map.insert(id.clone(), item).is_some() {
                    return Err(D::Error::custom(format!("duplicate id `{id}`")));
                }
            }
            Ok(map)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("未知的{kind}取值: {value}")]
    pub struct ParseEnumError {
        pub kind: &'static str,
        pub value: String,
    }

    /// 显示单位。模型内部始终以米存储，单位只影响格式化输出。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Unit {
        #[default]
        Meters,
        Centimeters,
        Feet,
        Inches,
    }

    impl Unit {
        /// 每米对应的显示单位数量。
        pub fn per_meter(self) -> f64 {
            match self {
                Unit::Meters => 1.0,
                Unit::Centimeters => 100.0,
                Unit::Feet => 1.0 / 0.3048,
                Unit::Inches => 1.0 / 0.0254,
            }
        }

        pub fn suffix(self) -> &'static str {
            match self {
                Unit::Meters => "m",
                Unit::Centimeters => "cm",
                Unit::Feet => "ft",
                Unit::Inches => "in",
            }
        }

        pub fn format_length(self, meters: f64) -> String {
            format!("{:.2} {}", meters * self.per_meter(), self.suffix())
        }

        pub fn format_area(self, square_meters: f64) -> String {
            let factor = self.per_meter();
            format!("{:.2} {}²", square_meters * factor * factor, self.suffix())
        }
    }

    impl FromStr for Unit {
        type Err = ParseEnumError;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            match value.trim().to_ascii_lowercase().as_str() {
                "meters" | "m" => Ok(Unit::Meters),
                "centimeters" | "cm" => Ok(Unit::Centimeters),
                "feet" | "ft" => Ok(Unit::Feet),
                "inches" | "in" => Ok(Unit::Inches),
                _ => Err(ParseEnumError {
                    kind: "单位",
                    value: value.to_string(),
                }),
            }
        }
    }

    /// 项目级设置：显示单位、网格与捕捉、新建墙体的默认尺寸。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct ProjectSettings {
        pub unit: Unit,
        pub grid_size: f64,
        pub show_grid: bool,
        pub show_axes: bool,
        pub snap_to_grid: bool,
        pub snap_to_angle: bool,
        pub snap_angles: Vec<f64>,
        pub show_measurements: bool,
        pub default_wall_height: f64,
        pub default_wall_thickness: f64,
        pub terrain_size: Vector2,
    }

    impl Default for ProjectSettings {
        fn default() -> Self {
            Self {
                unit: Unit::Meters,
                grid_size: 0.5,
                show_grid: true,
                show_axes: true,
                snap_to_grid: true,
                snap_to_angle: true,
                snap_angles: vec![0.0, 45.0, 90.0, 135.0],
                show_measurements: true,
                default_wall_height: 2.8,
                default_wall_thickness: 0.15,
                terrain_size: Vector2::new(12.0, 15.0),
            }
        }
    }

    impl ProjectSettings {
        pub fn snap_settings(&self) -> SnapSettings {
            SnapSettings {
                grid_size: self.grid_size,
                snap_to_grid: self.snap_to_grid,
                snap_to_angle: self.snap_to_angle,
                snap_angles: self.snap_angles.clone(),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Wall {
        pub id: EntityId,
        pub start: Point2,
        pub end: Point2,
        pub height: f64,
        pub thickness: f64,
        pub color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub material: Option<String>,
        #[serde(default)]
        pub has_baseboard: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub baseboard_height: Option<f64>,
    }

    impl Wall {
        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance(self.end)
        }

        /// 按归一化位置取墙中线上的点。
        #[inline]
        pub fn point_at(&self, position: f64) -> Point2 {
            Point2::from_vec(self.start.as_vec2().lerp(self.end.as_vec2(), position))
        }

        #[inline]
        pub fn project(&self, point: Point2) -> SegmentProjection {
            geometry::project_point_onto_segment(point, self.start, self.end)
        }

        pub fn translate(&mut self, delta: Vector2) {
            self.start = self.start.translate(delta);
            self.end = self.end.translate(delta);
        }

        pub fn apply_props(&mut self, props: &WallProps) {
            self.height = props.height;
            self.thickness = props.thickness;
            self.color = props.color.clone();
            self.material = props.material.clone();
        }
    }

    impl Identified for Wall {
        fn id(&self) -> &EntityId {
            &self.id
        }
    }

    /// 墙体可编辑属性。
    #[derive(Debug, Clone, PartialEq)]
    pub struct WallProps {
        pub height: f64,
        pub thickness: f64,
        pub color: String,
        pub material: Option<String>,
    }

    impl WallProps {
        pub fn from_settings(settings: &ProjectSettings) -> Self {
            Self {
                height: settings.default_wall_height,
                thickness: settings.default_wall_thickness,
                ..Self::default()
            }
        }
    }

    impl Default for WallProps {
        fn default() -> Self {
            Self {
                height: 2.8,
                thickness: 0.15,
                color: "#e8e4dc".to_string(),
                material: None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum RoomType {
        Living,
        Kitchen,
        Bedroom,
        Bathroom,
        Dining,
        Office,
        Garage,
        Hallway,
        Storage,
        Balcony,
        Garden,
        #[default]
        Other,
    }

    impl RoomType {
        pub fn label(self) -> &'static str {
            match self {
                RoomType::Living => "living",
                RoomType::Kitchen => "kitchen",
                RoomType::Bedroom => "bedroom",
                RoomType::Bathroom => "bathroom",
                RoomType::Dining => "dining",
                RoomType::Office => "office",
                RoomType::Garage => "garage",
                RoomType::Hallway => "hallway",
                RoomType::Storage => "storage",
                RoomType::Balcony => "balcony",
                RoomType::Garden => "garden",
                RoomType::Other => "other",
            }
        }
    }

    /// 房间多边形。`area` 与 `perimeter` 是 `points` 的纯函数，
    /// 只能通过 [`Room::set_points`] 间接更新。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", from = "RoomRecord")]
    pub struct Room {
        pub id: EntityId,
        pub name: String,
        points: Vec<Point2>,
        pub height: f64,
        pub color: String,
        area: f64,
        perimeter: f64,
        #[serde(rename = "type")]
        pub room_type: RoomType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub ceiling_height: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub floor_material: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub wall_material: Option<String>,
    }

    /// 反序列化中间结构，缓存的面积/周长字段被忽略并重新计算。
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RoomRecord {
        id: EntityId,
        #[serde(default)]
        name: String,
        points: Vec<Point2>,
        #[serde(default = "RoomRecord::default_height")]
        height: f64,
        #[serde(default = "RoomRecord::default_color")]
        color: String,
        #[serde(rename = "type", default)]
        room_type: RoomType,
        #[serde(default)]
        ceiling_height: Option<f64>,
        #[serde(default)]
        floor_material: Option<String>,
        #[serde(default)]
        wall_material: Option<String>,
    }

    impl RoomRecord {
        fn default_height() -> f64 {
            2.8
        }

        fn default_color() -> String {
            "#f5f1e8".to_string()
        }
    }

    impl From<RoomRecord> for Room {
        fn from(record: RoomRecord) -> Self {
            let mut room = Room::new(
                record.id,
                record.name,
                record.points,
                record.room_type,
                record.height,
            );
            room.color = record.color;
            room.ceiling_height = record.ceiling_height;
            room.floor_material = record.floor_material;
            room.wall_material = record.wall_material;
            room
        }
    }

    impl Room {
        pub fn new(
            id: EntityId,
            name: impl Into<String>,
            points: Vec<Point2>,
            room_type: RoomType,
            height: f64,
        ) -> Self {
            let mut room = Self {
                id,
                name: name.into(),
                points: Vec::new(),
                height,
                color: RoomRecord::default_color(),
                area: 0.0,
                perimeter: 0.0,
                room_type,
                ceiling_height: None,
                floor_material: None,
                wall_material: None,
            };
            room.set_points(points);
            room
        }

        #[inline]
        pub fn points(&self) -> &[Point2] {
            &self.points
        }

        #[inline]
        pub fn area(&self) -> f64 {
            self.area
        }

        #[inline]
        pub fn perimeter(&self) -> f64 {
            self.perimeter
        }

        /// 替换顶点并同步刷新面积与周长。不做合法性校验，校验由模型仓库负责。
        pub fn set_points(&mut self, points: Vec<Point2>) {
            self.area = geometry::polygon_area(&points);
            self.perimeter = geometry::polygon_perimeter(&points);
            self.points = points;
        }

        pub fn translated(&self, delta: Vector2) -> Vec<Point2> {
            self.points.iter().map(|p| p.translate(delta)).collect()
        }

        #[inline]
        pub fn contains(&self, point: Point2) -> bool {
            geometry::point_in_polygon(point, &self.points)
        }

        #[inline]
        pub fn bounds(&self) -> Option<Bounds2D> {
            geometry::polygon_bounds(&self.points)
        }
    }

    impl Identified for Room {
        fn id(&self) -> &EntityId {
            &self.id
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum OpeningKind {
        Door,
        Window,
    }

    impl fmt::Display for OpeningKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                OpeningKind::Door => f.write_str("door"),
                OpeningKind::Window => f.write_str("window"),
            }
        }
    }

    /// 锚定在墙上的洞口（门、窗）。
    pub trait Opening: Identified {
        fn kind(&self) -> OpeningKind;
        fn wall_id(&self) -> &EntityId;
        fn position(&self) -> f64;
        fn width(&self) -> f64;
        fn set_position(&mut self, position: f64);

        /// 洞口沿墙方向占据的区间，单位与墙长一致。
        fn footprint(&self, wall_length: f64) -> (f64, f64) {
            let center = self.position() * wall_length;
            let half = self.width() * 0.5;
            (center - half, center + half)
        }

        /// 在给定墙长下，洞口是否完全落在墙体范围内。
        fn fits_within(&self, wall_length: f64) -> bool {
            let (from, to) = self.footprint(wall_length);
            (0.0..=1.0).contains(&self.position())
                && from >= -geometry::EPSILON
                && to <= wall_length + geometry::EPSILON
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DoorType {
        #[default]
        Single,
        Double,
        Pocket,
        Sliding,
        Folding,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DoorSwing {
        #[default]
        Left,
        Right,
        Sliding,
        Pocket,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Door {
        pub id: EntityId,
        pub wall_id: EntityId,
        pub position: f64,
        pub width: f64,
        pub height: f64,
        #[serde(rename = "type", default)]
        pub door_type: DoorType,
        #[serde(default)]
        pub swing: DoorSwing,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub material: Option<String>,
    }

    impl Identified for Door {
        fn id(&self) -> &EntityId {
            &self.id
        }
    }

    impl Opening for Door {
        fn kind(&self) -> OpeningKind {
            OpeningKind::Door
        }

        fn wall_id(&self) -> &EntityId {
            &self.wall_id
        }

        fn position(&self) -> f64 {
            self.position
        }

        fn width(&self) -> f64 {
            self.width
        }

        fn set_position(&mut self, position: f64) {
            self.position = position;
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum WindowType {
        Single,
        #[default]
        Double,
        Sliding,
        Casement,
        Fixed,
        Bay,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Window {
        pub id: EntityId,
        pub wall_id: EntityId,
        pub position: f64,
        pub width: f64,
        pub height: f64,
        pub sill_height: f64,
        #[serde(rename = "type", default)]
        pub window_type: WindowType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub material: Option<String>,
    }

    impl Identified for Window {
        fn id(&self) -> &EntityId {
            &self.id
        }
    }

    impl Opening for Window {
        fn kind(&self) -> OpeningKind {
            OpeningKind::Window
        }

        fn wall_id(&self) -> &EntityId {
            &self.wall_id
        }

        fn position(&self) -> f64 {
            self.position
        }

        fn width(&self) -> f64 {
            self.width
        }

        fn set_position(&mut self, position: f64) {
            self.position = position;
        }
    }

    /// 门的可配置属性。
    #[derive(Debug, Clone, PartialEq)]
    pub struct DoorProps {
        pub width: f64,
        pub height: f64,
        pub door_type: DoorType,
        pub swing: DoorSwing,
        pub material: Option<String>,
    }

    impl Default for DoorProps {
        fn default() -> Self {
            Self {
                width: 0.9,
                height: 2.1,
                door_type: DoorType::Single,
                swing: DoorSwing::Left,
                material: None,
            }
        }
    }

    /// 窗的可配置属性。
    #[derive(Debug, Clone, PartialEq)]
    pub struct WindowProps {
        pub width: f64,
        pub height: f64,
        pub sill_height: f64,
        pub window_type: WindowType,
        pub material: Option<String>,
    }

    impl Default for WindowProps {
        fn default() -> Self {
            Self {
                width: 1.2,
                height: 1.2,
                sill_height: 1.0,
                window_type: WindowType::Double,
                material: None,
            }
        }
    }

    /// 新建洞口时的规格，变体决定洞口种类。
    #[derive(Debug, Clone, PartialEq)]
    pub enum OpeningSpec {
        Door(DoorProps),
        Window(WindowProps),
    }

    impl OpeningSpec {
        pub fn kind(&self) -> OpeningKind {
            match self {
                OpeningSpec::Door(_) => OpeningKind::Door,
                OpeningSpec::Window(_) => OpeningKind::Window,
            }
        }

        pub fn width(&self) -> f64 {
            match self {
                OpeningSpec::Door(props) => props.width,
                OpeningSpec::Window(props) => props.width,
            }
        }

        pub fn height(&self) -> f64 {
            match self {
                OpeningSpec::Door(props) => props.height,
                OpeningSpec::Window(props) => props.height,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum FurnitureCategory {
        #[default]
        Seating,
        Tables,
        Storage,
        Beds,
        Lighting,
        Appliances,
        Decor,
        Plants,
        Electronics,
        Kitchen,
        Bathroom,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Dimensions {
        pub width: f64,
        pub height: f64,
        pub depth: f64,
    }

    impl Dimensions {
        pub fn new(width: f64, height: f64, depth: f64) -> Self {
            Self {
                width,
                height,
                depth,
            }
        }

        pub fn is_positive(&self) -> bool {
            [self.width, self.height, self.depth]
                .iter()
                .all(|value| value.is_finite() && *value > 0.0)
        }
    }

    /// 自由摆放的家具。平面坐标 (x, y) 对应 3D 坐标 (x, z)，`position.y` 为离地高度。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Furniture {
        pub id: EntityId,
        pub name: String,
        pub category: FurnitureCategory,
        pub position: Point3,
        /// 绕竖直轴的旋转（弧度）。
        pub rotation: f64,
        pub scale: Vector3,
        pub color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub material: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub model_url: Option<String>,
        pub dimensions: Dimensions,
    }

    impl Furniture {
        #[inline]
        pub fn plan_position(&self) -> Point2 {
            Point2::new(self.position.x(), self.position.z())
        }

        /// 平面投影下的半宽与半深（含缩放）。
        fn half_extents(&self) -> (f64, f64) {
            (
                self.dimensions.width * self.scale.x().abs() * 0.5,
                self.dimensions.depth * self.scale.z().abs() * 0.5,
            )
        }

        /// 判断平面点是否落在旋转后的家具占地矩形内。
        pub fn footprint_contains(&self, point: Point2) -> bool {
            let offset = self.plan_position().vector_to(point);
            let (sin, cos) = self.rotation.sin_cos();
            let local_x = offset.x() * cos + offset.y() * sin;
            let local_y = -offset.x() * sin + offset.y() * cos;
            let (half_width, half_depth) = self.half_extents();
            local_x.abs() <= half_width + geometry::EPSILON
                && local_y.abs() <= half_depth + geometry::EPSILON
        }

        pub fn footprint_bounds(&self) -> Bounds2D {
            let (half_width, half_depth) = self.half_extents();
            let (sin, cos) = self.rotation.sin_cos();
            let center = self.plan_position().as_vec2();
            let mut bounds = Bounds2D::empty();
            for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let lx = sx * half_width;
                let ly = sy * half_depth;
                let corner = glam::DVec2::new(lx * cos - ly * sin, lx * sin + ly * cos);
                bounds.include_point(Point2::from_vec(center + corner));
            }
            bounds
        }

        pub fn translate(&mut self, delta: Vector2) {
            self.position = Point3::new(
                self.position.x() + delta.x(),
                self.position.y(),
                self.position.z() + delta.y(),
            );
        }

        /// 设置旋转角并规整到 `[0, 2π)`。
        pub fn set_rotation(&mut self, rotation: f64) {
            self.rotation = rotation.rem_euclid(TAU);
        }
    }

    impl Identified for Furniture {
        fn id(&self) -> &EntityId {
            &self.id
        }
    }

    /// 新建家具时的模板。
    #[derive(Debug, Clone, PartialEq)]
    pub struct FurnitureSpec {
        pub name: String,
        pub category: FurnitureCategory,
        pub dimensions: Dimensions,
        pub color: String,
        pub material: Option<String>,
        pub model_url: Option<String>,
    }

    impl Default for FurnitureSpec {
        fn default() -> Self {
            Self {
                name: "Sofa".to_string(),
                category: FurnitureCategory::Seating,
                dimensions: Dimensions::new(2.0, 0.85, 0.9),
                color: "#8b7355".to_string(),
                material: None,
                model_url: None,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Terrain {
        pub size: Vector2,
        #[serde(default)]
        pub elevation: Vec<Vec<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub texture: Option<String>,
    }

    impl Terrain {
        /// 高程网格是否为规则矩形且数值有限。
        pub fn is_regular(&self) -> bool {
            let Some(first) = self.elevation.first() else {
                return true;
            };
            self.elevation
                .iter()
                .all(|row| row.len() == first.len() && row.iter().all(|value| value.is_finite()))
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum LandscapingKind {
        Tree,
        Bush,
        Flower,
        Grass,
        Path,
        Deck,
        Pool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LandscapingElement {
        pub id: EntityId,
        #[serde(rename = "type")]
        pub kind: LandscapingKind,
        pub position: Point3,
        pub scale: Vector3,
        pub rotation: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Exterior {
        pub terrain_size: Vector2,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub terrain: Option<Terrain>,
        #[serde(default)]
        pub landscaping: Vec<LandscapingElement>,
    }

    impl Default for Exterior {
        fn default() -> Self {
            Self {
                terrain_size: Vector2::new(12.0, 15.0),
                terrain: None,
                landscaping: Vec::new(),
            }
        }
    }

    /// 新建项目时的参数。
    #[derive(Debug, Clone, PartialEq)]
    pub struct NewProjectOptions {
        pub name: String,
        pub description: String,
        pub unit: Unit,
        pub wall_height: f64,
        pub wall_thickness: f64,
        pub terrain_size: Vector2,
    }

    impl Default for NewProjectOptions {
        fn default() -> Self {
            let settings = ProjectSettings::default();
            Self {
                name: "Untitled".to_string(),
                description: String::new(),
                unit: settings.unit,
                wall_height: settings.default_wall_height,
                wall_thickness: settings.default_wall_thickness,
                terrain_size: settings.terrain_size,
            }
        }
    }

    /// 项目聚合根：持有全部实体集合与设置，是持久化与撤销的基本单位。
    ///
    /// 字段对外可读；运行期的修改只应通过引擎层的模型仓库进行。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Project {
        pub id: Uuid,
        pub name: String,
        #[serde(default)]
        pub description: String,
        #[serde(with = "time::serde::rfc3339")]
        pub created_at: OffsetDateTime,
        #[serde(with = "time::serde::rfc3339")]
        pub updated_at: OffsetDateTime,
        #[serde(default)]
        pub settings: ProjectSettings,
        #[serde(default, with = "entity_seq")]
        pub walls: EntityMap<Wall>,
        #[serde(default, with = "entity_seq")]
        pub rooms: EntityMap<Room>,
        #[serde(default, with = "entity_seq")]
        pub doors: EntityMap<Door>,
        #[serde(default, with = "entity_seq")]
        pub windows: EntityMap<Window>,
        #[serde(default, with = "entity_seq")]
        pub furniture: EntityMap<Furniture>,
        #[serde(default)]
        pub exterior: Exterior,
        #[serde(default)]
        pub tags: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub thumbnail: Option<String>,
        #[serde(skip)]
        next_entity_id: u64,
    }

    impl Project {
        pub fn new(options: NewProjectOptions) -> Self {
            let now = OffsetDateTime::now_utc();
            let settings = ProjectSettings {
                unit: options.unit,
                default_wall_height: options.wall_height,
                default_wall_thickness: options.wall_thickness,
                terrain_size: options.terrain_size,
                ..ProjectSettings::default()
            };
            Self {
                id: Uuid::new_v4(),
                name: options.name,
                description: options.description,
                created_at: now,
                updated_at: now,
                exterior: Exterior {
                    terrain_size: options.terrain_size,
                    ..Exterior::default()
                },
                settings,
                walls: EntityMap::new(),
                rooms: EntityMap::new(),
                doors: EntityMap::new(),
                windows: EntityMap::new(),
                furniture: EntityMap::new(),
                tags: Vec::new(),
                thumbnail: None,
                next_entity_id: 1,
            }
        }

        /// 分配形如 `wall-3` 的新 ID，跳过已存在的 ID（兼容外部载入的数据）。
        pub fn allocate_id(&mut self, kind: &str) -> EntityId {
            loop {
                let candidate = EntityId::new(format!("{kind}-{}", self.next_entity_id.max(1)));
                self.next_entity_id = self.next_entity_id.max(1) + 1;
                if !self.contains_id(&candidate) {
                    return candidate;
                }
            }
        }

        pub fn contains_id(&self, id: &EntityId) -> bool {
            self.walls.contains_key(id)
                || self.rooms.contains_key(id)
                || self.doors.contains_key(id)
                || self.windows.contains_key(id)
                || self.furniture.contains_key(id)
                || self.exterior.landscaping.iter().any(|item| &item.id == id)
        }

        /// 依附于指定墙体的门。
        pub fn doors_on<'a>(&'a self, wall_id: &'a EntityId) -> impl Iterator<Item = &'a Door> + 'a {
            self.doors.values().filter(move |door| &door.wall_id == wall_id)
        }

        /// 依附于指定墙体的窗。
        pub fn windows_on<'a>(
            &'a self,
            wall_id: &'a EntityId,
        ) -> impl Iterator<Item = &'a Window> + 'a {
            self.windows
                .values()
                .filter(move |window| &window.wall_id == wall_id)
        }

        pub fn entity_count(&self) -> usize {
            self.walls.len()
                + self.rooms.len()
                + self.doors.len()
                + self.windows.len()
                + self.furniture.len()
        }

        /// 平面范围（墙、房间、家具）。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for wall in self.walls.values() {
                bounds.include_point(wall.start);
                bounds.include_point(wall.end);
            }
            for room in self.rooms.values() {
                if let Some(room_bounds) = room.bounds() {
                    bounds.include_bounds(&room_bounds);
                }
            }
            for item in self.furniture.values() {
                bounds.include_bounds(&item.footprint_bounds());
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        pub fn total_room_area(&self) -> f64 {
            self.rooms.values().map(Room::area).sum()
        }

        #[inline]
        pub fn touch(&mut self) {
            self.updated_at = OffsetDateTime::now_utc();
        }
    }

    impl Default for Project {
        fn default() -> Self {
            Self::new(NewProjectOptions::default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::FRAC_PI_2;

        fn wall(id: &str, start: Point2, end: Point2) -> Wall {
            Wall {
                id: EntityId::new(id),
                start,
                end,
                height: 2.8,
                thickness: 0.15,
                color: "#ffffff".to_string(),
                material: None,
                has_baseboard: false,
                baseboard_height: None,
            }
        }

        #[test]
        fn room_derives_area_and_perimeter_from_points() {
            let mut room = Room::new(
                EntityId::new("room-1"),
                "Sala",
                vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(4.0, 0.0),
                    Point2::new(4.0, 3.0),
                    Point2::new(0.0, 3.0),
                ],
                RoomType::Living,
                2.8,
            );
            assert!((room.area() - 12.0).abs() < 1e-9);
            assert!((room.perimeter() - 14.0).abs() < 1e-9);

            room.set_points(vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 2.0),
            ]);
            assert!((room.area() - 2.0).abs() < 1e-9);
            assert!(room.contains(Point2::new(1.5, 0.5)));
            assert!(!room.contains(Point2::new(0.5, 1.5)));
        }

        #[test]
        fn room_deserialization_recomputes_cached_values() {
            let json = r##"{
                "id": "room-9",
                "name": "Quarto",
                "points": [[0.0, 0.0], [3.0, 0.0], [3.0, 3.0], [0.0, 3.0]],
                "height": 2.7,
                "color": "#ffeedd",
                "area": 999.0,
                "perimeter": -1.0,
                "type": "bedroom"
            }"##;
            let room: Room = serde_json::from_str(json).expect("room json");
            assert_eq!(room.room_type, RoomType::Bedroom);
            assert!((room.area() - 9.0).abs() < 1e-9);
            assert!((room.perimeter() - 12.0).abs() < 1e-9);

            let value = serde_json::to_value(&room).expect("serialize room");
            assert_eq!(value["type"], "bedroom");
            assert_eq!(value["area"], 9.0);
        }

        #[test]
        fn opening_footprint_respects_wall_span() {
            let mut door = Door {
                id: EntityId::new("door-1"),
                wall_id: EntityId::new("wall-1"),
                position: 0.5,
                width: 0.9,
                height: 2.1,
                door_type: DoorType::Single,
                swing: DoorSwing::Left,
                material: None,
            };
            let (from, to) = door.footprint(5.0);
            assert!((from - 2.05).abs() < 1e-9);
            assert!((to - 2.95).abs() < 1e-9);
            assert!(door.fits_within(5.0));

            door.set_position(0.05);
            assert!(!door.fits_within(5.0));
            assert!(!door.fits_within(0.5));
        }

        #[test]
        fn allocate_id_skips_existing_entries() {
            let mut project = Project::default();
            let taken = EntityId::new("wall-1");
            project.walls.insert(
                taken.clone(),
                wall("wall-1", Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)),
            );
            let next = project.allocate_id("wall");
            assert_eq!(next.as_str(), "wall-2");
            let room = project.allocate_id("room");
            assert_eq!(room.as_str(), "room-3");
            assert!(project.contains_id(&taken));
        }

        #[test]
        fn furniture_footprint_follows_rotation() {
            let mut sofa = Furniture {
                id: EntityId::new("furniture-1"),
                name: "Sofa".to_string(),
                category: FurnitureCategory::Seating,
                position: Point3::new(2.0, 0.0, 2.0),
                rotation: 0.0,
                scale: Vector3::splat(1.0),
                color: "#000000".to_string(),
                material: None,
                model_url: None,
                dimensions: Dimensions::new(2.0, 0.8, 1.0),
            };
            assert!(sofa.footprint_contains(Point2::new(2.9, 2.0)));
            assert!(!sofa.footprint_contains(Point2::new(2.0, 2.9)));

            sofa.set_rotation(FRAC_PI_2);
            assert!(!sofa.footprint_contains(Point2::new(2.9, 2.0)));
            assert!(sofa.footprint_contains(Point2::new(2.0, 2.9)));

            let bounds = sofa.footprint_bounds();
            assert!((bounds.width() - 1.0).abs() < 1e-9);
            assert!((bounds.height() - 2.0).abs() < 1e-9);

            sofa.translate(Vector2::new(1.0, -1.0));
            assert_eq!(sofa.plan_position(), Point2::new(3.0, 1.0));
        }

        #[test]
        fn unit_formatting_only_affects_display() {
            assert_eq!(Unit::Meters.format_length(2.5), "2.50 m");
            assert_eq!(Unit::Centimeters.format_length(2.5), "250.00 cm");
            assert_eq!(Unit::Feet.format_length(0.3048), "1.00 ft");
            assert_eq!(Unit::Meters.format_area(12.0), "12.00 m²");
            assert_eq!("feet".parse::<Unit>(), Ok(Unit::Feet));
            assert!("parsecs".parse::<Unit>().is_err());
        }

        #[test]
        fn project_serializes_iso_timestamps_and_entity_arrays() {
            let mut project = Project::new(NewProjectOptions {
                name: "Casa".to_string(),
                ..NewProjectOptions::default()
            });
            let id = project.allocate_id("wall");
            project.walls.insert(
                id.clone(),
                wall(id.as_str(), Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)),
            );

            let value = serde_json::to_value(&project).expect("serialize project");
            assert!(value["walls"].is_array());
            assert_eq!(value["walls"][0]["id"], "wall-1");
            let created = value["createdAt"].as_str().expect("createdAt string");
            assert!(created.contains('T'));

            let restored: Project = serde_json::from_value(value).expect("deserialize project");
            assert_eq!(restored.walls, project.walls);
            assert_eq!(restored.created_at, project.created_at);
            assert!(restored.contains_id(&id));
        }

        #[test]
        fn duplicate_ids_in_a_collection_fail_to_parse() {
            let mut project = Project::new(NewProjectOptions::default());
            for (raw, end) in [("wall-1", 4.0), ("wall-2", 6.0)] {
                project.walls.insert(
                    EntityId::new(raw),
                    wall(raw, Point2::new(0.0, 0.0), Point2::new(end, 0.0)),
                );
            }
            let mut value = serde_json::to_value(&project).expect("serialize project");
            value["walls"][1]["id"] = "wall-1".into();

            let err = serde_json::from_value::<Project>(value).unwrap_err();
            assert!(err.to_string().contains("duplicate id `wall-1`"));
        }
    }
}
