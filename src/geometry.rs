//! Points, affine transforms and paths. Pure value types shared by the
//! context and every backend.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Affine transform stored as the canvas matrix `(a, b, c, d, e, f)`:
///
/// ```text
/// | a c e |
/// | b d f |
/// | 0 0 1 |
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translation(x: f64, y: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub const fn scaling(x: f64, y: f64) -> Self {
        Self::new(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Returns `self * m`: `m` is applied first, then `self`.
    pub fn multiply(&self, m: &Transform) -> Transform {
        Transform {
            a: self.a * m.a + self.c * m.b,
            b: self.b * m.a + self.d * m.b,
            c: self.a * m.c + self.c * m.d,
            d: self.b * m.c + self.d * m.d,
            e: self.a * m.e + self.c * m.f + self.e,
            f: self.b * m.e + self.d * m.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> Point {
        Point::new(
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Uniform scale factor used for radii and line widths.
    pub fn scale_factor(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    /// Horizontal and vertical axis lengths.
    pub fn axis_scales(&self) -> (f64, f64) {
        (self.a.hypot(self.b), self.c.hypot(self.d))
    }

    pub fn rotation_angle(&self) -> f64 {
        self.b.atan2(self.a)
    }
}

/// Signed angular extent of an arc from `start` to `end`, positive in the
/// clockwise (y-down) direction and at most one full turn.
pub fn arc_sweep(start: f64, end: f64, anticlockwise: bool) -> f64 {
    use std::f64::consts::TAU;
    if anticlockwise {
        let span = start - end;
        if span >= TAU { -TAU } else { -span.rem_euclid(TAU) }
    } else {
        let span = end - start;
        if span >= TAU { TAU } else { span.rem_euclid(TAU) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathComponent {
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    Arc {
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    },
    Close,
}

impl PathComponent {
    fn offset(&mut self, dx: f64, dy: f64) {
        match self {
            PathComponent::MoveTo { x, y }
            | PathComponent::LineTo { x, y }
            | PathComponent::Arc { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            PathComponent::Close => {}
        }
    }
}

/// Ordered list of path components. A `Close` always refers to the most
/// recent `MoveTo`; closing without an open subpath is ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    components: Vec<PathComponent>,
    subpath_start: Option<Point>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.subpath_start = None;
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.components.push(PathComponent::MoveTo { x, y });
        self.subpath_start = Some(Point::new(x, y));
        self
    }

    /// Adds a line; on an empty path this starts a subpath at `(x, y)` instead.
    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        if self.subpath_start.is_none() {
            return self.move_to(x, y);
        }
        self.components.push(PathComponent::LineTo { x, y });
        self
    }

    pub fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) -> &mut Self {
        if self.subpath_start.is_none() {
            self.subpath_start = Some(Point::new(
                x + radius * start_angle.cos(),
                y + radius * start_angle.sin(),
            ));
        }
        self.components.push(PathComponent::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
            anticlockwise,
        });
        self
    }

    pub fn close(&mut self) -> &mut Self {
        if self.subpath_start.is_some() {
            self.components.push(PathComponent::Close);
        }
        self
    }

    /// Four-point closed rectangle.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> &mut Self {
        self.move_to(x, y)
            .line_to(x + w, y)
            .line_to(x + w, y + h)
            .line_to(x, y + h)
            .close()
    }

    /// Translates every component in place.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        for component in &mut self.components {
            component.offset(dx, dy);
        }
        if let Some(start) = self.subpath_start.as_mut() {
            *start = start.offset(dx, dy);
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Path {
        let mut path = self.clone();
        path.offset(dx, dy);
        path
    }

    /// Conservative bounding box. Arcs contribute their full circle.
    pub fn bounds(&self) -> Option<Rect> {
        let mut min = (f64::INFINITY, f64::INFINITY);
        let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut include = |x: f64, y: f64| {
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        };
        for component in &self.components {
            match *component {
                PathComponent::MoveTo { x, y } | PathComponent::LineTo { x, y } => include(x, y),
                PathComponent::Arc { x, y, radius, .. } => {
                    include(x - radius, y - radius);
                    include(x + radius, y + radius);
                }
                PathComponent::Close => {}
            }
        }
        if min.0 > max.0 || min.1 > max.1 {
            return None;
        }
        Some(Rect::new(min.0, min.1, max.0 - min.0, max.1 - min.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_almost_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn multiply_applies_right_operand_first() {
        let t = Transform::translation(5.0, 6.0).multiply(&Transform::scaling(2.0, 3.0));
        assert_eq!(t, Transform::new(2.0, 0.0, 0.0, 3.0, 5.0, 6.0));
        let p = t.apply(1.0, 1.0);
        assert_almost_eq(p.x, 7.0);
        assert_almost_eq(p.y, 9.0);
    }

    #[test]
    fn rotation_reports_angle_and_unit_scale() {
        let t = Transform::rotation(std::f64::consts::FRAC_PI_2);
        assert_almost_eq(t.rotation_angle(), std::f64::consts::FRAC_PI_2);
        assert_almost_eq(t.scale_factor(), 1.0);
        let p = t.apply(1.0, 0.0);
        assert_almost_eq(p.x, 0.0);
        assert_almost_eq(p.y, 1.0);
    }

    #[test]
    fn rect_is_four_points_and_close() {
        let mut path = Path::new();
        path.rect(1.0, 2.0, 3.0, 4.0);
        assert_eq!(path.components().len(), 5);
        assert_eq!(path.components()[0], PathComponent::MoveTo { x: 1.0, y: 2.0 });
        assert_eq!(path.components()[2], PathComponent::LineTo { x: 4.0, y: 6.0 });
        assert_eq!(path.components()[4], PathComponent::Close);
    }

    #[test]
    fn close_without_subpath_is_ignored() {
        let mut path = Path::new();
        path.close();
        assert!(path.is_empty());
    }

    #[test]
    fn line_to_on_empty_path_starts_subpath() {
        let mut path = Path::new();
        path.line_to(3.0, 4.0);
        assert_eq!(path.components(), &[PathComponent::MoveTo { x: 3.0, y: 4.0 }]);
    }

    #[test]
    fn offset_moves_every_component() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0)
            .line_to(10.0, 0.0)
            .arc(5.0, 5.0, 2.0, 0.0, 1.0, false)
            .close();
        let moved = path.translated(3.0, -1.0);
        assert_eq!(moved.components()[0], PathComponent::MoveTo { x: 3.0, y: -1.0 });
        assert_eq!(moved.components()[1], PathComponent::LineTo { x: 13.0, y: -1.0 });
        match moved.components()[2] {
            PathComponent::Arc { x, y, radius, .. } => {
                assert_almost_eq(x, 8.0);
                assert_almost_eq(y, 4.0);
                assert_almost_eq(radius, 2.0);
            }
            other => panic!("unexpected component {other:?}"),
        }
        assert_eq!(moved.components()[3], PathComponent::Close);
    }

    #[test]
    fn arc_sweep_normalizes_direction() {
        use std::f64::consts::{FRAC_PI_2, PI, TAU};
        assert_almost_eq(arc_sweep(0.0, FRAC_PI_2, false), FRAC_PI_2);
        assert_almost_eq(arc_sweep(0.0, FRAC_PI_2, true), -(TAU - FRAC_PI_2));
        assert_almost_eq(arc_sweep(0.0, 3.0 * TAU, false), TAU);
        assert_almost_eq(arc_sweep(PI, 0.0, true), -PI);
        assert_almost_eq(arc_sweep(1.0, 1.0, false), 0.0);
    }

    #[test]
    fn bounds_cover_arcs() {
        let mut path = Path::new();
        path.arc(10.0, 10.0, 5.0, 0.0, std::f64::consts::PI, false);
        let b = path.bounds().unwrap();
        assert_eq!(b, Rect::new(5.0, 5.0, 10.0, 10.0));
        assert!(Path::new().bounds().is_none());
    }
}
