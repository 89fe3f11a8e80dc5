use glam::{Quat, Vec3};

/// Values a keyframe track can interpolate between.
pub trait Interpolatable: Copy + Clone + Sized + std::fmt::Debug + PartialEq {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        slerp_shortest(start, end, t)
    }
}

/// Spherical interpolation along the shorter arc, renormalized.
///
/// `q` and `-q` encode the same rotation; when the operands point into
/// opposite hemispheres `end` is negated first.
#[must_use]
pub fn slerp_shortest(start: Quat, end: Quat, t: f32) -> Quat {
    let end = if start.dot(end) < 0.0 { -end } else { end };
    start.slerp(end, t).normalize()
}
