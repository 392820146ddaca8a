//! Affine transform stack for scene-graph traversal
//!
//! Transform wrappers ([`Translated`](crate::scene::Translated) and friends)
//! compose their local transform onto the stack on the way down and restore
//! the previous top on the way back up.  The top of the stack is always the
//! cumulative transform from the scene root to the current node.
//!
//! Push and pop must be strictly paired around the subtree they bracket; an
//! unmatched call corrupts every sibling visited afterwards.  Visitors route
//! all pairing through a single helper (see
//! [`Serializer`](crate::algo::Serializer)) rather than calling `push`/`pop`
//! at each site.
use nalgebra::{Matrix4, Rotation3, Unit, Vector3};

/// Stack of cumulative 4×4 affine transforms
///
/// Composition is post-multiplication: a new local transform is applied in
/// the current node's frame, nested inside the parent frame.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Matrix4<f32>>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self {
            stack: vec![Matrix4::identity()],
        }
    }
}

impl MatrixStack {
    /// Builds a stack holding a single identity transform
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicates the top of the stack
    pub fn push(&mut self) {
        let top = *self.top();
        self.stack.push(top);
    }

    /// Discards the top of the stack, restoring the previous transform
    ///
    /// Popping the root frame is a pairing bug in the caller.
    pub fn pop(&mut self) {
        debug_assert!(self.stack.len() > 1, "unmatched MatrixStack::pop");
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Current cumulative transform
    pub fn matrix(&self) -> Matrix4<f32> {
        *self.top()
    }

    /// Stack depth, including the root frame
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Composes a translation onto the top of the stack
    pub fn translate(&mut self, v: Vector3<f32>) {
        self.transform(&Matrix4::new_translation(&v));
    }

    /// Composes a per-axis scaling onto the top of the stack
    pub fn scale(&mut self, v: Vector3<f32>) {
        self.transform(&Matrix4::new_nonuniform_scaling(&v));
    }

    /// Composes a rotation of `angle` radians about `axis`
    pub fn axis_rotation(&mut self, axis: Vector3<f32>, angle: f32) {
        let axis = Unit::new_normalize(axis);
        self.transform(&Rotation3::from_axis_angle(&axis, angle).to_homogeneous());
    }

    /// Composes a ZYX Euler rotation (azimuth about Z, then elevation about
    /// Y, then roll about X)
    pub fn euler_rotation(&mut self, azimuth: f32, elevation: f32, roll: f32) {
        self.transform(&Rotation3::from_euler_angles(roll, elevation, azimuth).to_homogeneous());
    }

    /// Composes an arbitrary affine matrix onto the top of the stack
    pub fn transform(&mut self, m: &Matrix4<f32>) {
        let top = self.top_mut();
        *top *= m;
    }

    fn top(&self) -> &Matrix4<f32> {
        self.stack.last().unwrap()
    }

    fn top_mut(&mut self) -> &mut Matrix4<f32> {
        self.stack.last_mut().unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn push_pop_restores_top() {
        let mut s = MatrixStack::new();
        s.translate(Vector3::new(1.0, 2.0, 3.0));
        let before = s.matrix();
        s.push();
        s.scale(Vector3::new(2.0, 2.0, 2.0));
        s.push();
        s.axis_rotation(Vector3::z(), 1.0);
        s.pop();
        s.pop();
        assert_eq!(s.matrix(), before);
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn composition_is_local_frame() {
        // translate-then-rotate must rotate inside the translated frame
        let mut s = MatrixStack::new();
        s.translate(Vector3::new(1.0, 0.0, 0.0));
        s.axis_rotation(Vector3::z(), std::f32::consts::FRAC_PI_2);
        let p = s.matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn euler_matches_axis_rotations() {
        let mut a = MatrixStack::new();
        a.euler_rotation(0.3, 0.0, 0.0);
        let mut b = MatrixStack::new();
        b.axis_rotation(Vector3::z(), 0.3);
        assert_relative_eq!(a.matrix(), b.matrix(), epsilon = 1e-6);
    }
}
