use dynstream_engine::coords::Vec3;
use rand::Rng;

/// Scale applied to every velocity during integration.
pub const SPEED: f32 = 0.1;

/// Points bounce off the square `[-BOUND, BOUND]` on X and Y.
pub const BOUND: f32 = 1.0;

/// Simulated point cloud: positions and index-aligned velocities.
///
/// The length is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

impl PointSet {
    /// `len` points with X/Y positions and velocities drawn uniformly from `[-1, 1]`, Z = 0.
    pub fn random<R: Rng>(len: usize, rng: &mut R) -> Self {
        let mut planar = || Vec3::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0), 0.0);

        let positions: Vec<Vec3> = (0..len).map(|_| planar()).collect();
        let velocities: Vec<Vec3> = (0..len).map(|_| planar()).collect();

        Self { positions, velocities }
    }

    /// Builds a set from explicit data.
    ///
    /// Panics if the two sequences differ in length.
    pub fn from_parts(positions: Vec<Vec3>, velocities: Vec<Vec3>) -> Self {
        assert_eq!(
            positions.len(),
            velocities.len(),
            "positions and velocities must be index-aligned"
        );
        Self { positions, velocities }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Advances every point by `dt` seconds.
    pub fn integrate(&mut self, dt: f32) {
        for (p, v) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            step_point(p, v, dt);
        }
    }
}

/// Moves one point and reflects its velocity on each axis that left the bounds.
///
/// Axes are checked independently, so a point past a corner flips both. The
/// position is not clamped back into range.
#[inline]
pub fn step_point(position: &mut Vec3, velocity: &mut Vec3, dt: f32) {
    *position += *velocity * SPEED * dt;

    if position.x < -BOUND || position.x > BOUND {
        velocity.x = -velocity.x;
    }
    if position.y < -BOUND || position.y > BOUND {
        velocity.y = -velocity.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_points_are_planar_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = PointSet::random(500, &mut rng);
        assert_eq!(set.len(), 500);
        for v in set.positions().iter().chain(set.velocities()) {
            assert!(v.is_finite());
            assert!((-1.0..=1.0).contains(&v.x));
            assert!((-1.0..=1.0).contains(&v.y));
            assert_eq!(v.z, 0.0);
        }
    }

    #[test]
    fn same_seed_same_points() {
        let a = PointSet::random(64, &mut StdRng::seed_from_u64(42));
        let b = PointSet::random(64, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn inside_bounds_keeps_direction() {
        let mut p = Vec3::new(0.95, 0.0, 0.0);
        let mut v = Vec3::new(0.2, 0.0, 0.0);

        step_point(&mut p, &mut v, 1.0);
        assert_relative_eq!(p.x, 0.97, epsilon = 1e-6);
        assert_eq!(v.x, 0.2);

        step_point(&mut p, &mut v, 1.0);
        assert_relative_eq!(p.x, 0.99, epsilon = 1e-6);
        assert_eq!(v.x, 0.2);
    }

    #[test]
    fn crossing_the_bound_flips_x_without_clamping() {
        let mut p = Vec3::new(0.99, 0.0, 0.0);
        let mut v = Vec3::new(0.2, 0.0, 0.0);

        step_point(&mut p, &mut v, 1.0);
        assert_relative_eq!(p.x, 1.01, epsilon = 1e-6);
        assert_eq!(v.x, -0.2);

        // Overshoot is walked back by the reversed velocity.
        step_point(&mut p, &mut v, 1.0);
        assert_relative_eq!(p.x, 0.99, epsilon = 1e-6);
        assert_eq!(v.x, -0.2);
    }

    #[test]
    fn lower_bound_flips_too() {
        let mut p = Vec3::new(0.0, -0.99, 0.0);
        let mut v = Vec3::new(0.0, -0.5, 0.0);
        step_point(&mut p, &mut v, 1.0);
        assert_eq!(v.y, 0.5);
        assert_eq!(v.x, 0.0);
    }

    #[test]
    fn corner_flips_both_axes_in_one_step() {
        let mut p = Vec3::new(0.99, -0.99, 0.0);
        let mut v = Vec3::new(1.0, -1.0, 0.0);
        step_point(&mut p, &mut v, 1.0);
        assert_eq!(v, Vec3::new(-1.0, 1.0, 0.0));
    }

    #[test]
    fn exactly_on_the_bound_does_not_flip() {
        let mut p = Vec3::new(1.0, 0.0, 0.0);
        let mut v = Vec3::new(0.0, 0.0, 0.0);
        step_point(&mut p, &mut v, 1.0);
        assert_eq!(v.x, 0.0);
        assert_eq!(p.x, 1.0);
    }

    #[test]
    fn still_outside_after_flip_flips_again() {
        // A large dt can leave the point outside for two steps; each step re-evaluates.
        let mut p = Vec3::new(0.9, 0.0, 0.0);
        let mut v = Vec3::new(1.0, 0.0, 0.0);
        step_point(&mut p, &mut v, 3.0);
        assert_relative_eq!(p.x, 1.2, epsilon = 1e-6);
        assert_eq!(v.x, -1.0);
        step_point(&mut p, &mut v, 1.0);
        assert_relative_eq!(p.x, 1.1, epsilon = 1e-6);
        assert_eq!(v.x, 1.0);
    }

    #[test]
    fn integrate_applies_to_every_point() {
        let mut set = PointSet::from_parts(
            vec![Vec3::zero(), Vec3::new(0.5, 0.5, 0.0)],
            vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)],
        );
        set.integrate(2.0);
        assert_relative_eq!(set.positions()[0].x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(set.positions()[1].y, 0.3, epsilon = 1e-6);
    }

    #[test]
    #[should_panic(expected = "index-aligned")]
    fn mismatched_parts_panic() {
        PointSet::from_parts(vec![Vec3::zero()], vec![]);
    }
}
