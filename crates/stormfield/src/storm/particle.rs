//! A single particle of the storm: position, velocity and an oscillating
//! size, all nudged by a uniform random source every frame.

/// `blur_level` is always this multiple of the particle's current size.
pub const BLUR_FACTOR: f32 = 4.3;

/// One particle. The engine owns all of them exclusively; nothing else ever
/// holds a reference across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Horizontal position, always within `[0, width]`.
    pub x: f32,
    /// Vertical position, always within `[0, height]`.
    pub y: f32,
    /// Horizontal velocity in pixels per frame, within `[-speed/2, speed/2]`.
    pub vx: f32,
    /// Vertical velocity in pixels per frame, within `[-speed/2, speed/2]`.
    pub vy: f32,
    /// Radius in pixels, always within the configured size range.
    pub size: f32,
    /// Derived rendering attribute: `size * 4.3`. Drives both glow radius and
    /// transparency falloff.
    pub blur_level: f32,
}

impl Particle {
    /// Spawn a particle at a uniformly random position with random velocity
    /// and size.
    pub fn spawn(
        rng: &mut impl rand::Rng,
        bounds: (f32, f32),
        speed: f32,
        size_range: [f32; 2],
    ) -> Self {
        let size = rng.gen_range(size_range[0]..=size_range[1]);
        Self {
            x: rng.gen_range(0.0..=bounds.0),
            y: rng.gen_range(0.0..=bounds.1),
            vx: rng.gen_range(-speed / 2.0..=speed / 2.0),
            vy: rng.gen_range(-speed / 2.0..=speed / 2.0),
            size,
            blur_level: size * BLUR_FACTOR,
        }
    }

    /// Advance the particle by one frame: integrate, drift, reflect off the
    /// walls and random-walk the size.
    pub fn integrate(
        &mut self,
        rng: &mut impl rand::Rng,
        bounds: (f32, f32),
        speed: f32,
        drift: f32,
        size_range: [f32; 2],
    ) {
        self.x += self.vx;
        self.y += self.vy;

        if drift != 0.0 {
            let magnitude = speed * drift / 2.0;
            self.vx += rng.gen_range(-magnitude..=magnitude);
            self.vx = self.vx.clamp(-speed / 2.0, speed / 2.0);
            self.vy += rng.gen_range(-magnitude..=magnitude);
            self.vy = self.vy.clamp(-speed / 2.0, speed / 2.0);
        }

        // Bounce off the walls.
        if self.x <= 0.0 || self.x >= bounds.0 {
            self.vx *= -1.0;
            self.x = if self.x <= 0.0 { 0.0 } else { bounds.0 };
        }
        if self.y <= 0.0 || self.y >= bounds.1 {
            self.vy *= -1.0;
            self.y = if self.y <= 0.0 { 0.0 } else { bounds.1 };
        }

        let size_step = size_range[1] * 0.15 / 2.0;
        self.size += rng.gen_range(-size_step..=size_step);
        self.size = self.size.clamp(size_range[0], size_range[1]);
        self.blur_level = self.size * BLUR_FACTOR;
    }

    /// Euclidean distance to another particle.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng as _;

    const BOUNDS: (f32, f32) = (100.0, 80.0);
    const SPEED: f32 = 16.0;
    const SIZE_RANGE: [f32; 2] = [2.0, 4.0];

    #[test]
    fn everything_stays_bounded_over_many_frames() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut particle = Particle::spawn(&mut rng, BOUNDS, SPEED, SIZE_RANGE);

        for _ in 0..10_000 {
            particle.integrate(&mut rng, BOUNDS, SPEED, 0.35, SIZE_RANGE);
            assert!((0.0..=BOUNDS.0).contains(&particle.x));
            assert!((0.0..=BOUNDS.1).contains(&particle.y));
            assert!(particle.vx.abs() <= SPEED / 2.0);
            assert!(particle.vy.abs() <= SPEED / 2.0);
            assert!((SIZE_RANGE[0]..=SIZE_RANGE[1]).contains(&particle.size));
            assert!((particle.blur_level - particle.size * BLUR_FACTOR).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn crossing_a_wall_reflects_velocity_and_clamps_position() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut particle = Particle {
            x: 99.0,
            y: 40.0,
            vx: 5.0,
            vy: 0.0,
            size: 3.0,
            blur_level: 3.0 * BLUR_FACTOR,
        };

        // Drift disabled so the reflection is exact.
        particle.integrate(&mut rng, BOUNDS, SPEED, 0.0, SIZE_RANGE);
        assert_eq!(particle.x, BOUNDS.0);
        assert_eq!(particle.vx, -5.0);

        let mut falling = Particle {
            x: 50.0,
            y: 1.0,
            vx: 0.0,
            vy: -4.0,
            size: 3.0,
            blur_level: 3.0 * BLUR_FACTOR,
        };
        falling.integrate(&mut rng, BOUNDS, SPEED, 0.0, SIZE_RANGE);
        assert_eq!(falling.y, 0.0);
        assert_eq!(falling.vy, 4.0);
    }

    #[test]
    fn zero_drift_keeps_velocity_constant_between_walls() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut particle = Particle {
            x: 50.0,
            y: 40.0,
            vx: 1.5,
            vy: -1.0,
            size: 3.0,
            blur_level: 3.0 * BLUR_FACTOR,
        };
        particle.integrate(&mut rng, BOUNDS, SPEED, 0.0, SIZE_RANGE);
        assert_eq!((particle.vx, particle.vy), (1.5, -1.0));
        assert_eq!((particle.x, particle.y), (51.5, 39.0));
    }
}
