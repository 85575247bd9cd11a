// Headless arena: tanks driven by the kinematic movement model, no rendering.
// Used by the node binary and by tests that need a real simulation behind the ports.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::ports::{Arena, SpawnPoint, Tank};
use crate::domain::systems::movement::{self, TankBody};
use crate::domain::tuning::TankTuning;
use crate::domain::vec2::Vec2;

#[derive(Debug, Clone)]
pub struct HeadlessTank {
    body: TankBody,
    authoritative: bool,
    tuning: TankTuning,
    respawns: u32,
}

impl HeadlessTank {
    pub fn new(authoritative: bool, tuning: TankTuning) -> Self {
        Self {
            body: TankBody::default(),
            authoritative,
            tuning,
            respawns: 0,
        }
    }

    pub fn desired_direction(&self) -> Vec2 {
        self.body.desired_direction
    }

    pub fn desired_position(&self) -> Vec2 {
        self.body.desired_position
    }

    pub fn respawns(&self) -> u32 {
        self.respawns
    }
}

impl Tank for HeadlessTank {
    fn position(&self) -> Vec2 {
        self.body.position
    }

    fn rotation(&self) -> f32 {
        self.body.rotation
    }

    fn fire_target(&self) -> Vec2 {
        self.body.fire_target
    }

    fn fire_held(&self) -> bool {
        self.body.fire_held
    }

    fn set_desired_direction(&mut self, direction: Vec2) {
        self.body.desired_direction = if direction.length_squared() > 1.0 {
            direction.normalized()
        } else {
            direction
        };
    }

    fn set_desired_position(&mut self, position: Vec2) {
        self.body.desired_position = position;
    }

    fn set_fire_target(&mut self, target: Vec2) {
        self.body.fire_target = target;
    }

    fn set_fire_held(&mut self, held: bool) {
        self.body.fire_held = held;
    }

    fn respawn_at(&mut self, position: Vec2, rotation: f32) {
        self.body = TankBody {
            position,
            rotation,
            desired_position: position,
            fire_target: self.body.fire_target,
            ..TankBody::default()
        };
        self.respawns += 1;
    }

    fn advance(&mut self, dt: f32) {
        if self.authoritative {
            movement::drive(&mut self.body, dt, self.tuning);
        } else {
            movement::follow(&mut self.body, dt, self.tuning);
        }
    }
}

pub struct HeadlessArena {
    spawn_points: Vec<SpawnPoint>,
    tuning: TankTuning,
    rng: StdRng,
}

impl HeadlessArena {
    pub fn new(spawn_points: Vec<SpawnPoint>, tuning: TankTuning) -> Self {
        Self {
            spawn_points,
            tuning,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic spawn selection for tests.
    pub fn with_seed(spawn_points: Vec<SpawnPoint>, tuning: TankTuning, seed: u64) -> Self {
        Self {
            spawn_points,
            tuning,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Eight points on a ring, each facing the centre.
    pub fn ring_layout(radius: f32) -> Vec<SpawnPoint> {
        (0..8)
            .map(|i| {
                let angle = i as f32 * 45.0;
                let rad = angle.to_radians();
                SpawnPoint {
                    position: Vec2::new(rad.sin() * radius, rad.cos() * radius),
                    rotation: (angle + 180.0) % 360.0,
                }
            })
            .collect()
    }
}

impl Default for HeadlessArena {
    fn default() -> Self {
        Self::new(Self::ring_layout(20.0), TankTuning::default())
    }
}

impl Arena for HeadlessArena {
    type Tank = HeadlessTank;

    fn spawn_tank(&mut self, authoritative: bool) -> HeadlessTank {
        HeadlessTank::new(authoritative, self.tuning)
    }

    fn spawn_point(&mut self, occupied: &[Vec2]) -> SpawnPoint {
        if self.spawn_points.is_empty() {
            return SpawnPoint {
                position: Vec2::ZERO,
                rotation: 0.0,
            };
        }

        let clearance = self.tuning.spawn_clearance;
        let empty: Vec<&SpawnPoint> = self
            .spawn_points
            .iter()
            .filter(|point| {
                occupied
                    .iter()
                    .all(|pos| pos.distance(point.position) >= clearance)
            })
            .collect();

        // Every point taken: fall back to any point.
        if empty.is_empty() {
            let idx = self.rng.gen_range(0..self.spawn_points.len());
            return self.spawn_points[idx];
        }
        *empty[self.rng.gen_range(0..empty.len())]
    }
}
