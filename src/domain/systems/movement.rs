use crate::domain::tuning::TankTuning;
use crate::domain::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    #[default]
    Forward,
    Backward,
}

/// Kinematic state shared by authoritative and follower tanks.
#[derive(Debug, Clone, Default)]
pub struct TankBody {
    pub position: Vec2,
    pub rotation: f32, // degrees, 0 = facing +y
    pub mode: DriveMode,
    pub desired_direction: Vec2,
    pub desired_position: Vec2,
    pub fire_target: Vec2,
    pub fire_held: bool,
}

impl TankBody {
    pub fn forward(&self) -> Vec2 {
        let rad = self.rotation.to_radians();
        Vec2::new(rad.sin(), rad.cos())
    }
}

// Heading (degrees) that faces along `direction`.
fn heading_of(direction: Vec2) -> f32 {
    90.0 - direction.y.atan2(direction.x).to_degrees()
}

fn rotate_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let mut delta = (target - current) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    let step = delta.clamp(-max_delta, max_delta);
    (current + step).rem_euclid(360.0)
}

// Picks forward/backward drive from how the hull faces the wanted direction, then turns.
fn steer(body: &mut TankBody, direction: Vec2, dt: f32, tuning: TankTuning) {
    let facing_dot = body.forward().dot(direction.normalized());
    if body.mode == DriveMode::Forward && facing_dot < -0.5 {
        body.mode = DriveMode::Backward;
    } else if body.mode == DriveMode::Backward && facing_dot > 0.5 {
        body.mode = DriveMode::Forward;
    }

    let mut desired = heading_of(direction);
    if body.mode == DriveMode::Backward {
        desired += 180.0;
    }
    body.rotation = rotate_towards(body.rotation, desired, tuning.turn_speed * dt);
}

/// Authoritative step: turn toward the desired direction and drive along the hull.
pub fn drive(body: &mut TankBody, dt: f32, tuning: TankTuning) {
    let direction = body.desired_direction;
    if direction.length_squared() <= tuning.input_dead_zone_sq {
        return;
    }

    steer(body, direction, dt, tuning);

    let distance = direction.length() * tuning.speed * dt;
    let heading = match body.mode {
        DriveMode::Forward => body.forward(),
        DriveMode::Backward => body.forward() * -1.0,
    };
    body.position = body.position + heading * distance;
}

/// Follower step: smooth toward the last authoritative position.
pub fn follow(body: &mut TankBody, dt: f32, tuning: TankTuning) {
    let to_target = body.desired_position - body.position;
    if to_target.length_squared() <= f32::EPSILON {
        return;
    }

    steer(body, to_target, dt, tuning);
    body.position = body
        .position
        .move_towards(body.desired_position, tuning.speed * dt);
}
