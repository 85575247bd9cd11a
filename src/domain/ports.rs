use async_trait::async_trait;
use std::time::Duration;

use crate::domain::identity::Identity;
use crate::domain::messages::MovementState;
use crate::domain::vec2::Vec2;

// Port for one simulated tank. Rendering, physics and audio sit behind it.
pub trait Tank {
    fn position(&self) -> Vec2;
    /// Heading around the vertical axis, in degrees.
    fn rotation(&self) -> f32;
    fn fire_target(&self) -> Vec2;
    fn fire_held(&self) -> bool;

    fn set_desired_direction(&mut self, direction: Vec2);
    fn set_desired_position(&mut self, position: Vec2);
    fn set_fire_target(&mut self, target: Vec2);
    fn set_fire_held(&mut self, held: bool);

    /// Teleport, reset health and movement.
    fn respawn_at(&mut self, position: Vec2, rotation: f32);

    /// Runs the local movement model for one step.
    fn advance(&mut self, dt: f32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub position: Vec2,
    pub rotation: f32,
}

// Port for the world that owns tanks and spawn points.
pub trait Arena {
    type Tank: Tank;

    fn spawn_tank(&mut self, authoritative: bool) -> Self::Tank;

    /// Picks a spawn point clear of every position in `occupied`.
    fn spawn_point(&mut self, occupied: &[Vec2]) -> SpawnPoint;
}

// Port for camera follow, HUD binding and chat display.
pub trait Presenter {
    fn follow(&mut self, slot: usize, identity: &Identity);
    fn show_chat(&mut self, from: &Identity, text: &str);
}

// Port for local input capture (touch or keyboard).
pub trait InputSource {
    fn sample(&mut self) -> MovementState;
}

// Port for the directory service that maps names to relay addresses.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Returns `Ok(None)` on a directory miss.
    async fn lookup(&self, name: &str) -> Result<Option<String>, String>;
}

// Port for measuring round-trip latency to a relay address.
#[async_trait]
pub trait LatencyMeter: Send + Sync {
    /// Returns `None` when the address did not answer.
    async fn measure(&self, address: &str) -> Option<Duration>;
}

// Port for handing encoded payloads to the overlay transport. Fire-and-forget.
pub trait FrameSink {
    /// Returns false when the frame was dropped (not connected, queue full).
    fn send_frame(&self, destination: &Identity, payload: Vec<u8>) -> bool;
}
