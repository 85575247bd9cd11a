/// Gameplay tuning for tanks driven by the headless movement model.
///
/// Keep this separate from runtime/node configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct TankTuning {
    /// Drive speed in world units per second.
    pub speed: f32,

    /// Turret-less hull turn speed in degrees per second.
    pub turn_speed: f32,

    /// Squared input length below which a direction counts as "no input".
    pub input_dead_zone_sq: f32,

    /// Minimum distance between a spawn point and any live tank.
    pub spawn_clearance: f32,
}

impl Default for TankTuning {
    fn default() -> Self {
        Self {
            speed: 11.0,
            turn_speed: 180.0,
            input_dead_zone_sq: 0.01,
            spawn_clearance: 3.0,
        }
    }
}
