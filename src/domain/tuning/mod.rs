pub mod tank;

pub use tank::TankTuning;
