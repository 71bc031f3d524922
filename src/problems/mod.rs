pub mod cube;

pub use cube::{CubeBehavior, CubeWorld, GroundBehavior, OnTopOf};
