//! # manipulator-motion
//!
//! Motion-trajectory core of a robotic-manipulator control stack.
//!
//! It provides the kinematic-tree data model ([`Manipulator`], [`Component`])
//! that trajectories read their start state from and write commanded state
//! back into, and the minimum-jerk quintic solver ([`MinimumJerk`]) with its
//! multi-DOF aggregation ([`QuinticTrajectory`]) sampled by a fixed-period
//! control loop.
//!
//! Forward/inverse kinematics, path shapes and actuator I/O live outside this
//! crate; they populate `pose_to_world` and the world-frame state and consume
//! the sampled joint or task sequences.

pub mod component;
pub mod error;
pub mod manipulator;
pub mod minimum_jerk;
pub mod motion;
pub mod trajectory;

pub use component::*;
pub use error::{ManipulatorError, Result};
pub use manipulator::*;
pub use minimum_jerk::*;
pub use motion::*;
pub use trajectory::*;
