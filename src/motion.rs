//! Per-tick driver that feeds a joint-space trajectory into a manipulator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ManipulatorError, Result};
use crate::manipulator::Manipulator;
use crate::minimum_jerk::BoundaryState;
use crate::trajectory::{QuinticTrajectory, Sample};

/// Timing of the surrounding control loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Sample period in seconds. Default: 10 ms.
    pub control_period: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            control_period: 0.010,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.control_period.is_finite() && self.control_period > 0.0 {
            Ok(())
        } else {
            Err(ManipulatorError::numeric_degeneracy(format!(
                "control period must be positive and finite, got {}",
                self.control_period
            )))
        }
    }
}

/// Drives the active joints of a [`Manipulator`] along a minimum-jerk segment.
///
/// [`start`](Self::start) captures the current active-joint state as the
/// start boundary. Each [`step`](Self::step) samples the next control tick and
/// writes angle, velocity and acceleration back in name order. Abandoning a
/// motion needs no teardown; just stop calling `step`.
#[derive(Clone, Debug)]
pub struct JointMotion {
    config: ControlConfig,
    trajectory: QuinticTrajectory,
    tick: usize,
}

impl JointMotion {
    pub fn new(config: ControlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            trajectory: QuinticTrajectory::joint_space(0),
            tick: 0,
        })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn trajectory(&self) -> &QuinticTrajectory {
        &self.trajectory
    }

    /// Plans a new segment from the manipulator's current joint state to `goals`.
    ///
    /// Replaces any segment in progress. On error the previous segment is kept.
    pub fn start(
        &mut self,
        manipulator: &Manipulator,
        goals: &[BoundaryState],
        move_time: f64,
    ) -> Result<()> {
        let starts = manipulator.all_active_joint_state();
        let mut trajectory = QuinticTrajectory::joint_space(starts.len());
        trajectory.init(&starts, goals, move_time, self.config.control_period)?;

        debug!(
            dof = trajectory.dof(),
            steps = trajectory.step_count(),
            move_time = trajectory.move_time(),
            "joint motion started"
        );
        self.trajectory = trajectory;
        self.tick = 0;
        Ok(())
    }

    /// Whether every tick of the current segment has been emitted.
    pub fn is_finished(&self) -> bool {
        self.tick >= self.trajectory.step_count()
    }

    /// Emits the next tick into `manipulator`, or `None` once the segment is done.
    pub fn step(&mut self, manipulator: &mut Manipulator) -> Result<Option<Sample>> {
        if self.is_finished() {
            return Ok(None);
        }
        let time = self.tick as f64 * self.trajectory.control_time();
        let sample = self.trajectory.sample(time);

        manipulator.set_all_active_joint_angle(&sample.position)?;
        manipulator.set_all_active_joint_velocity(&sample.velocity)?;
        manipulator.set_all_active_joint_acceleration(&sample.acceleration)?;

        self.tick += 1;
        Ok(Some(sample))
    }
}
