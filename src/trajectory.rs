//! Multi-DOF quintic trajectories built from independent per-axis solves.

use nalgebra::{DMatrix, Vector6};
use tracing::trace;

use crate::error::{ManipulatorError, Result};
use crate::minimum_jerk::{
    BoundaryState, COEFFICIENT_COUNT, MinimumJerk, quantize, quintic_acceleration,
    quintic_position, quintic_velocity,
};

/// Number of Cartesian axes of a task-space trajectory (x, y, z).
pub const TASK_SPACE_AXES: usize = 3;

/// Position, velocity and acceleration of every DOF at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Elapsed time since the segment start.
    pub time: f64,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
}

/// A set of decoupled minimum-jerk profiles, one per degree of freedom.
///
/// Coefficients are stored as a `6 × dof` matrix, one column per DOF, and are
/// fully overwritten by every successful [`init`](Self::init). Evaluation
/// takes elapsed time, not a tick index, and is not clamped to the segment.
#[derive(Clone, Debug)]
pub struct QuinticTrajectory {
    dof: usize,
    coefficients: DMatrix<f64>,
    move_time: f64,
    control_time: f64,
    steps: usize,
    generator: MinimumJerk,
}

impl QuinticTrajectory {
    /// A trajectory over `dof` independent axes. Holds position zero until initialized.
    pub fn new(dof: usize) -> Self {
        Self {
            dof,
            coefficients: DMatrix::zeros(COEFFICIENT_COUNT, dof),
            move_time: 0.0,
            control_time: 0.0,
            steps: 0,
            generator: MinimumJerk::new(),
        }
    }

    /// One profile per active joint.
    pub fn joint_space(joint_count: usize) -> Self {
        Self::new(joint_count)
    }

    /// One profile per Cartesian axis of the end effector.
    pub fn task_space() -> Self {
        Self::new(TASK_SPACE_AXES)
    }

    /// Solves every axis for a new motion segment.
    ///
    /// `starts` and `goals` must both hold exactly [`dof`](Self::dof) entries.
    /// Either every column is replaced or, on error, nothing is.
    pub fn init(
        &mut self,
        starts: &[BoundaryState],
        goals: &[BoundaryState],
        move_time: f64,
        control_time: f64,
    ) -> Result<()> {
        if starts.len() != self.dof {
            return Err(ManipulatorError::dimension_mismatch(
                "trajectory starts",
                self.dof,
                starts.len(),
            ));
        }
        if goals.len() != self.dof {
            return Err(ManipulatorError::dimension_mismatch(
                "trajectory goals",
                self.dof,
                goals.len(),
            ));
        }
        let (steps, quantized) = quantize(move_time, control_time)?;

        let mut coefficients = DMatrix::zeros(COEFFICIENT_COUNT, self.dof);
        for (index, (start, goal)) in starts.iter().zip(goals).enumerate() {
            self.generator
                .calc_coefficient(*start, *goal, move_time, control_time)?;
            let column = self.generator.coefficient();
            for k in 0..COEFFICIENT_COUNT {
                coefficients[(k, index)] = column[k];
            }
        }

        trace!(dof = self.dof, steps, move_time = quantized, "trajectory initialized");

        self.coefficients = coefficients;
        self.move_time = quantized;
        self.control_time = control_time;
        self.steps = steps;
        Ok(())
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    /// The `6 × dof` coefficient matrix, degree 0 in row 0.
    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// Duration after quantization onto the control grid.
    pub fn move_time(&self) -> f64 {
        self.move_time
    }

    pub fn control_time(&self) -> f64 {
        self.control_time
    }

    /// Number of control ticks including both endpoints; zero before `init`.
    pub fn step_count(&self) -> usize {
        self.steps
    }

    /// Elapsed times of every control tick, `0, dt, 2 dt, ..., move_time`.
    pub fn sample_times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.steps).map(move |tick| tick as f64 * self.control_time)
    }

    pub fn position(&self, t: f64) -> Vec<f64> {
        self.evaluate(t, quintic_position)
    }

    pub fn velocity(&self, t: f64) -> Vec<f64> {
        self.evaluate(t, quintic_velocity)
    }

    pub fn acceleration(&self, t: f64) -> Vec<f64> {
        self.evaluate(t, quintic_acceleration)
    }

    pub fn sample(&self, t: f64) -> Sample {
        Sample {
            time: t,
            position: self.position(t),
            velocity: self.velocity(t),
            acceleration: self.acceleration(t),
        }
    }

    fn evaluate(&self, t: f64, f: fn(&Vector6<f64>, f64) -> f64) -> Vec<f64> {
        (0..self.dof)
            .map(|index| {
                let c = Vector6::from_fn(|k, _| self.coefficients[(k, index)]);
                f(&c, t)
            })
            .collect()
    }
}
