//! Single-DOF minimum-jerk (quintic) boundary-value solver.
//!
//! A motion from `start` to `goal` over duration `T` is described by
//!
//! ```text
//! p(t) = c0 + c1 t + c2 t² + c3 t³ + c4 t⁴ + c5 t⁵
//! ```
//!
//! where `c0..c2` follow directly from the start boundary and `c3..c5` solve a
//! 3×3 system built from the goal boundary.

use nalgebra::{Matrix3, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ManipulatorError, Result};

/// Number of polynomial coefficients per degree of freedom.
pub const COEFFICIENT_COUNT: usize = 6;

/// Absorbs representation error in `move_time / control_time` so that an
/// exact multiple (e.g. 0.3 / 0.1) is not floored one tick short.
const QUANTIZATION_EPSILON: f64 = 1e-9;

/// Position, velocity and acceleration of one degree of freedom at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryState {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

impl BoundaryState {
    pub fn new(position: f64, velocity: f64, acceleration: f64) -> Self {
        Self {
            position,
            velocity,
            acceleration,
        }
    }

    /// A state at rest at `position`.
    pub fn at_rest(position: f64) -> Self {
        Self::new(position, 0.0, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }
}

/// Snaps a requested duration onto the control grid.
///
/// Returns the number of control ticks `floor(move_time / control_time) + 1`
/// and the quantized duration `(ticks - 1) * control_time`, so the terminal
/// boundary coincides with the last sampled tick. A ratio within 1e-9 below an
/// integer counts as that integer, so 0.3 / 0.1 yields 4 ticks rather than 3.
///
/// # Errors
///
/// [`ManipulatorError::NumericDegeneracy`] if either time is non-positive or
/// non-finite, or if `move_time` is shorter than one control period.
pub fn quantize(move_time: f64, control_time: f64) -> Result<(usize, f64)> {
    if !(control_time.is_finite() && control_time > 0.0) {
        return Err(ManipulatorError::numeric_degeneracy(format!(
            "control time must be positive and finite, got {control_time}"
        )));
    }
    if !(move_time.is_finite() && move_time > 0.0) {
        return Err(ManipulatorError::numeric_degeneracy(format!(
            "move time must be positive and finite, got {move_time}"
        )));
    }

    let intervals = (move_time / control_time + QUANTIZATION_EPSILON).floor();
    if intervals < 1.0 {
        return Err(ManipulatorError::numeric_degeneracy(format!(
            "move time {move_time} is shorter than one control period {control_time}"
        )));
    }
    let steps = intervals as usize + 1;
    Ok((steps, intervals * control_time))
}

/// Quintic position at elapsed time `t`.
pub fn quintic_position(c: &Vector6<f64>, t: f64) -> f64 {
    c[0] + t * (c[1] + t * (c[2] + t * (c[3] + t * (c[4] + t * c[5]))))
}

/// First derivative of the quintic at `t`.
pub fn quintic_velocity(c: &Vector6<f64>, t: f64) -> f64 {
    c[1] + t * (2.0 * c[2] + t * (3.0 * c[3] + t * (4.0 * c[4] + t * 5.0 * c[5])))
}

/// Second derivative of the quintic at `t`.
pub fn quintic_acceleration(c: &Vector6<f64>, t: f64) -> f64 {
    2.0 * c[2] + t * (6.0 * c[3] + t * (12.0 * c[4] + t * 20.0 * c[5]))
}

/// Minimum-jerk coefficient solver for one degree of freedom.
///
/// The caller must keep `move_time` well above zero: as the quantized
/// duration approaches zero the boundary system becomes singular, which is
/// reported as [`ManipulatorError::NumericDegeneracy`] rather than NaN.
#[derive(Clone, Debug, Default)]
pub struct MinimumJerk {
    coefficient: Vector6<f64>,
}

impl MinimumJerk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solves the six coefficients for one motion segment.
    ///
    /// On error the previously stored coefficients are kept.
    pub fn calc_coefficient(
        &mut self,
        start: BoundaryState,
        goal: BoundaryState,
        move_time: f64,
        control_time: f64,
    ) -> Result<()> {
        self.coefficient = Self::solve(start, goal, move_time, control_time)?;
        Ok(())
    }

    /// Coefficients ordered from degree 0 to degree 5.
    pub fn coefficient(&self) -> Vector6<f64> {
        self.coefficient
    }

    /// Pure form of [`calc_coefficient`](Self::calc_coefficient).
    pub fn solve(
        start: BoundaryState,
        goal: BoundaryState,
        move_time: f64,
        control_time: f64,
    ) -> Result<Vector6<f64>> {
        let (_, t) = quantize(move_time, control_time)?;
        for (label, state) in [("start", start), ("goal", goal)] {
            if !state.is_finite() {
                return Err(ManipulatorError::numeric_degeneracy(format!(
                    "{label} boundary is not finite: {state:?}"
                )));
            }
        }

        let c0 = start.position;
        let c1 = start.velocity;
        let c2 = 0.5 * start.acceleration;

        let t2 = t * t;
        let t3 = t2 * t;
        let t4 = t3 * t;
        let t5 = t4 * t;

        #[rustfmt::skip]
        let a = Matrix3::new(
            t3,       t4,        t5,
            3.0 * t2, 4.0 * t3,  5.0 * t4,
            6.0 * t,  12.0 * t2, 20.0 * t3,
        );
        let b = Vector3::new(
            goal.position - (c0 + c1 * t + c2 * t2),
            goal.velocity - (c1 + start.acceleration * t),
            goal.acceleration - start.acceleration,
        );

        let x = a
            .col_piv_qr()
            .solve(&b)
            .filter(|x| x.iter().all(|v| v.is_finite()))
            .ok_or_else(|| {
                ManipulatorError::numeric_degeneracy(format!(
                    "boundary system is singular for move time {t}"
                ))
            })?;

        trace!(move_time = t, c3 = x[0], c4 = x[1], c5 = x[2], "solved quintic");

        Ok(Vector6::new(c0, c1, c2, x[0], x[1], x[2]))
    }
}
