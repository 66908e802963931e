//! Jog command generation
//!
//! Builds the `$J=` jog line pair for one axis from a distance and a speed
//! percentage of that axis' maximum feedrate.

use crate::data::Axis;
use crate::error::JogError;
use std::collections::BTreeMap;

/// Per-axis maximum feedrate table (mm/min)
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedrateLimits {
    max_feedrate: BTreeMap<Axis, f64>,
}

impl FeedrateLimits {
    /// Default maximum feedrate for every axis (mm/min)
    pub const DEFAULT_MAX_FEEDRATE: f64 = 2000.0;

    /// Create an empty table
    pub fn new() -> Self {
        Self {
            max_feedrate: BTreeMap::new(),
        }
    }

    /// Set the maximum feedrate for an axis
    pub fn with_axis(mut self, axis: Axis, max_feedrate: f64) -> Self {
        self.max_feedrate.insert(axis, max_feedrate);
        self
    }

    /// Maximum feedrate for an axis, if configured
    pub fn max_feedrate(&self, axis: Axis) -> Option<f64> {
        self.max_feedrate.get(&axis).copied()
    }
}

impl Default for FeedrateLimits {
    fn default() -> Self {
        Axis::ALL.iter().fold(Self::new(), |limits, &axis| {
            limits.with_axis(axis, Self::DEFAULT_MAX_FEEDRATE)
        })
    }
}

/// Forward/backward jog line pair for one axis
///
/// Immutable once generated; the backward move is the forward move mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JogCommand {
    forward: String,
    backward: String,
    feedrate: u64,
}

impl JogCommand {
    /// Generate the jog pair.
    ///
    /// * `axis` - Axis to move
    /// * `distance_mm` - Signed forward displacement in millimetres
    /// * `speed_percent` - Percentage (0-100) of the axis maximum feedrate
    /// * `limits` - Per-axis maximum feedrates
    pub fn generate(
        axis: Axis,
        distance_mm: f64,
        speed_percent: u32,
        limits: &FeedrateLimits,
    ) -> Result<Self, JogError> {
        let max_feedrate = check_parameters(axis, distance_mm, speed_percent, limits)
            .inspect_err(|e| tracing::warn!("Rejected jog parameters: {}", e))?;

        // Ties go to even, matching `{:.0}` formatting of the feedrate
        let feedrate =
            (max_feedrate * f64::from(speed_percent) / 100.0).round_ties_even() as u64;
        tracing::debug!(axis = %axis, distance_mm, feedrate, "Generated jog command");

        Ok(Self {
            forward: format_jog(axis, distance_mm, feedrate),
            backward: format_jog(axis, -distance_mm, feedrate),
            feedrate,
        })
    }

    /// Jog line moving by the requested distance
    pub fn forward(&self) -> &str {
        &self.forward
    }

    /// Jog line returning to the start point
    pub fn backward(&self) -> &str {
        &self.backward
    }

    /// Commanded feedrate (mm/min)
    pub fn feedrate(&self) -> u64 {
        self.feedrate
    }
}

/// Validate the inputs and return the axis maximum feedrate
fn check_parameters(
    axis: Axis,
    distance_mm: f64,
    speed_percent: u32,
    limits: &FeedrateLimits,
) -> Result<f64, JogError> {
    if speed_percent > 100 {
        return Err(JogError::SpeedOutOfRange(speed_percent));
    }
    // Rejects distances that would print as 0.000 and mirror to -0.000
    if !distance_mm.is_finite() || (distance_mm * 1000.0).round() == 0.0 {
        return Err(JogError::InvalidDistance(distance_mm));
    }
    limits
        .max_feedrate(axis)
        .ok_or(JogError::MissingFeedrateLimit(axis.letter()))
}

fn format_jog(axis: Axis, distance_mm: f64, feedrate: u64) -> String {
    format!("$J=G91 G21 F{} {}{:.3}", feedrate, axis.letter(), distance_mm)
}
