//! Discretisation of telemetry into Q-table keys.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::telemetry::TelemetrySample;

/// Grid for the three position axes.
pub const POSITION_GRID: f64 = 10.0;
/// Grid for the speed reading.
pub const SPEED_GRID: f64 = 5.0;

/// Snap `value` to the nearest multiple of `grid`, ties to even.
///
/// Non-finite input propagates.
pub fn bucket(value: f64, grid: f64) -> f64 {
    (value / grid).round_ties_even() * grid
}

/// Bucketed telemetry: the row key of the Q-table.
///
/// Buckets are whole multiples of their grid but kept as `f64` so that a
/// NaN or infinite reading still yields a (non-physical) key. Equality and
/// hashing compare bit patterns, with `-0.0` folded into `0.0` and every NaN
/// into a single quiet NaN.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "StateTuple", into = "StateTuple")]
pub struct StateKey {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub speed: f64,
    pub checkpoint: i64,
}

/// On-disk shape of a [`StateKey`]: `[x, y, z, speed, checkpoint]`.
pub type StateTuple = (f64, f64, f64, f64, i64);

fn canonical(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

impl StateKey {
    pub fn new(x: f64, y: f64, z: f64, speed: f64, checkpoint: i64) -> Self {
        Self {
            x: canonical(x),
            y: canonical(y),
            z: canonical(z),
            speed: canonical(speed),
            checkpoint,
        }
    }

    pub fn position(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Euclidean distance between the position buckets of two keys.
    pub fn distance_to(&self, other: &StateKey) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn buckets(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.speed]
    }
}

impl PartialEq for StateKey {
    fn eq(&self, other: &Self) -> bool {
        self.checkpoint == other.checkpoint
            && self
                .buckets()
                .iter()
                .zip(other.buckets().iter())
                .all(|(a, b)| canonical(*a).to_bits() == canonical(*b).to_bits())
    }
}

impl Eq for StateKey {}

impl Hash for StateKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.buckets() {
            canonical(b).to_bits().hash(state);
        }
        self.checkpoint.hash(state);
    }
}

impl Ord for StateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.buckets()
            .iter()
            .zip(other.buckets().iter())
            .map(|(a, b)| canonical(*a).total_cmp(&canonical(*b)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
            .then(self.checkpoint.cmp(&other.checkpoint))
    }
}

impl PartialOrd for StateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<StateTuple> for StateKey {
    fn from((x, y, z, speed, checkpoint): StateTuple) -> Self {
        StateKey::new(x, y, z, speed, checkpoint)
    }
}

impl From<StateKey> for StateTuple {
    fn from(key: StateKey) -> Self {
        (key.x, key.y, key.z, key.speed, key.checkpoint)
    }
}

/// Maps samples onto the fixed grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateEncoder {
    pub position_grid: f64,
    pub speed_grid: f64,
}

impl Default for StateEncoder {
    fn default() -> Self {
        Self {
            position_grid: POSITION_GRID,
            speed_grid: SPEED_GRID,
        }
    }
}

impl StateEncoder {
    pub fn encode(&self, sample: &TelemetrySample) -> StateKey {
        let (x, y, z) = sample.pos;
        StateKey::new(
            bucket(x, self.position_grid),
            bucket(y, self.position_grid),
            bucket(z, self.position_grid),
            bucket(sample.speed, self.speed_grid),
            sample.checkpoint,
        )
    }
}

/// Encode with the default grids.
pub fn encode(sample: &TelemetrySample) -> StateKey {
    StateEncoder::default().encode(sample)
}
