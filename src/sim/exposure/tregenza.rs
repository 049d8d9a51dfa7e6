use serde::{Deserialize, Serialize};

/// Number of horizontal patch rows (without the zenith cap).
pub const NUM_SKY_ROWS: usize = 7;

/// Number of rows including the zenith cap.
pub const NUM_ROWS: usize = NUM_SKY_ROWS + 1;

/// Number of patches in each row, from the horizon up, zenith last.
pub const ROW_PATCH_COUNTS: [usize; NUM_ROWS] = [30, 30, 24, 24, 18, 12, 6, 1];

/// Total number of sky patches (144 + zenith).
pub const NUM_PATCHES: usize = 145;

/// Solid angle (sr) of a single patch in each row, zenith last.
///
/// `Σ count * weight` covers the hemisphere (2π sr).
pub const ROW_WEIGHTS: [f64; NUM_ROWS] = [
    0.0435449227,
    0.0416418006,
    0.0473984151,
    0.0406730411,
    0.0428934136,
    0.0445221864,
    0.0455168385,
    0.0344199465,
];

/// Tregenza subdivision of the sky hemisphere.
///
/// Constructed once and shared by reference between the sky dome generator
/// and the radiation matrix decoder. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TregenzaScheme {
    row_weights: [f64; NUM_ROWS],
}

impl TregenzaScheme {
    pub fn new() -> Self {
        Self {
            row_weights: ROW_WEIGHTS,
        }
    }

    /// Scheme with custom row weights (same patch layout).
    pub fn with_row_weights(row_weights: [f64; NUM_ROWS]) -> Self {
        Self { row_weights }
    }

    pub fn row_patch_counts(&self) -> &[usize; NUM_ROWS] {
        &ROW_PATCH_COUNTS
    }

    pub fn row_weights(&self) -> &[f64; NUM_ROWS] {
        &self.row_weights
    }

    pub fn num_patches(&self) -> usize {
        NUM_PATCHES
    }

    /// Vertical angular extent of one row: `PI / (2 * NUM_ROWS - 1)` (12°).
    pub fn row_angle(&self) -> f64 {
        std::f64::consts::PI / (2 * NUM_ROWS - 1) as f64
    }

    /// Row index of sky patch `patch`, resolved by cumulative patch counts.
    ///
    /// Returns `None` for `patch >= 145`.
    pub fn row_of(&self, patch: usize) -> Option<usize> {
        let mut end = 0;
        for (row, count) in ROW_PATCH_COUNTS.iter().enumerate() {
            end += count;
            if patch < end {
                return Some(row);
            }
        }
        None
    }

    /// Index of the first patch of each row.
    pub fn row_starts(&self) -> [usize; NUM_ROWS] {
        let mut starts = [0; NUM_ROWS];
        let mut acc = 0;
        for (row, count) in ROW_PATCH_COUNTS.iter().enumerate() {
            starts[row] = acc;
            acc += count;
        }
        starts
    }

    /// Solid angle covered by all patches: `Σ count * weight`.
    pub fn total_solid_angle(&self) -> f64 {
        ROW_PATCH_COUNTS
            .iter()
            .zip(self.row_weights.iter())
            .map(|(&n, &w)| n as f64 * w)
            .sum()
    }
}

impl Default for TregenzaScheme {
    fn default() -> Self {
        Self::new()
    }
}
