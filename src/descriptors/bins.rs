use std::ops::Deref;
use std::sync::LazyLock;

/// Number of distance bins in the descriptor grid.
pub const N_BINS: usize = 113;
/// Centre of the first bin, in Å.
pub const FIRST_BIN: f64 = 2.0;
/// Gap between the first two bins; every following gap grows by the same amount.
pub const BIN_STEP: f64 = 0.004425;

/// Distance grid with linearly growing spacing, shared by every descriptor call.
///
/// Gaps grow by [`BIN_STEP`] each step, so bin `k` sits at
/// `2.0 + BIN_STEP * k * (k + 1) / 2` and the grid reaches ~30 Å. Resolution is
/// concentrated at short range. The values must not change: trained consumers
/// depend on them bin for bin.
#[derive(Debug, Clone, PartialEq)]
pub struct BinGrid {
    centers: [f64; N_BINS],
}

static BIN_GRID: LazyLock<BinGrid> = LazyLock::new(BinGrid::build);

impl BinGrid {
    /// The process-wide grid, built on first use.
    pub fn shared() -> &'static BinGrid {
        &BIN_GRID
    }

    fn build() -> Self {
        let mut centers = [0.0; N_BINS];
        centers[0] = FIRST_BIN;
        let mut step = BIN_STEP;
        for i in 1..N_BINS {
            centers[i] = centers[i - 1] + step;
            step += BIN_STEP;
        }
        Self { centers }
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Largest bin centre; the effective reach of the descriptor.
    pub fn last(&self) -> f64 {
        self.centers[N_BINS - 1]
    }
}

impl Deref for BinGrid {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.centers
    }
}
