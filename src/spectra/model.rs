// ---------------------------------------------------------------------------
// Spectrum – one star's spectrum on the shared wavelength grid
// ---------------------------------------------------------------------------

/// A single star's spectrum plus its bookkeeping. Keeping everything for one
/// star in one struct means row filtering can never desynchronise the flux,
/// inverse variance, mask, filename, and catalog index of a star.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Display filename, the survey prefix already stripped. Unique key for
    /// cross-matching against the stellar catalog.
    pub filename: String,
    /// Row index into the external stellar catalog.
    pub idx: i64,
    /// Flux on the shared wavelength grid.
    pub flux: Vec<f64>,
    /// Per-pixel inverse variance — same length as `flux`.
    pub ivar: Vec<f64>,
    /// Per-pixel quality mask; `true` = pixel excluded from fitting.
    /// Rebuilt at construction time, never persisted.
    pub mask: Vec<bool>,
}

// ---------------------------------------------------------------------------
// SpectralDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full dataset: one shared wavelength grid and N star spectra on it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralDataset {
    /// Shared reference wavelength grid, monotonically increasing, in Å.
    pub wave: Vec<f64>,
    /// All spectra (rows), each index-aligned with `wave`.
    pub spectra: Vec<Spectrum>,
}

impl SpectralDataset {
    /// Number of stars.
    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    /// Whether the dataset holds no spectra.
    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    /// Samples per spectrum (length of the shared grid).
    pub fn n_pixels(&self) -> usize {
        self.wave.len()
    }
}
