//! Data-loading utilities for a planet-engulfment abundance study.
//!
//! Two independent pieces:
//!
//! * [`spectra`] — read survey spectra (FITS, plain or gzipped) or restore a
//!   saved parquet container, cross-match filenames against the stellar
//!   catalog, build per-pixel quality masks, and drop degenerate spectra.
//! * [`rock`] — join the elemental reference tables and evaluate the
//!   rock-mixing abundance-enrichment function and its derivatives.
//!
//! All loaders take explicit paths; the crate holds no global resource
//! directory.

pub mod error;
pub mod fits;
pub mod rock;
pub mod spectra;

pub use error::EngulfmentError;
pub use rock::model::{ALPHA_M, RockDerivative};
pub use rock::table::AbundanceTable;
pub use spectra::loader::{
    DatasetSource, load_dataset, load_lookup, load_reference_grid, save_dataset,
};
pub use spectra::model::{SpectralDataset, Spectrum};
