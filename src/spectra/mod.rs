/// Spectra layer: core types, loading, masking, and filtering.
///
/// Architecture:
/// ```text
///  survey *.fits(.gz)        saved container (.parquet)
///        │                           │
///        ▼                           ▼
///   ┌──────────┐ scan / restore ┌──────────┐
///   │  loader  │───────────────▶│ Spectral │  wave + Vec<Spectrum>
///   └──────────┘                │ Dataset  │
///                               └──────────┘
///                                     │
///                          ┌──────────┴──────────┐
///                          ▼                     ▼
///                    ┌──────────┐          ┌──────────┐
///                    │   mask   │          │  filter  │
///                    │ sky lines│          │ constant │
///                    │ bad ivar │          │   runs   │
///                    └──────────┘          └──────────┘
/// ```
pub mod filter;
pub mod loader;
pub mod mask;
pub mod model;
