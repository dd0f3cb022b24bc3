use log::info;

use super::model::SpectralDataset;

// ---------------------------------------------------------------------------
// Degenerate-spectrum filtering
// ---------------------------------------------------------------------------

/// Longest tolerated run of identical consecutive flux values. Anything
/// longer is a saturation / broken-normalisation signature and the star is
/// dropped. The boundary is exclusive: a run of exactly this length stays.
pub const MAX_CONSTANT_RUN: usize = 50;

/// Length of the longest run of bit-identical consecutive values.
///
/// Equality is on the raw bit pattern, not numeric: two values extend a run
/// only when `to_bits` matches. Real flux values never repeat bit-exactly,
/// so any long run comes from the pipeline writing a constant.
pub fn longest_constant_run(values: &[f64]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;

    for &v in values {
        let bits = v.to_bits();
        if previous == Some(bits) {
            current += 1;
        } else {
            current = 1;
            previous = Some(bits);
        }
        longest = longest.max(current);
    }
    longest
}

/// Drop every star whose flux contains a constant run longer than
/// [`MAX_CONSTANT_RUN`]. Removal is whole-row, so all per-star fields stay
/// aligned and the relative order of survivors is preserved. Returns the
/// number of stars removed; this is diagnostic, never an error.
pub fn drop_degenerate_spectra(dataset: &mut SpectralDataset) -> usize {
    let before = dataset.len();
    dataset
        .spectra
        .retain(|sp| longest_constant_run(&sp.flux) <= MAX_CONSTANT_RUN);
    let removed = before - dataset.len();

    if removed > 0 {
        info!(
            "dropped {removed} degenerate spectra (constant run > {MAX_CONSTANT_RUN} pixels)"
        );
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectra::model::Spectrum;

    fn star(name: &str, flux: Vec<f64>) -> Spectrum {
        let n = flux.len();
        Spectrum {
            filename: name.to_string(),
            idx: 0,
            flux,
            ivar: vec![1.0; n],
            mask: vec![false; n],
        }
    }

    #[test]
    fn run_lengths() {
        assert_eq!(longest_constant_run(&[]), 0);
        assert_eq!(longest_constant_run(&[1.0, 2.0, 3.0]), 1);
        assert_eq!(longest_constant_run(&[2.0, 2.0, 1.0, 1.0, 1.0]), 3);
        // Repeated value does not have to be zero.
        assert_eq!(longest_constant_run(&[0.5, 7.25, 7.25, 7.25, 0.5]), 3);
    }

    #[test]
    fn run_detection_is_bit_exact() {
        // 0.1 + 0.2 != 0.3 in binary, so this is not a run of two.
        assert_eq!(longest_constant_run(&[0.1 + 0.2, 0.3]), 1);
        // Identical NaN payloads do extend a run.
        assert_eq!(longest_constant_run(&[f64::NAN, f64::NAN]), 2);
    }

    #[test]
    fn boundary_is_exclusive_at_fifty() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut borderline = vec![1.0; 50];
        borderline.extend((0..30).map(|i| i as f64));
        let mut degenerate = vec![1.0; 51];
        degenerate.extend((0..30).map(|i| i as f64));

        let mut dataset = SpectralDataset {
            wave: (0..80).map(f64::from).collect(),
            spectra: vec![star("keep.fits.gz", borderline), star("drop.fits.gz", degenerate)],
        };

        let removed = drop_degenerate_spectra(&mut dataset);
        assert_eq!(removed, 1);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.spectra[0].filename, "keep.fits.gz");
    }

    #[test]
    fn row_fields_stay_aligned_after_filtering() {
        let mut dataset = SpectralDataset {
            wave: (0..60).map(f64::from).collect(),
            spectra: vec![
                star("a", (0..60).map(f64::from).collect()),
                star("b", vec![3.0; 60]),
                star("c", (0..60).map(|i| f64::from(i) * 0.5).collect()),
            ],
        };

        drop_degenerate_spectra(&mut dataset);

        let names: Vec<&str> = dataset.spectra.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        for sp in &dataset.spectra {
            assert_eq!(sp.flux.len(), dataset.n_pixels());
            assert_eq!(sp.ivar.len(), dataset.n_pixels());
            assert_eq!(sp.mask.len(), dataset.n_pixels());
        }
    }
}
