use super::model::SpectralDataset;

// ---------------------------------------------------------------------------
// Quality masking
// ---------------------------------------------------------------------------

/// Atmospheric emission lines (Å). Pixels near these wavelengths are
/// contaminated by the sky regardless of their per-pixel statistics.
pub const SKY_LINES: [f64; 7] = [4046.0, 4358.0, 5460.0, 5577.0, 6300.0, 6363.0, 6863.0];

/// Half-width of the masked band around each sky line (Å).
pub const SKY_LINE_HALF_WIDTH: f64 = 3.0;

/// Wavelength columns falling inside a sky-line band. The grid is shared by
/// every star, so this is computed once and broadcast to all rows.
pub fn sky_line_columns(wave: &[f64]) -> Vec<bool> {
    wave.iter()
        .map(|&w| {
            SKY_LINES
                .iter()
                .any(|&line| (w - line).abs() <= SKY_LINE_HALF_WIDTH)
        })
        .collect()
}

/// Per-pixel quality mask for one spectrum: `true` where the flux is not
/// finite, the inverse variance is not finite or non-positive, or the
/// column sits on a sky line.
pub fn pixel_mask(flux: &[f64], ivar: &[f64], sky: &[bool]) -> Vec<bool> {
    flux.iter()
        .zip(ivar)
        .zip(sky)
        .map(|((&f, &iv), &on_sky_line)| {
            !f.is_finite() || !iv.is_finite() || iv <= 0.0 || on_sky_line
        })
        .collect()
}

/// Rebuild the quality mask of every spectrum in the dataset.
pub fn apply_masks(dataset: &mut SpectralDataset) {
    let sky = sky_line_columns(&dataset.wave);
    for spectrum in &mut dataset.spectra {
        spectrum.mask = pixel_mask(&spectrum.flux, &spectrum.ivar, &sky);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_columns_cover_three_angstrom_bands() {
        let wave: Vec<f64> = (5570..5585).map(f64::from).collect();
        let sky = sky_line_columns(&wave);

        for (i, &w) in wave.iter().enumerate() {
            let expected = (w - 5577.0).abs() <= 3.0;
            assert_eq!(sky[i], expected, "wavelength {w}");
        }
    }

    #[test]
    fn sky_columns_masked_regardless_of_pixel_quality() {
        // Perfectly healthy flux/ivar still gets masked on a sky line.
        let wave = vec![5576.0, 5600.0];
        let sky = sky_line_columns(&wave);
        let mask = pixel_mask(&[1.0, 1.0], &[2.0, 2.0], &sky);
        assert_eq!(mask, vec![true, false]);
    }

    #[test]
    fn bad_flux_and_ivar_are_masked() {
        let sky = vec![false; 5];
        let flux = [1.0, f64::NAN, f64::INFINITY, 1.0, 1.0];
        let ivar = [1.0, 1.0, 1.0, 0.0, -2.0];
        let mask = pixel_mask(&flux, &ivar, &sky);
        assert_eq!(mask, vec![false, true, true, true, true]);
    }

    #[test]
    fn non_finite_ivar_is_masked() {
        let sky = vec![false; 2];
        let mask = pixel_mask(&[1.0, 1.0], &[f64::NAN, f64::NEG_INFINITY], &sky);
        assert_eq!(mask, vec![true, true]);
    }
}
