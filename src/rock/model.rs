use std::path::Path;

use anyhow::Result;

use super::table::AbundanceTable;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

/// IAU 2015 nominal mass ratio M_sun / M_earth.
pub const EARTH_MASSES_PER_SOLAR_MASS: f64 = 332_946.0487;

/// Mass of the Sun's convective zone (0.02 solar masses) in Earth masses.
/// All mixing masses `m` below are in Earth masses too.
pub const ALPHA_M: f64 = 0.02 * EARTH_MASSES_PER_SOLAR_MASS;

// ---------------------------------------------------------------------------
// RockDerivative
// ---------------------------------------------------------------------------

/// Closed-form model of how mixing `m` Earth masses of rock into the solar
/// convective zone enriches the photospheric abundance of each element.
/// Element order matches [`AbundanceTable::entries`].
#[derive(Debug, Clone)]
pub struct RockDerivative {
    pub table: AbundanceTable,
}

impl RockDerivative {
    pub fn new(table: AbundanceTable) -> Self {
        RockDerivative { table }
    }

    /// Build the model from the reference tables in `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        Ok(RockDerivative::new(AbundanceTable::load(data_dir)?))
    }

    /// Log-abundance enrichment per element after mixing in mass `m`:
    /// `log10(1 + f_rock/f_photo · m/ALPHA_M)`.
    pub fn xh(&self, m: f64) -> Vec<f64> {
        self.table
            .entries
            .iter()
            .map(|e| (1.0 + e.f_rock / e.f_photo * (m / ALPHA_M)).log10())
            .collect()
    }

    /// Closed-form derivative of [`xh`](Self::xh) with respect to `m`.
    pub fn dxh_dm_exact(&self, m: f64) -> Vec<f64> {
        self.table
            .entries
            .iter()
            .map(|e| {
                e.f_rock / (e.f_photo + e.f_rock * m / ALPHA_M)
                    / ALPHA_M
                    / std::f64::consts::LN_10
            })
            .collect()
    }

    /// Finite-difference derivative between two mixing masses. The caller
    /// must ensure `m2 != m1`.
    pub fn dxh_dm_avg(&self, m1: f64, m2: f64) -> Vec<f64> {
        self.xh(m2)
            .iter()
            .zip(self.xh(m1))
            .map(|(x2, x1)| (x2 - x1) / (m2 - m1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rock::table::ElementEntry;
    use approx::assert_relative_eq;

    fn entry(element: &str, f_photo: f64, f_rock: f64) -> ElementEntry {
        ElementEntry {
            z: None,
            element: element.to_string(),
            name: None,
            weight: None,
            photosphere: None,
            bulk: None,
            f_photo,
            f_rock,
        }
    }

    fn two_element_model() -> RockDerivative {
        RockDerivative::new(AbundanceTable {
            entries: vec![entry("H", 0.9, 0.0), entry("Fe", 0.1, 0.05)],
        })
    }

    #[test]
    fn enrichment_at_one_convective_zone_mass() {
        let model = two_element_model();
        let xh = model.xh(ALPHA_M);

        // H receives no rock, so its abundance does not move.
        assert_relative_eq!(xh[0], 0.0);
        // Fe: log10(1 + 0.05/0.1 · 1) = log10(1.5).
        assert_relative_eq!(xh[1], 1.5f64.log10(), max_relative = 1e-12);
    }

    #[test]
    fn exact_derivative_matches_a_tiny_finite_difference() {
        let model = two_element_model();
        let m = 2_000.0;
        let h = 1e-4;

        let exact = model.dxh_dm_exact(m);
        let numeric = model.dxh_dm_avg(m - h, m + h);
        assert_relative_eq!(exact[1], numeric[1], max_relative = 1e-8);
    }

    #[test]
    fn average_derivative_converges_to_exact_at_the_midpoint() {
        let model = two_element_model();
        let m = 2_000.0;

        let error = |dm: f64| {
            let avg = model.dxh_dm_avg(m - dm / 2.0, m + dm / 2.0)[1];
            let exact = model.dxh_dm_exact(m)[1];
            ((avg - exact) / exact).abs()
        };

        let coarse = error(100.0);
        let fine = error(1.0);
        assert!(fine < coarse, "finite difference must tighten: {fine} vs {coarse}");
        assert!(fine < 1e-8);
    }
}
