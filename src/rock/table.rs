use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::EngulfmentError;

// ---------------------------------------------------------------------------
// Reference table files
// ---------------------------------------------------------------------------

/// Solar photosphere composition (log abundance per element).
pub const SOLAR_TABLE: &str = "asplund2009.csv";
/// Atomic weights per element.
pub const ATOMIC_TABLE: &str = "atomicmass.csv";
/// Bulk Earth composition (ppm per element).
pub const EARTH_TABLE: &str = "mcdonough2003.csv";

#[derive(Debug, Deserialize)]
struct SolarRow {
    #[serde(rename = "Z")]
    z: u32,
    element: String,
    photosphere: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AtomicRow {
    element: String,
    #[serde(rename = "Name")]
    name: String,
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct EarthRow {
    element: String,
    bulk: Option<f64>,
}

// ---------------------------------------------------------------------------
// AbundanceTable
// ---------------------------------------------------------------------------

/// One joined row per element. Fields present in only one source table keep
/// `None` here; the derived fractions fill the missing side with a
/// zero-equivalent (weight 0, log abundance 0, bulk 0). That fill is a
/// modelling approximation, not a statistically justified imputation.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementEntry {
    /// Atomic number; absent for elements only seen in the Earth table.
    pub z: Option<u32>,
    /// Element symbol, the join key.
    pub element: String,
    /// Element name from the atomic-weight table.
    pub name: Option<String>,
    /// Atomic weight; required whenever the element has a photosphere entry.
    pub weight: Option<f64>,
    /// Log-scale solar photosphere abundance.
    pub photosphere: Option<f64>,
    /// Bulk Earth composition in ppm.
    pub bulk: Option<f64>,
    /// Normalised photosphere mass fraction; sums to 1 over the table.
    pub f_photo: f64,
    /// Bulk Earth mass fraction (ppm / 1e6).
    pub f_rock: f64,
}

/// The joined elemental reference table. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceTable {
    /// Solar-table rows in file order, then Earth-only rows in file order.
    pub entries: Vec<ElementEntry>,
}

impl AbundanceTable {
    /// Load and join the three reference tables from an explicit data
    /// directory.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let solar: Vec<SolarRow> = read_table(&data_dir.join(SOLAR_TABLE))?;
        let atomic: Vec<AtomicRow> = read_table(&data_dir.join(ATOMIC_TABLE))?;
        let earth: Vec<EarthRow> = read_table(&data_dir.join(EARTH_TABLE))?;
        Self::build(solar, atomic, earth)
    }

    /// Left join solar→atomic (weight required), then outer join with the
    /// Earth composition, then derive the normalised fractions.
    fn build(
        solar: Vec<SolarRow>,
        atomic: Vec<AtomicRow>,
        earth: Vec<EarthRow>,
    ) -> Result<Self> {
        let weights: HashMap<&str, &AtomicRow> = atomic
            .iter()
            .map(|row| (row.element.as_str(), row))
            .collect();
        let mut bulk: HashMap<&str, Option<f64>> = earth
            .iter()
            .map(|row| (row.element.as_str(), row.bulk))
            .collect();

        let mut entries = Vec::with_capacity(solar.len());
        for row in &solar {
            // Weight is required to normalise f_photo; no zero-fill here.
            let atomic_row = weights
                .get(row.element.as_str())
                .ok_or_else(|| EngulfmentError::MissingWeight(row.element.clone()))?;
            entries.push(ElementEntry {
                z: Some(row.z),
                element: row.element.clone(),
                name: Some(atomic_row.name.clone()),
                weight: Some(atomic_row.weight),
                photosphere: row.photosphere,
                bulk: bulk.remove(row.element.as_str()).flatten(),
                f_photo: 0.0,
                f_rock: 0.0,
            });
        }
        // Outer-join remainder: elements only present in the Earth table.
        for row in &earth {
            if let Some(value) = bulk.remove(row.element.as_str()) {
                entries.push(ElementEntry {
                    z: None,
                    element: row.element.clone(),
                    name: None,
                    weight: None,
                    photosphere: None,
                    bulk: value,
                    f_photo: 0.0,
                    f_rock: 0.0,
                });
            }
        }

        // Zero-equivalent fills: missing photosphere → log abundance 0,
        // missing weight (Earth-only rows) → 0, missing bulk → 0 ppm.
        let norm: f64 = entries
            .iter()
            .map(|e| e.weight.unwrap_or(0.0) * 10f64.powf(e.photosphere.unwrap_or(0.0)))
            .sum();
        ensure!(norm > 0.0, "photosphere normalisation sum is zero");

        for e in &mut entries {
            e.f_photo =
                e.weight.unwrap_or(0.0) * 10f64.powf(e.photosphere.unwrap_or(0.0)) / norm;
            e.f_rock = e.bulk.unwrap_or(0.0) / 1e6;
        }

        Ok(AbundanceTable { entries })
    }

    /// Rows missing either a photosphere or a bulk abundance — the elements
    /// whose fractions lean on the zero-fill approximation. For inspection.
    pub fn missing_abundances(&self) -> Vec<&ElementEntry> {
        self.entries
            .iter()
            .filter(|e| e.photosphere.is_none() || e.bulk.is_none())
            .collect()
    }

    /// Look up one element by symbol.
    pub fn get(&self, element: &str) -> Option<&ElementEntry> {
        self.entries.iter().find(|e| e.element == element)
    }
}

/// Read a delimited reference table: header row, optional `#` comment
/// lines, whitespace after delimiters tolerated.
fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows = Vec::new();
    for (row, result) in reader.deserialize().enumerate() {
        rows.push(result.with_context(|| format!("{} row {row}", path.display()))?);
    }
    Ok(rows)
}
