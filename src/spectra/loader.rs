use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Float64Builder, Int64Array, LargeListArray,
    ListArray, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use flate2::read::GzDecoder;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;

use crate::error::EngulfmentError;
use crate::fits;
use super::model::{SpectralDataset, Spectrum};
use super::{filter, mask};

// ---------------------------------------------------------------------------
// Survey constants
// ---------------------------------------------------------------------------

/// The reference template grid runs 32 samples past the usable science
/// range; directory-mode loading trims that tail from the grid and from
/// every spectrum.
pub const GRID_TAIL_TRIM: usize = 32;

/// Prefix the normalisation pipeline prepends to survey filenames. Stripped
/// to recover the catalog filename.
pub const NORMALIZED_PREFIX: &str = "Ho_normalized_";

/// Schema-metadata key under which the container stores the wavelength grid.
const WAVE_METADATA_KEY: &str = "wave";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Where a dataset comes from. One factory, two sources.
pub enum DatasetSource<'a> {
    /// Scan a directory of per-star `*.fits` / `*.fits.gz` files and
    /// cross-match them against the catalog lookup table. `wave` is the
    /// full-length reference grid (trimmed here, not by the caller).
    Directory {
        dir: &'a Path,
        wave: &'a [f64],
        lookup: &'a [String],
    },
    /// Restore a previously saved parquet container.
    Container(&'a Path),
}

/// Build a [`SpectralDataset`] from either source. Quality masking and
/// degenerate-spectrum filtering always run afterwards, so a restored
/// dataset is indistinguishable from a freshly scanned one.
pub fn load_dataset(source: DatasetSource<'_>) -> Result<SpectralDataset> {
    let mut dataset = match source {
        DatasetSource::Directory { dir, wave, lookup } => scan_directory(dir, wave, lookup)?,
        DatasetSource::Container(path) => load_container(path)?,
    };

    mask::apply_masks(&mut dataset);
    filter::drop_degenerate_spectra(&mut dataset);
    Ok(dataset)
}

/// Load the full-length reference wavelength grid from a CSV with a
/// `wavelength` column.
pub fn load_reference_grid(path: &Path) -> Result<Vec<f64>> {
    let mut reader = table_reader(path)?;
    let col = reader
        .headers()
        .context("reading reference grid headers")?
        .iter()
        .position(|h| h == "wavelength")
        .context("reference grid missing 'wavelength' column")?;

    let mut wave = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reference grid row {row}"))?;
        let value = record
            .get(col)
            .unwrap_or("")
            .parse::<f64>()
            .with_context(|| format!("reference grid row {row}: not a number"))?;
        wave.push(value);
    }
    Ok(wave)
}

/// Load the catalog lookup table: a CSV with a `filename` column whose row
/// position is the catalog row index.
pub fn load_lookup(path: &Path) -> Result<Vec<String>> {
    let mut reader = table_reader(path)?;
    let col = reader
        .headers()
        .context("reading lookup headers")?
        .iter()
        .position(|h| h == "filename")
        .context("lookup table missing 'filename' column")?;

    let mut names = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("lookup row {row}"))?;
        names.push(record.get(col).unwrap_or("").to_string());
    }
    Ok(names)
}

fn table_reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

// ---------------------------------------------------------------------------
// Directory mode
// ---------------------------------------------------------------------------

fn scan_directory(dir: &Path, full_wave: &[f64], lookup: &[String]) -> Result<SpectralDataset> {
    ensure!(
        full_wave.len() > GRID_TAIL_TRIM,
        "reference grid has {} samples, need more than {GRID_TAIL_TRIM}",
        full_wave.len()
    );
    let usable = full_wave.len() - GRID_TAIL_TRIM;

    let catalog_row: HashMap<&str, usize> = lookup
        .iter()
        .enumerate()
        .map(|(row, name)| (name.as_str(), row))
        .collect();

    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("scanning {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.ends_with(".fits") || name.ends_with(".fits.gz")
        })
        .collect();
    paths.sort();

    let mut spectra = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let display = name.strip_prefix(NORMALIZED_PREFIX).unwrap_or(name).to_string();

        let idx = *catalog_row
            .get(display.as_str())
            .ok_or_else(|| EngulfmentError::UnmatchedFilename(display.clone()))?
            as i64;

        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let image = if name.ends_with(".gz") {
            fits::read_image(GzDecoder::new(BufReader::new(file)))
        } else {
            fits::read_image(BufReader::new(file))
        }
        .with_context(|| format!("reading {}", path.display()))?;

        if image.width != full_wave.len() {
            bail!(
                "{}: expected {} samples per plane, got {}",
                path.display(),
                full_wave.len(),
                image.width
            );
        }
        let (Some(flux_plane), Some(ivar_plane)) = (image.plane(0), image.plane(1)) else {
            bail!("{}: expected at least two data planes", path.display());
        };

        debug!("loaded {display} (catalog row {idx})");
        spectra.push(Spectrum {
            filename: display,
            idx,
            flux: flux_plane[..usable].to_vec(),
            ivar: ivar_plane[..usable].to_vec(),
            mask: Vec::new(),
        });
    }

    Ok(SpectralDataset {
        wave: full_wave[..usable].to_vec(),
        spectra,
    })
}

// ---------------------------------------------------------------------------
// Container persistence (parquet)
// ---------------------------------------------------------------------------

/// Save the dataset to a parquet container. Columns `flux`, `ivar`,
/// `filename`, `idx` hold one row per star; the shared wavelength grid is
/// embedded in the schema metadata. The mask is not persisted — it is
/// rebuilt on every load.
pub fn save_dataset(dataset: &SpectralDataset, path: &Path) -> Result<()> {
    let mut flux_builder = ListBuilder::new(Float64Builder::new());
    let mut ivar_builder = ListBuilder::new(Float64Builder::new());
    for sp in &dataset.spectra {
        flux_builder.values().append_slice(&sp.flux);
        flux_builder.append(true);
        ivar_builder.values().append_slice(&sp.ivar);
        ivar_builder.append(true);
    }
    let flux_array: ArrayRef = Arc::new(flux_builder.finish());
    let ivar_array: ArrayRef = Arc::new(ivar_builder.finish());

    let filename_array: ArrayRef = Arc::new(StringArray::from(
        dataset
            .spectra
            .iter()
            .map(|sp| sp.filename.as_str())
            .collect::<Vec<_>>(),
    ));
    let idx_array: ArrayRef = Arc::new(Int64Array::from(
        dataset.spectra.iter().map(|sp| sp.idx).collect::<Vec<_>>(),
    ));

    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let metadata = HashMap::from([(
        WAVE_METADATA_KEY.to_string(),
        serde_json::to_string(&dataset.wave).context("encoding wavelength grid")?,
    )]);
    let schema = Arc::new(Schema::new_with_metadata(
        vec![
            Field::new("flux", DataType::List(item.clone()), false),
            Field::new("ivar", DataType::List(item), false),
            Field::new("filename", DataType::Utf8, false),
            Field::new("idx", DataType::Int64, false),
        ],
        metadata,
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![flux_array, ivar_array, filename_array, idx_array],
    )
    .context("building container record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();
    let mut writer =
        ArrowWriter::try_new(file, schema, Some(props)).context("creating parquet writer")?;
    writer.write(&batch).context("writing container")?;
    writer.close().context("closing container")?;
    Ok(())
}

fn load_container(path: &Path) -> Result<SpectralDataset> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();

    let wave_json = schema
        .metadata()
        .get(WAVE_METADATA_KEY)
        .ok_or(EngulfmentError::MissingField("wave"))?;
    let wave: Vec<f64> =
        serde_json::from_str(wave_json).context("parsing container 'wave' metadata")?;

    let flux_idx = column_index(&schema, "flux")?;
    let ivar_idx = column_index(&schema, "ivar")?;
    let filename_idx = column_index(&schema, "filename")?;
    let idx_idx = column_index(&schema, "idx")?;

    let reader = builder.build().context("building parquet reader")?;
    let mut spectra = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading container record batch")?;

        let filenames = batch
            .column(filename_idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .context("'filename' column is not Utf8")?;
        let idxs = batch
            .column(idx_idx)
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("'idx' column is not Int64")?;

        for row in 0..batch.num_rows() {
            let flux = extract_f64_list(batch.column(flux_idx), row)
                .with_context(|| format!("row {row}: failed to read 'flux'"))?;
            let ivar = extract_f64_list(batch.column(ivar_idx), row)
                .with_context(|| format!("row {row}: failed to read 'ivar'"))?;

            if flux.len() != wave.len() || ivar.len() != wave.len() {
                bail!(
                    "row {row}: spectrum has {} / {} samples, grid has {}",
                    flux.len(),
                    ivar.len(),
                    wave.len()
                );
            }

            spectra.push(Spectrum {
                filename: filenames.value(row).to_string(),
                idx: idxs.value(row),
                flux,
                ivar,
                mask: Vec::new(),
            });
        }
    }

    Ok(SpectralDataset { wave, spectra })
}

fn column_index(schema: &Schema, name: &'static str) -> Result<usize> {
    schema
        .index_of(name)
        .map_err(|_| EngulfmentError::MissingField(name).into())
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "list inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}
