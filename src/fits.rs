//! Minimal FITS image reading.
//!
//! The survey spectra come as single-HDU FITS images (plane 0 = flux,
//! plane 1 = inverse variance), optionally gzip-compressed. This reader
//! covers exactly that shape: a primary header followed by a 2-D data
//! array in big-endian order, laid out in 2880-byte blocks of
//! 80-character cards. Reading goes through `impl Read` so compressed
//! files can be streamed through a `GzDecoder` without a temp file.

use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result, bail};

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

/// A decoded primary-HDU image, row-major.
#[derive(Debug, Clone)]
pub struct FitsImage {
    /// NAXIS1 — samples per row.
    pub width: usize,
    /// NAXIS2 — number of rows (data planes).
    pub height: usize,
    data: Vec<f64>,
}

impl FitsImage {
    /// Borrow one data plane (row), or `None` past the end.
    pub fn plane(&self, index: usize) -> Option<&[f64]> {
        if index >= self.height {
            return None;
        }
        let start = index * self.width;
        Some(&self.data[start..start + self.width])
    }
}

struct Header {
    cards: HashMap<String, String>,
}

impl Header {
    fn require_i64(&self, keyword: &str) -> Result<i64> {
        self.cards
            .get(keyword)
            .and_then(|v| v.parse::<i64>().ok())
            .with_context(|| format!("FITS header missing keyword {keyword}"))
    }

    fn get_f64(&self, keyword: &str) -> Option<f64> {
        // FITS allows Fortran-style 'D' exponents.
        let raw = self.cards.get(keyword)?;
        raw.replace(['D', 'd'], "E").parse::<f64>().ok()
    }
}

/// Read the primary image from a FITS stream.
pub fn read_image<R: Read>(mut reader: R) -> Result<FitsImage> {
    let header = read_header(&mut reader)?;

    let bitpix = header.require_i64("BITPIX")?;
    let naxis = header.require_i64("NAXIS")?;
    if naxis != 2 {
        bail!("expected a 2-D primary image, got NAXIS = {naxis}");
    }
    let width = header.require_i64("NAXIS1")? as usize;
    let height = header.require_i64("NAXIS2")? as usize;

    let bzero = header.get_f64("BZERO").unwrap_or(0.0);
    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);

    let n = width * height;
    let mut data = match bitpix {
        16 => read_be(&mut reader, n, |c: [u8; 2]| i16::from_be_bytes(c) as f64)?,
        32 => read_be(&mut reader, n, |c: [u8; 4]| i32::from_be_bytes(c) as f64)?,
        -32 => read_be(&mut reader, n, |c: [u8; 4]| f32::from_be_bytes(c) as f64)?,
        -64 => read_be(&mut reader, n, f64::from_be_bytes)?,
        other => bail!("unsupported BITPIX: {other}"),
    };

    if bscale != 1.0 || bzero != 0.0 {
        for v in &mut data {
            *v = *v * bscale + bzero;
        }
    }

    Ok(FitsImage {
        width,
        height,
        data,
    })
}

/// Read header blocks until the END card; data starts at the next
/// 2880-byte boundary, which block-at-a-time reading lands on for free.
fn read_header<R: Read>(reader: &mut R) -> Result<Header> {
    let mut cards = HashMap::new();
    let mut block = [0u8; BLOCK_SIZE];

    'blocks: loop {
        reader
            .read_exact(&mut block)
            .context("reading FITS header block")?;

        for card in block.chunks_exact(CARD_SIZE) {
            let keyword = std::str::from_utf8(&card[..8]).unwrap_or("").trim();
            if keyword == "END" {
                break 'blocks;
            }
            if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
                continue;
            }
            // Value indicator is a literal "= " at bytes 8..10.
            if card[8] != b'=' || card[9] != b' ' {
                continue;
            }
            let mut value = std::str::from_utf8(&card[10..]).unwrap_or("").trim();
            if let Some(pos) = value.find('/') {
                value = value[..pos].trim();
            }
            cards.insert(keyword.to_string(), value.to_string());
        }
    }

    Ok(Header { cards })
}

fn read_be<R: Read, const W: usize>(
    reader: &mut R,
    count: usize,
    decode: impl Fn([u8; W]) -> f64,
) -> Result<Vec<f64>> {
    let mut buffer = vec![0u8; count * W];
    reader
        .read_exact(&mut buffer)
        .context("FITS data array truncated")?;
    Ok(buffer
        .chunks_exact(W)
        .map(|chunk| {
            let mut bytes = [0u8; W];
            bytes.copy_from_slice(chunk);
            decode(bytes)
        })
        .collect())
}
