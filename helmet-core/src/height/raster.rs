//! Single-band GeoTIFF decoding and point sampling.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::error::Error;

/// A decoded elevation raster with its georeferencing.
pub(crate) struct Raster {
    width: usize,
    height: usize,
    data: Vec<f64>,
    /// Pixel size in map units (x, y).
    scale: (f64, f64),
    /// Map coordinates of the upper-left raster corner.
    origin: (f64, f64),
}

fn to_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    }
}

impl Raster {
    /// Decode a GeoTIFF from memory. Requires the ModelPixelScale and
    /// ModelTiepoint tags the coverage service always writes.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(Cursor::new(bytes))
            .map_err(|e| Error::RasterError(format!("not a TIFF: {e}")))?;
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| Error::RasterError(format!("missing dimensions: {e}")))?;
        let scale = decoder
            .get_tag_f64_vec(Tag::ModelPixelScaleTag)
            .map_err(|e| Error::RasterError(format!("missing pixel scale: {e}")))?;
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::ModelTiepointTag)
            .map_err(|e| Error::RasterError(format!("missing tiepoint: {e}")))?;
        if scale.len() < 2 || tiepoint.len() < 5 {
            return Err(Error::RasterError(
                "malformed georeferencing tags".to_string(),
            ));
        }
        let data = to_f64(
            decoder
                .read_image()
                .map_err(|e| Error::RasterError(format!("unreadable image: {e}")))?,
        );
        let expected = width as usize * height as usize;
        if data.len() < expected {
            return Err(Error::RasterError(format!(
                "expected {expected} samples, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width: width as usize,
            height: height as usize,
            data,
            scale: (scale[0], scale[1]),
            // Tiepoint maps raster (i, j) = (tp[0], tp[1]) to map
            // (x, y) = (tp[3], tp[4]); the service anchors at (0, 0).
            origin: (
                tiepoint[3] - tiepoint[0] * scale[0],
                tiepoint[4] + tiepoint[1] * scale[1],
            ),
        })
    }

    /// Row and column ranges covering the given map-coordinate bounds,
    /// clamped to the raster extent.
    pub fn window(
        &self,
        min: (f64, f64),
        max: (f64, f64),
    ) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let col0 = (((min.0 - self.origin.0) / self.scale.0).floor()).max(0.0) as usize;
        let col1 = ((((max.0 - self.origin.0) / self.scale.0).ceil()).max(0.0) as usize)
            .min(self.width);
        let row0 = (((self.origin.1 - max.1) / self.scale.1).floor()).max(0.0) as usize;
        let row1 = ((((self.origin.1 - min.1) / self.scale.1).ceil()).max(0.0) as usize)
            .min(self.height);
        (row0.min(row1)..row1, col0.min(col1)..col1)
    }

    /// Map coordinate of a cell's center.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin.0 + (col as f64 + 0.5) * self.scale.0,
            self.origin.1 - (row as f64 + 0.5) * self.scale.1,
        )
    }

    /// Raw cell value without clamping.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    /// Elevation at a map coordinate, clamped to sea level. `None`
    /// outside the raster extent.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let col = ((x - self.origin.0) / self.scale.0).floor();
        let row = ((self.origin.1 - y) / self.scale.1).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        let value = self.data[row * self.width + col];
        if value.is_nan() {
            return None;
        }
        Some(value.max(0.0))
    }
}
