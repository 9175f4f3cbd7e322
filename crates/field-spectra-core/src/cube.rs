/// Borrowed view of a hyperspectral cube.
///
/// Samples are stored row-major, band-interleaved by pixel:
/// `data[(row * cols + col) * bands + band]`, `len = rows * cols * bands`.
#[derive(Clone, Copy, Debug)]
pub struct CubeView<'a> {
    pub rows: usize,
    pub cols: usize,
    pub bands: usize,
    pub data: &'a [f64],
}

/// Owned cube; see [`CubeView`] for the sample layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Cube {
    pub rows: usize,
    pub cols: usize,
    pub bands: usize,
    pub data: Vec<f64>,
}

impl Cube {
    /// Cube with every sample set to `value`.
    pub fn filled(rows: usize, cols: usize, bands: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            bands,
            data: vec![value; rows * cols * bands],
        }
    }

    pub fn view(&self) -> CubeView<'_> {
        CubeView {
            rows: self.rows,
            cols: self.cols,
            bands: self.bands,
            data: &self.data,
        }
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, band: usize, value: f64) {
        self.data[(row * self.cols + col) * self.bands + band] = value;
    }
}

impl<'a> CubeView<'a> {
    #[inline]
    pub fn get(&self, row: usize, col: usize, band: usize) -> f64 {
        self.data[(row * self.cols + col) * self.bands + band]
    }

    /// Sum of one band over the full image extent.
    pub fn band_sum(&self, band: usize) -> f64 {
        self.data
            .iter()
            .skip(band)
            .step_by(self.bands)
            .sum()
    }
}
