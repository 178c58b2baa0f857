//! Binary morphology over {0, 255} masks.
//!
//! Any nonzero pixel counts as on. Coverage outside the frame counts as off
//! for both operators, so erosion strips features that touch the border and
//! dilation never invents pixels there.

pub mod skeleton;

use image::GrayImage;

use crate::error::PipelineError;

/// On/off pattern swept over the mask by [`erode`] and [`dilate`].
///
/// The anchor sits at `(height / 2, width / 2)`; a cell at `(cy, cx)` covers
/// the input pixel offset by `(cy - anchor_y, cx - anchor_x)` from the output
/// pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl StructuringElement {
    /// Dense square element with every cell on.
    pub fn square(side: u32) -> Result<Self, PipelineError> {
        if side == 0 {
            return Err(PipelineError::Configuration(
                "structuring element side must be positive".into(),
            ));
        }
        Ok(Self {
            width: side,
            height: side,
            cells: vec![true; (side * side) as usize],
        })
    }

    /// Arbitrary pattern from row-major on/off cells.
    pub fn from_cells(width: u32, height: u32, cells: Vec<bool>) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::Configuration(
                "structuring element dimensions must be positive".into(),
            ));
        }
        if cells.len() != (width * height) as usize {
            return Err(PipelineError::Configuration(format!(
                "structuring element needs {} cells, got {}",
                width * height,
                cells.len()
            )));
        }
        if !cells.iter().any(|&c| c) {
            return Err(PipelineError::Configuration(
                "structuring element needs at least one on cell".into(),
            ));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Element shape (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// On-cell offsets relative to the anchor, row-major.
    fn offsets(&self) -> Vec<(i64, i64)> {
        let ay = i64::from(self.height / 2);
        let ax = i64::from(self.width / 2);
        let mut out = Vec::with_capacity(self.cells.len());
        for cy in 0..i64::from(self.height) {
            for cx in 0..i64::from(self.width) {
                if self.cells[(cy * i64::from(self.width) + cx) as usize] {
                    out.push((cy - ay, cx - ax));
                }
            }
        }
        out
    }
}

fn check_fit(mask: &GrayImage, element: &StructuringElement) -> Result<(), PipelineError> {
    let (w, h) = mask.dimensions();
    let (ew, eh) = element.dimensions();
    if ew > w || eh > h {
        return Err(PipelineError::Dimension {
            frame: (w, h),
            window: (ew, eh),
        });
    }
    Ok(())
}

/// Binary erosion: output on iff every on cell covers an on pixel.
pub fn erode(mask: &GrayImage, element: &StructuringElement) -> Result<GrayImage, PipelineError> {
    check_fit(mask, element)?;
    let (w, h) = mask.dimensions();
    let src = mask.as_raw();
    let offsets = element.offsets();
    let w_i = i64::from(w);
    let h_i = i64::from(h);
    let mut out = GrayImage::new(w, h);
    let dst: &mut [u8] = &mut out;
    for y in 0..h_i {
        let row = (y * w_i) as usize;
        for x in 0..w_i {
            let mut all_on = true;
            for &(dy, dx) in &offsets {
                let ny = y + dy;
                let nx = x + dx;
                if ny < 0 || ny >= h_i || nx < 0 || nx >= w_i {
                    all_on = false;
                    break;
                }
                if src[(ny * w_i + nx) as usize] == 0 {
                    all_on = false;
                    break;
                }
            }
            if all_on {
                dst[row + x as usize] = 255;
            }
        }
    }
    Ok(out)
}

/// Binary dilation: output on iff at least one on cell covers an on pixel.
pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> Result<GrayImage, PipelineError> {
    check_fit(mask, element)?;
    let (w, h) = mask.dimensions();
    let src = mask.as_raw();
    let offsets = element.offsets();
    let w_i = i64::from(w);
    let h_i = i64::from(h);
    let mut out = GrayImage::new(w, h);
    let dst: &mut [u8] = &mut out;
    for y in 0..h_i {
        let row = (y * w_i) as usize;
        for x in 0..w_i {
            for &(dy, dx) in &offsets {
                let ny = y + dy;
                let nx = x + dx;
                if ny < 0 || ny >= h_i || nx < 0 || nx >= w_i {
                    continue;
                }
                if src[(ny * w_i + nx) as usize] != 0 {
                    dst[row + x as usize] = 255;
                    break;
                }
            }
        }
    }
    Ok(out)
}

/// Erosion followed by dilation with the same element.
pub fn open(mask: &GrayImage, element: &StructuringElement) -> Result<GrayImage, PipelineError> {
    let eroded = erode(mask, element)?;
    dilate(&eroded, element)
}

/// Dilation followed by erosion with the same element.
pub fn close(mask: &GrayImage, element: &StructuringElement) -> Result<GrayImage, PipelineError> {
    let dilated = dilate(mask, element)?;
    erode(&dilated, element)
}
