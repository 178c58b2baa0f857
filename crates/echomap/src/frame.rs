//! Frame batches: ordered collections of equally shaped grayscale frames.

use image::GrayImage;

use crate::error::PipelineError;

/// An ordered batch of equally sized grayscale frames.
///
/// The frame index is the only identity a frame has; every stage preserves
/// order, so index `i` of a stage output always corresponds to index `i` of
/// the input batch.
#[derive(Debug, Clone, Default)]
pub struct FrameBatch {
    frames: Vec<GrayImage>,
}

impl FrameBatch {
    /// Build a batch, verifying that every frame shares one shape.
    pub fn new(frames: Vec<GrayImage>) -> Result<Self, PipelineError> {
        if let Some(first) = frames.first() {
            let (w, h) = first.dimensions();
            for (idx, frame) in frames.iter().enumerate() {
                if frame.dimensions() != (w, h) {
                    return Err(PipelineError::Data(format!(
                        "frame {} is {}x{}, batch is {}x{}",
                        idx,
                        frame.width(),
                        frame.height(),
                        w,
                        h
                    )));
                }
            }
        }
        Ok(Self { frames })
    }

    /// Wrap stage outputs whose shapes are uniform by construction.
    pub(crate) fn from_stage_output(frames: Vec<GrayImage>) -> Self {
        Self { frames }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Shared frame shape (width, height), or `None` for an empty batch.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| f.dimensions())
    }

    pub fn get(&self, index: usize) -> Option<&GrayImage> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[GrayImage] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GrayImage> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<GrayImage> {
        self.frames
    }
}

impl From<GrayImage> for FrameBatch {
    fn from(frame: GrayImage) -> Self {
        Self {
            frames: vec![frame],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_shapes_are_accepted() {
        let batch = FrameBatch::new(vec![GrayImage::new(4, 3), GrayImage::new(4, 3)])
            .expect("uniform batch");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.dimensions(), Some((4, 3)));
    }

    #[test]
    fn mixed_shapes_are_rejected() {
        let err = FrameBatch::new(vec![GrayImage::new(4, 3), GrayImage::new(3, 4)]).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn empty_batch_has_no_dimensions() {
        let batch = FrameBatch::new(Vec::new()).expect("empty batch");
        assert!(batch.is_empty());
        assert_eq!(batch.dimensions(), None);
    }

    #[test]
    fn single_frame_conversion() {
        let batch = FrameBatch::from(GrayImage::new(5, 5));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.dimensions(), Some((5, 5)));
    }
}
