//! Fixed-pattern 3x3 template filtering.
//!
//! Templates run in their given order. Each template pass decides every
//! match against a frozen snapshot of the mask, then rewrites all matched
//! centers at once, so a center rewritten early in a pass never changes a
//! neighbor's match in the same pass. Window cells outside the frame read
//! as 0.

use image::GrayImage;

use crate::config::{MatchAction, MatchRule};
use crate::error::PipelineError;

/// A 3x3 template with cells restricted to {0, 255}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkeletonTemplate {
    cells: [u8; 9],
}

impl SkeletonTemplate {
    /// Build from rows, top to bottom; every cell must be 0 or 255.
    pub fn new(rows: [[u8; 3]; 3]) -> Result<Self, PipelineError> {
        let mut cells = [0u8; 9];
        for (y, row) in rows.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                if v != 0 && v != 255 {
                    return Err(PipelineError::Configuration(format!(
                        "template cells must be 0 or 255, got {} at ({}, {})",
                        v, x, y
                    )));
                }
                cells[y * 3 + x] = v;
            }
        }
        Ok(Self { cells })
    }

    const fn from_raw(cells: [u8; 9]) -> Self {
        Self { cells }
    }

    /// Number of on cells.
    pub fn on_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 255).count()
    }

    #[inline]
    fn cell(&self, y: usize, x: usize) -> u8 {
        self.cells[y * 3 + x]
    }
}

/// The standard line templates, in application order: vertical, horizontal,
/// main diagonal, anti-diagonal.
pub fn standard_templates() -> Vec<SkeletonTemplate> {
    vec![
        SkeletonTemplate::from_raw([0, 255, 0, 0, 255, 0, 0, 255, 0]),
        SkeletonTemplate::from_raw([0, 0, 0, 255, 255, 255, 0, 0, 0]),
        SkeletonTemplate::from_raw([255, 0, 0, 0, 255, 0, 0, 0, 255]),
        SkeletonTemplate::from_raw([0, 0, 255, 0, 255, 0, 255, 0, 0]),
    ]
}

/// Run every template over the mask in order, rewriting matched centers.
pub fn skeleton_filter(
    mask: &GrayImage,
    templates: &[SkeletonTemplate],
    rule: MatchRule,
    action: MatchAction,
) -> GrayImage {
    let mut current = mask.clone();
    for template in templates {
        current = template_pass(&current, template, rule, action);
    }
    current
}

fn template_pass(
    mask: &GrayImage,
    template: &SkeletonTemplate,
    rule: MatchRule,
    action: MatchAction,
) -> GrayImage {
    let (w, h) = mask.dimensions();
    let src = mask.as_raw();
    let mut out = mask.clone();
    let dst: &mut [u8] = &mut out;
    let rewrite = match action {
        MatchAction::Clear => 0u8,
        MatchAction::Set => 255u8,
    };
    let w_i = i64::from(w);
    let h_i = i64::from(h);
    for y in 0..h_i {
        for x in 0..w_i {
            if window_matches(src, w_i, h_i, x, y, template, rule) {
                dst[(y * w_i + x) as usize] = rewrite;
            }
        }
    }
    out
}

#[inline]
fn sample(src: &[u8], w: i64, h: i64, x: i64, y: i64) -> u8 {
    if x < 0 || y < 0 || x >= w || y >= h {
        0
    } else {
        src[(y * w + x) as usize]
    }
}

fn window_matches(
    src: &[u8],
    w: i64,
    h: i64,
    x: i64,
    y: i64,
    template: &SkeletonTemplate,
    rule: MatchRule,
) -> bool {
    match rule {
        MatchRule::ExactWindow => {
            for dy in 0..3i64 {
                for dx in 0..3i64 {
                    let v = sample(src, w, h, x + dx - 1, y + dy - 1);
                    if v != template.cell(dy as usize, dx as usize) {
                        return false;
                    }
                }
            }
            true
        }
        MatchRule::OnCellsOnly => {
            for dy in 0..3i64 {
                for dx in 0..3i64 {
                    if template.cell(dy as usize, dx as usize) == 255
                        && sample(src, w, h, x + dx - 1, y + dy - 1) == 0
                    {
                        return false;
                    }
                }
            }
            true
        }
    }
}
