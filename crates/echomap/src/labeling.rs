//! Connected-component labeling over binary masks.
//!
//! Two-pass 8-connectivity labeling with a union-find over provisional
//! labels. Any nonzero pixel is foreground.

use image::GrayImage;

/// Dense label image plus component count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    /// Row-major component labels; 0 is background, components are 1-based.
    pub labels: Vec<u32>,
    /// Mask width.
    pub width: u32,
    /// Mask height.
    pub height: u32,
    /// Number of connected components.
    pub count: usize,
}

impl LabelMap {
    /// Label at `(x, y)`; 0 for background.
    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        self.labels[(y * self.width + x) as usize]
    }
}

fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        parent[x as usize] = parent[parent[x as usize] as usize];
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (hi, lo) = if ra > rb { (ra, rb) } else { (rb, ra) };
        parent[hi as usize] = lo;
    }
}

/// Label the 8-connected foreground components of `mask`.
pub fn label_components(mask: &GrayImage) -> LabelMap {
    let (w, h) = mask.dimensions();
    let w_us = w as usize;
    let h_us = h as usize;
    let src = mask.as_raw();
    let mut labels = vec![0u32; w_us * h_us];
    // Slot 0 is reserved so provisional labels stay 1-based.
    let mut parent: Vec<u32> = vec![0];

    for y in 0..h_us {
        let row = y * w_us;
        for x in 0..w_us {
            if src[row + x] == 0 {
                continue;
            }
            // Labels of the already-visited neighbors: W, NW, N, NE.
            let mut neighbors = [0u32; 4];
            let mut n = 0;
            if x > 0 && labels[row + x - 1] != 0 {
                neighbors[n] = labels[row + x - 1];
                n += 1;
            }
            if y > 0 {
                let prev = row - w_us;
                if x > 0 && labels[prev + x - 1] != 0 {
                    neighbors[n] = labels[prev + x - 1];
                    n += 1;
                }
                if labels[prev + x] != 0 {
                    neighbors[n] = labels[prev + x];
                    n += 1;
                }
                if x + 1 < w_us && labels[prev + x + 1] != 0 {
                    neighbors[n] = labels[prev + x + 1];
                    n += 1;
                }
            }
            let label = if n == 0 {
                let fresh = parent.len() as u32;
                parent.push(fresh);
                fresh
            } else {
                let mut min = neighbors[0];
                for &l in &neighbors[1..n] {
                    if l < min {
                        min = l;
                    }
                }
                for &l in &neighbors[..n] {
                    union(&mut parent, min, l);
                }
                min
            };
            labels[row + x] = label;
        }
    }

    // Resolve provisional labels to compact 1-based component ids.
    let mut remap = vec![0u32; parent.len()];
    let mut count = 0usize;
    for slot in labels.iter_mut() {
        if *slot == 0 {
            continue;
        }
        let root = find(&mut parent, *slot);
        if remap[root as usize] == 0 {
            count += 1;
            remap[root as usize] = count as u32;
        }
        *slot = remap[root as usize];
    }

    LabelMap {
        labels,
        width: w,
        height: h,
        count,
    }
}

/// Number of 8-connected foreground components of `mask`.
pub fn count_components(mask: &GrayImage) -> usize {
    label_components(mask).count
}
