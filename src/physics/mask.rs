//! Boolean occupancy grids and their segmentation into connected parts.
//!
//! Decoding raster images into grids is the embedding application's job;
//! the physics core only ever sees these masks.

/// A grid of cells marking which raster pixels are solid matter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl OccupancyMask {
    /// An all-transparent mask.
    pub fn new(width: usize, height: usize) -> Self {
        OccupancyMask {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// Build a mask by sampling a predicate at every cell.
    pub fn from_fn(width: usize, height: usize, mut solid: impl FnMut(usize, usize) -> bool) -> Self {
        let mut mask = OccupancyMask::new(width, height);
        for y in 0..height {
            for x in 0..width {
                mask.cells[y * width + x] = solid(x, y);
            }
        }
        mask
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the cell at (x, y) is solid. Out-of-range coordinates are
    /// transparent, not an error.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, solid: bool) {
        assert!(x < self.width && y < self.height);
        self.cells[y * self.width + x] = solid;
    }

    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Coordinates of every solid cell.
    pub fn solid_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(idx, &solid)| solid.then(|| (idx % width, idx / width)))
    }
}

/// A connected group of solid cells cut out of a larger mask.
#[derive(Clone, Debug)]
pub struct MaskRegion {
    /// The component's cells, cropped to their bounding box.
    pub mask: OccupancyMask,
    /// Where the bounding box's top-left corner sat in the source canvas.
    pub origin: (usize, usize),
}

/// Split a mask into one cropped mask per connected group of solid cells.
///
/// Connectivity is 4-way; two cells touching only diagonally are separate
/// groups. Every solid cell lands in exactly one output mask. Output order
/// follows the scan position of each group's first-encountered cell.
pub fn segment_mask(mask: &OccupancyMask) -> Vec<OccupancyMask> {
    segment_mask_regions(mask)
        .into_iter()
        .map(|region| region.mask)
        .collect()
}

/// Like [`segment_mask`], but also reports where each component sat in the
/// source canvas, so an assembly can keep parts at their painted positions.
pub fn segment_mask_regions(mask: &OccupancyMask) -> Vec<MaskRegion> {
    let width = mask.width();
    let height = mask.height();

    let mut regions = Vec::new();
    let mut visited = vec![false; width * height];
    let mut group: Vec<(usize, usize)> = Vec::new();
    // iterative fill; a recursive one blows the stack on large paintings
    let mut stack: Vec<(isize, isize)> = Vec::new();

    for x in 0..width {
        for y in 0..height {
            if visited[y * width + x] {
                continue;
            }
            if !mask.get(x, y) {
                visited[y * width + x] = true;
                continue;
            }

            group.clear();
            stack.push((x as isize, y as isize));
            while let Some((cx, cy)) = stack.pop() {
                if cx < 0 || cy < 0 || cx >= width as isize || cy >= height as isize {
                    continue;
                }
                let (cx, cy) = (cx as usize, cy as usize);
                if visited[cy * width + cx] {
                    continue;
                }
                visited[cy * width + cx] = true;

                if mask.get(cx, cy) {
                    group.push((cx, cy));
                    let (cx, cy) = (cx as isize, cy as isize);
                    stack.push((cx + 1, cy));
                    stack.push((cx - 1, cy));
                    stack.push((cx, cy + 1));
                    stack.push((cx, cy - 1));
                }
            }

            let mut min = (usize::MAX, usize::MAX);
            let mut max = (0, 0);
            for &(cx, cy) in &group {
                min = (min.0.min(cx), min.1.min(cy));
                max = (max.0.max(cx), max.1.max(cy));
            }
            let mut cropped = OccupancyMask::new(max.0 - min.0 + 1, max.1 - min.1 + 1);
            for &(cx, cy) in &group {
                cropped.set(cx - min.0, cy - min.1, true);
            }
            regions.push(MaskRegion {
                mask: cropped,
                origin: min,
            });
        }
    }

    regions
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_art(art: &[&str]) -> OccupancyMask {
        let height = art.len();
        let width = art.iter().map(|row| row.len()).max().unwrap_or(0);
        OccupancyMask::from_fn(width, height, |x, y| {
            art[y].as_bytes().get(x).copied() == Some(b'#')
        })
    }

    #[test]
    fn out_of_range_queries_are_transparent() {
        let mask = mask_from_art(&["##", "##"]);
        assert!(mask.get(1, 1));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(0, 5));
    }

    #[test]
    fn diagonal_cells_are_separate_components() {
        let mask = mask_from_art(&[
            "#.", //
            ".#",
        ]);
        let regions = segment_mask(&mask);
        assert_eq!(regions.len(), 2);
        for region in &regions {
            assert_eq!(region.solid_count(), 1);
            assert_eq!((region.width(), region.height()), (1, 1));
        }
    }

    #[test]
    fn l_shape_is_one_component_cropped_to_its_extent() {
        let mask = mask_from_art(&[
            "......", //
            ".#....",
            ".#....",
            ".###..",
        ]);
        let regions = segment_mask_regions(&mask);
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.origin, (1, 1));
        assert_eq!((region.mask.width(), region.mask.height()), (3, 3));
        assert_eq!(region.mask.solid_count(), 5);
    }

    #[test]
    fn origins_map_components_back_to_the_canvas() {
        let source = mask_from_art(&[
            "....##", //
            "....##",
            "......",
            "##....",
        ]);
        for region in segment_mask_regions(&source) {
            for (x, y) in region.mask.solid_cells() {
                assert!(source.get(x + region.origin.0, y + region.origin.1));
            }
        }
    }

    #[test]
    fn every_solid_cell_lands_in_exactly_one_component() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(77);

        for _ in 0..20 {
            let source = OccupancyMask::from_fn(24, 16, |_, _| rng.gen_bool(0.4));
            let regions = segment_mask_regions(&source);

            let mut seen = OccupancyMask::new(24, 16);
            let mut total = 0;
            for region in &regions {
                for (x, y) in region.mask.solid_cells() {
                    let (sx, sy) = (x + region.origin.0, y + region.origin.1);
                    assert!(source.get(sx, sy));
                    assert!(!seen.get(sx, sy), "cell ({sx}, {sy}) claimed twice");
                    seen.set(sx, sy, true);
                    total += 1;
                }
            }
            assert_eq!(total, source.solid_count());
        }
    }
}
