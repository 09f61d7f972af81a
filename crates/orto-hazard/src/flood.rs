//! Queue-based 4-connected flood fill.
//!
//! A fill starts at a seed cell, collects every cell reachable through
//! horizontal or vertical neighbours that satisfy a predicate, and consumes
//! them by overwriting with a fill value. Diagonal neighbours are never
//! joined, so two blobs touching only at a corner are separate components.

use crate::Raster;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Result of one flood fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component<T: Eq + Hash> {
    /// Number of member cells.
    pub size: usize,
    /// Integer mean of member coordinates, or the seed for an empty fill.
    pub centroid: (u32, u32),
    /// Distinct values of the member cells.
    pub found: HashSet<T>,
    /// Distinct values of non-matching cells bordering the component.
    pub outside: HashSet<T>,
}

/// Reusable flood-fill state.
///
/// Keeps its queue and visit marks between fills so a detection pass over a
/// tile does not allocate per component.
#[derive(Debug, Default)]
pub struct FloodFill {
    visited: Vec<bool>,
    queue: VecDeque<(u32, u32)>,
    members: Vec<(u32, u32)>,
}

impl FloodFill {
    /// Create empty fill state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells of the most recent component.
    pub fn members(&self) -> &[(u32, u32)] {
        &self.members
    }

    /// Fill the component containing `seed`.
    ///
    /// Member cells are set to `fill` once the component is complete, so the
    /// predicate and the `outside` set always see the original values. A seed
    /// that does not match yields an empty component whose centroid is the
    /// seed and whose `outside` set holds the seed's own value.
    pub fn fill<T, F>(
        &mut self,
        raster: &mut Raster<T>,
        seed: (u32, u32),
        fill: T,
        matches: F,
    ) -> Component<T>
    where
        T: Copy + Eq + Hash,
        F: Fn(&T) -> bool,
    {
        self.members.clear();
        self.queue.clear();
        if self.visited.len() != raster.len() {
            self.visited = vec![false; raster.len()];
        }

        let mut found = HashSet::new();
        let mut outside = HashSet::new();

        let seed_value = raster[seed];
        if !matches(&seed_value) {
            outside.insert(seed_value);
            return Component {
                size: 0,
                centroid: seed,
                found,
                outside,
            };
        }

        let (width, height) = (raster.width(), raster.height());
        let mut total_x = 0u64;
        let mut total_y = 0u64;

        self.visited[raster.offset(seed.0, seed.1)] = true;
        self.queue.push_back(seed);

        while let Some((x, y)) = self.queue.pop_front() {
            found.insert(raster[(x, y)]);
            total_x += x as u64;
            total_y += y as u64;
            self.members.push((x, y));

            let neighbours = [
                (x > 0).then(|| (x - 1, y)),
                (x + 1 < width).then(|| (x + 1, y)),
                (y > 0).then(|| (x, y - 1)),
                (y + 1 < height).then(|| (x, y + 1)),
            ];

            for (nx, ny) in neighbours.into_iter().flatten() {
                let offset = raster.offset(nx, ny);
                if self.visited[offset] {
                    continue;
                }
                let value = raster[(nx, ny)];
                if matches(&value) {
                    self.visited[offset] = true;
                    self.queue.push_back((nx, ny));
                } else {
                    outside.insert(value);
                }
            }
        }

        for &(x, y) in &self.members {
            let offset = raster.offset(x, y);
            self.visited[offset] = false;
            raster[(x, y)] = fill;
        }

        let size = self.members.len();
        Component {
            size,
            centroid: (
                (total_x / size as u64) as u32,
                (total_y / size as u64) as u32,
            ),
            found,
            outside,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ```text
    /// .R..
    /// YB.Y
    /// .BGB
    /// ....
    /// ```
    fn sample() -> Raster<Option<char>> {
        let mut raster = Raster::new(4, 4);
        for (x, y, c) in [
            (1, 0, 'R'),
            (0, 1, 'Y'),
            (1, 1, 'B'),
            (3, 1, 'Y'),
            (1, 2, 'B'),
            (2, 2, 'G'),
            (3, 2, 'B'),
        ] {
            raster[(x, y)] = Some(c);
        }
        raster
    }

    #[test]
    fn test_fill_component() {
        let mut raster = sample();
        let mut flood = FloodFill::new();

        let component = flood.fill(&mut raster, (0, 1), None, |c| c.is_some());
        assert_eq!(component.size, 7);
        assert_eq!(component.centroid, (1, 1));
        assert_eq!(component.found.len(), 4);
        assert_eq!(component.outside, HashSet::from([None]));
        assert!(raster.cells().iter().all(|c| c.is_none()));
    }

    #[test]
    fn test_fill_non_matching_seed() {
        let mut raster = sample();
        let before = raster.clone();
        let mut flood = FloodFill::new();

        let component = flood.fill(&mut raster, (2, 1), None, |c| c.is_some());
        assert_eq!(component.size, 0);
        assert_eq!(component.centroid, (2, 1));
        assert_eq!(component.outside, HashSet::from([None]));
        assert!(component.found.is_empty());
        assert_eq!(raster, before);
    }

    #[test]
    fn test_fill_leaves_other_components() {
        let mut raster: Raster<u8> = Raster::new(5, 3);
        // Two blobs touching only diagonally, plus a separate blob.
        raster[(0, 0)] = 1;
        raster[(1, 0)] = 1;
        raster[(2, 1)] = 1;
        raster[(4, 2)] = 1;

        let mut flood = FloodFill::new();
        let component = flood.fill(&mut raster, (1, 0), 0, |&c| c == 1);
        assert_eq!(component.size, 2);
        assert_eq!(component.centroid, (0, 0));
        assert_eq!(raster[(2, 1)], 1);
        assert_eq!(raster[(4, 2)], 1);
        assert_eq!(raster.cells().iter().filter(|&&c| c == 1).count(), 2);
    }

    #[test]
    fn test_outside_sees_original_values() {
        // 2 surrounded by 1s, with a 3 on one side.
        let mut raster: Raster<u8> = Raster::filled(3, 3, 1);
        raster[(1, 1)] = 2;
        raster[(2, 1)] = 3;

        let mut flood = FloodFill::new();
        let component = flood.fill(&mut raster, (0, 0), 9, |&c| c == 1);
        assert_eq!(component.size, 7);
        assert_eq!(component.outside, HashSet::from([2, 3]));
        assert_eq!(component.found, HashSet::from([1]));
        assert_eq!(raster[(1, 1)], 2);
        assert_eq!(raster.cells().iter().filter(|&&c| c == 9).count(), 7);
    }

    #[test]
    fn test_size_and_centroid_match_enumeration() {
        // Deterministic pseudo-random rasters, compared against a brute force
        // connected-component labelling.
        let mut state = 0x2545_f491u32;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        let mut flood = FloodFill::new();
        for _ in 0..50 {
            let mut raster: Raster<bool> = Raster::new(9, 7);
            for y in 0..7 {
                for x in 0..9 {
                    raster[(x, y)] = next() % 3 != 0;
                }
            }
            let seed = (next() % 9, next() % 7);
            let expected = brute_force(&raster, seed);

            let component = flood.fill(&mut raster, seed, false, |&c| c);
            assert_eq!(component.size, expected.len());
            if !expected.is_empty() {
                let n = expected.len() as u32;
                let cx = expected.iter().map(|p| p.0).sum::<u32>() / n;
                let cy = expected.iter().map(|p| p.1).sum::<u32>() / n;
                assert_eq!(component.centroid, (cx, cy));
            } else {
                assert_eq!(component.centroid, seed);
            }
            assert_eq!(flood.members().len(), expected.len());
            for p in &expected {
                assert!(!raster[*p]);
            }
        }
    }

    fn brute_force(raster: &Raster<bool>, seed: (u32, u32)) -> Vec<(u32, u32)> {
        if !raster[seed] {
            return Vec::new();
        }
        let mut component = vec![seed];
        loop {
            let mut grown = false;
            for y in 0..raster.height() {
                for x in 0..raster.width() {
                    if !raster[(x, y)] || component.contains(&(x, y)) {
                        continue;
                    }
                    let adjacent = component
                        .iter()
                        .any(|&(cx, cy)| cx.abs_diff(x) + cy.abs_diff(y) == 1);
                    if adjacent {
                        component.push((x, y));
                        grown = true;
                    }
                }
            }
            if !grown {
                return component;
            }
        }
    }
}
