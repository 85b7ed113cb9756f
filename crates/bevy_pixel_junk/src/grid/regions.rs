//! Connected-component search over present cells.
//!
//! Two entry points:
//! - [`GridRegionFinder::find_regions`] labels the whole grid in one row-major
//!   pass, unioning each present cell with its left and lower neighbors.
//! - [`GridRegionFinder::find_regions_from`] grows regions outward from the
//!   neighbors of a single seed (typically a cell that was just removed).
//!   All fronts advance through one shared worklist; when a front reaches a
//!   cell claimed by another region the two regions are merged.
//!
//! Both forms guarantee that adjacent present cells end up in the same region.

use std::collections::VecDeque;

use bevy::math::IVec2;

use super::{NEIGHBORS_4, PixelGrid};

/// One 4-connected component of present cells.
pub type Region = Vec<IVec2>;

const UNOWNED: u32 = u32::MAX;

/// Union-Find over region labels.
struct UnionFind {
  parent: Vec<usize>,
  rank: Vec<u8>,
}

impl UnionFind {
  fn new() -> Self {
    Self {
      parent: Vec::new(),
      rank: Vec::new(),
    }
  }

  fn make_set(&mut self) -> usize {
    let id = self.parent.len();
    self.parent.push(id);
    self.rank.push(0);
    id
  }

  fn find(&mut self, mut x: usize) -> usize {
    let mut root = x;
    while self.parent[root] != root {
      root = self.parent[root];
    }
    while self.parent[x] != root {
      let next = self.parent[x];
      self.parent[x] = root;
      x = next;
    }
    root
  }

  fn union(&mut self, x: usize, y: usize) {
    let rx = self.find(x);
    let ry = self.find(y);
    if rx == ry {
      return;
    }
    match self.rank[rx].cmp(&self.rank[ry]) {
      std::cmp::Ordering::Less => self.parent[rx] = ry,
      std::cmp::Ordering::Greater => self.parent[ry] = rx,
      std::cmp::Ordering::Equal => {
        self.parent[ry] = rx;
        self.rank[rx] += 1;
      }
    }
  }
}

/// Partitions present cells into 4-connected regions.
pub struct GridRegionFinder;

impl GridRegionFinder {
  /// Finds every region of the grid.
  ///
  /// Regions are ordered by their first cell in row-major order.
  pub fn find_regions(grid: &PixelGrid) -> Vec<Region> {
    let w = grid.width() as usize;
    let h = grid.height() as usize;
    let mut labels = vec![UNOWNED; w * h];
    let mut uf = UnionFind::new();

    for y in 0..h {
      for x in 0..w {
        let pos = IVec2::new(x as i32, y as i32);
        if !grid.is_pixel_assume_in_bounds(pos) {
          continue;
        }
        let idx = y * w + x;
        let left = if x > 0 { labels[idx - 1] } else { UNOWNED };
        let below = if y > 0 { labels[idx - w] } else { UNOWNED };

        labels[idx] = match (left, below) {
          (UNOWNED, UNOWNED) => uf.make_set() as u32,
          (l, UNOWNED) => l,
          (UNOWNED, b) => b,
          (l, b) => {
            uf.union(l as usize, b as usize);
            l
          }
        };
      }
    }

    collect_by_root(&labels, w, &mut uf)
  }

  /// Finds the regions reachable from the 4 neighbors of `seed`.
  ///
  /// The seed itself is included when it is present. Cells not connected to
  /// any of those starting points are not visited. On a grid with a single
  /// connected component this returns exactly one region for any present seed.
  pub fn find_regions_from(grid: &PixelGrid, seed: IVec2) -> Vec<Region> {
    let w = grid.width() as usize;
    let mut owner = vec![UNOWNED; w * grid.height() as usize];
    let mut uf = UnionFind::new();
    let mut queue = VecDeque::new();
    let index = |p: IVec2| p.y as usize * w + p.x as usize;

    let starts = std::iter::once(seed).chain(NEIGHBORS_4.iter().map(|&d| seed + d));
    for start in starts {
      if !grid.is_pixel(start) || owner[index(start)] != UNOWNED {
        continue;
      }
      let id = uf.make_set() as u32;
      owner[index(start)] = id;
      queue.push_back(start);
    }

    while let Some(cell) = queue.pop_front() {
      let id = owner[index(cell)];
      for d in NEIGHBORS_4 {
        let next = cell + d;
        if !grid.is_pixel(next) {
          continue;
        }
        match owner[index(next)] {
          UNOWNED => {
            owner[index(next)] = id;
            queue.push_back(next);
          }
          other if other != id => uf.union(id as usize, other as usize),
          _ => {}
        }
      }
    }

    collect_by_root(&owner, w, &mut uf)
  }
}

/// Groups labeled cells by their union-find root, preserving first-seen order.
fn collect_by_root(labels: &[u32], width: usize, uf: &mut UnionFind) -> Vec<Region> {
  let mut slot_of_root = vec![usize::MAX; uf.parent.len()];
  let mut regions: Vec<Region> = Vec::new();

  for (idx, &label) in labels.iter().enumerate() {
    if label == UNOWNED {
      continue;
    }
    let root = uf.find(label as usize);
    if slot_of_root[root] == usize::MAX {
      slot_of_root[root] = regions.len();
      regions.push(Vec::new());
    }
    let pos = IVec2::new((idx % width) as i32, (idx / width) as i32);
    regions[slot_of_root[root]].push(pos);
  }

  regions
}
