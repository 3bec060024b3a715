//! Multiresolution subdivision grids.
//!
//! Each quad face of the coarse mesh carries one `grid_size × grid_size`
//! lattice of samples. Samples on a shared coarse edge are duplicated in both
//! adjacent grids; side links record which grid/side a boundary sample's
//! duplicate lives in so visibility can propagate across grid boundaries.
//!
//! Hidden state is one bit per sample ([`BitGroupVec`]), allocated lazily:
//! absence of the structure means everything is visible, and show-all frees
//! it entirely. Any edit to the hidden bits must be followed by re-syncing
//! coarse vertex visibility (a coarse vertex is visible iff at least one of
//! its incident samples is visible) and by [`SubdivGrids::mark_hidden_modified`]
//! so the multires displacement layer knows its metadata changed.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::bits::BitGroupVec;
use crate::polygon::PolyMesh;

/// A sample coordinate: grid index plus lattice position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub grid: u32,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy)]
struct SideLink {
    grid: u32,
    side: u8,
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("face {0} is not a quad; grids require an all-quad coarse mesh")]
    NonQuadFace(usize),
    #[error("grid size must be at least 2, got {0}")]
    GridTooSmall(usize),
}

/// Per-object subdivision grid data.
#[derive(Debug, Clone)]
pub struct SubdivGrids {
    grid_size: usize,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    masks: Option<Vec<f32>>,
    hidden: Option<BitGroupVec>,
    side_links: Vec<[Option<SideLink>; 4]>,
    vert_samples: Vec<SmallVec<[GridCoord; 4]>>,
    hidden_modified: bool,
}

impl SubdivGrids {
    /// Build one grid per coarse quad, with sample positions interpolated
    /// bilinearly from the face corners.
    pub fn from_coarse(coarse: &PolyMesh, grid_size: usize) -> Result<Self, GridError> {
        if grid_size < 2 {
            return Err(GridError::GridTooSmall(grid_size));
        }
        let n = grid_size;
        let area = n * n;
        let grid_count = coarse.face_count();

        let mut positions = Vec::with_capacity(grid_count * area);
        let mut normals = Vec::with_capacity(grid_count * area);
        let mut vert_samples = vec![SmallVec::new(); coarse.vert_count()];
        let mut edge_users: HashMap<(u32, u32), SmallVec<[(u32, u8); 2]>> = HashMap::new();

        for face in 0..grid_count {
            let verts = coarse.face_verts(face);
            if verts.len() != 4 {
                return Err(GridError::NonQuadFace(face));
            }
            let corners = [
                coarse.positions()[verts[0] as usize],
                coarse.positions()[verts[1] as usize],
                coarse.positions()[verts[2] as usize],
                coarse.positions()[verts[3] as usize],
            ];
            for y in 0..n {
                for x in 0..n {
                    let u = x as f32 / (n - 1) as f32;
                    let v = y as f32 / (n - 1) as f32;
                    let position = corners[0] * (1.0 - u) * (1.0 - v)
                        + corners[1] * u * (1.0 - v)
                        + corners[2] * u * v
                        + corners[3] * (1.0 - u) * v;
                    positions.push(position);
                    let normal = coarse.normals()[verts[0] as usize];
                    normals.push(normal);
                }
            }

            let corner_coords = [(0, 0), (n - 1, 0), (n - 1, n - 1), (0, n - 1)];
            for (corner, &(x, y)) in corner_coords.iter().enumerate() {
                vert_samples[verts[corner] as usize].push(GridCoord {
                    grid: face as u32,
                    x: x as u16,
                    y: y as u16,
                });
            }

            for side in 0..4u8 {
                let a = verts[side as usize];
                let b = verts[(side as usize + 1) % 4];
                let key = if a < b { (a, b) } else { (b, a) };
                edge_users.entry(key).or_default().push((face as u32, side));
            }
        }

        let mut side_links = vec![[None; 4]; grid_count];
        for users in edge_users.values() {
            if let [(grid_a, side_a), (grid_b, side_b)] = users.as_slice() {
                side_links[*grid_a as usize][*side_a as usize] = Some(SideLink {
                    grid: *grid_b,
                    side: *side_b,
                });
                side_links[*grid_b as usize][*side_b as usize] = Some(SideLink {
                    grid: *grid_a,
                    side: *side_a,
                });
            }
        }

        debug!(grids = grid_count, grid_size, "built subdivision grids");
        Ok(Self {
            grid_size,
            positions,
            normals,
            masks: None,
            hidden: None,
            side_links,
            vert_samples,
            hidden_modified: false,
        })
    }

    pub fn grid_count(&self) -> usize {
        self.side_links.len()
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Samples per grid.
    pub fn grid_area(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// Total samples over all grids.
    pub fn sample_count(&self) -> usize {
        self.grid_count() * self.grid_area()
    }

    pub fn sample_index(&self, coord: GridCoord) -> usize {
        coord.y as usize * self.grid_size + coord.x as usize
    }

    pub fn sample_position(&self, coord: GridCoord) -> Vec3 {
        self.positions[coord.grid as usize * self.grid_area() + self.sample_index(coord)]
    }

    pub fn sample_normal(&self, coord: GridCoord) -> Vec3 {
        self.normals[coord.grid as usize * self.grid_area() + self.sample_index(coord)]
    }

    pub fn masks(&self) -> Option<&[f32]> {
        self.masks.as_deref()
    }

    pub fn set_masks(&mut self, masks: Vec<f32>) {
        debug_assert_eq!(masks.len(), self.sample_count());
        self.masks = Some(masks);
    }

    pub fn sample_mask(&self, coord: GridCoord) -> f32 {
        match &self.masks {
            Some(masks) => {
                masks[coord.grid as usize * self.grid_area() + self.sample_index(coord)]
            }
            None => 0.0,
        }
    }

    /// The hidden bits, `None` while everything is visible.
    pub fn grid_hidden(&self) -> Option<&BitGroupVec> {
        self.hidden.as_ref()
    }

    /// Lazily allocate the hidden bits (all visible) on first write.
    pub fn grid_hidden_ensure(&mut self) -> &mut BitGroupVec {
        let (groups, group_size) = (self.grid_count(), self.grid_area());
        self.hidden
            .get_or_insert_with(|| BitGroupVec::new(groups, group_size, false))
    }

    /// Release the hidden bits entirely; everything becomes visible.
    pub fn grid_hidden_free(&mut self) {
        self.hidden = None;
    }

    pub fn sample_hidden(&self, coord: GridCoord) -> bool {
        self.hidden
            .as_ref()
            .is_some_and(|hidden| hidden.get(coord.grid as usize, self.sample_index(coord)))
    }

    /// All samples incident to a coarse vertex (its corner duplicates).
    pub fn vert_samples(&self, vert: usize) -> &[GridCoord] {
        &self.vert_samples[vert]
    }

    /// A coarse vertex is visible iff at least one incident sample is visible.
    pub fn vert_hidden(&self, vert: usize) -> bool {
        let samples = self.vert_samples(vert);
        !samples.is_empty() && samples.iter().all(|&coord| self.sample_hidden(coord))
    }

    /// Topological neighbors of a sample: the 4-neighborhood within its grid,
    /// plus (when `include_duplicates` is set) the coincident duplicates of a
    /// boundary sample in adjacent grids, up to two of them at a grid corner.
    pub fn neighbor_coords(
        &self,
        coord: GridCoord,
        include_duplicates: bool,
    ) -> SmallVec<[GridCoord; 6]> {
        let n = self.grid_size as u16;
        let mut neighbors = SmallVec::new();
        if coord.x > 0 {
            neighbors.push(GridCoord { x: coord.x - 1, ..coord });
        }
        if coord.x + 1 < n {
            neighbors.push(GridCoord { x: coord.x + 1, ..coord });
        }
        if coord.y > 0 {
            neighbors.push(GridCoord { y: coord.y - 1, ..coord });
        }
        if coord.y + 1 < n {
            neighbors.push(GridCoord { y: coord.y + 1, ..coord });
        }
        if include_duplicates {
            for (side, t) in self.coord_sides(coord) {
                if let Some(link) = self.side_links[coord.grid as usize][side as usize] {
                    let (x, y) = self.side_coord(link.side, self.grid_size - 1 - t);
                    neighbors.push(GridCoord { grid: link.grid, x, y });
                }
            }
        }
        neighbors
    }

    /// Sample coordinate at parameter `t` along a grid side, following the
    /// face's winding.
    fn side_coord(&self, side: u8, t: usize) -> (u16, u16) {
        let last = (self.grid_size - 1) as u16;
        let t = t as u16;
        match side {
            0 => (t, 0),
            1 => (last, t),
            2 => (last - t, last),
            _ => (0, last - t),
        }
    }

    /// The sides a sample lies on, with its parameter along each. Interior
    /// samples return nothing, edge samples one entry, corner samples two.
    fn coord_sides(&self, coord: GridCoord) -> SmallVec<[(u8, usize); 2]> {
        let last = (self.grid_size - 1) as u16;
        let mut sides = SmallVec::new();
        if coord.y == 0 {
            sides.push((0u8, coord.x as usize));
        }
        if coord.x == last {
            sides.push((1, coord.y as usize));
        }
        if coord.y == last {
            sides.push((2, (last - coord.x) as usize));
        }
        if coord.x == 0 {
            sides.push((3, (last - coord.y) as usize));
        }
        sides
    }

    /// Signal that hidden-state metadata changed, for the external
    /// multires displacement layer.
    pub fn mark_hidden_modified(&mut self) {
        self.hidden_modified = true;
    }

    pub fn hidden_modified(&self) -> bool {
        self.hidden_modified
    }

    pub fn clear_hidden_modified(&mut self) {
        self.hidden_modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Coarse mesh of two quads sharing the edge (1, 4).
    fn quad_strip() -> PolyMesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
        ];
        PolyMesh::new(positions, &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]])
    }

    #[test]
    fn test_interior_sample_has_four_neighbors_no_duplicates() {
        let grids = SubdivGrids::from_coarse(&quad_strip(), 4).unwrap();
        let neighbors = grids.neighbor_coords(GridCoord { grid: 0, x: 1, y: 2 }, true);
        assert_eq!(neighbors.len(), 4);
        assert!(neighbors.iter().all(|c| c.grid == 0));
    }

    #[test]
    fn test_boundary_sample_duplicate_crosses_grid() {
        let grids = SubdivGrids::from_coarse(&quad_strip(), 4).unwrap();
        // Grid 0 side 1 is the shared coarse edge 1->4; grid 1 side 3 is 4->1.
        let coord = GridCoord { grid: 0, x: 3, y: 1 };
        let neighbors = grids.neighbor_coords(coord, true);
        let cross: Vec<_> = neighbors.iter().filter(|c| c.grid == 1).collect();
        assert_eq!(cross.len(), 1);
        // Same world position on both sides of the boundary.
        assert_eq!(
            grids.sample_position(coord),
            grids.sample_position(*cross[0])
        );
        // Without duplicates the query stays inside the grid.
        assert!(
            grids
                .neighbor_coords(coord, false)
                .iter()
                .all(|c| c.grid == 0)
        );
    }

    #[test]
    fn test_vert_samples_cover_incident_grids() {
        let grids = SubdivGrids::from_coarse(&quad_strip(), 3).unwrap();
        // Vertex 1 is a corner of both faces.
        let samples = grids.vert_samples(1);
        assert_eq!(samples.len(), 2);
        let grids_seen: Vec<u32> = samples.iter().map(|c| c.grid).collect();
        assert!(grids_seen.contains(&0) && grids_seen.contains(&1));
        // Vertex 0 only touches face 0.
        assert_eq!(grids.vert_samples(0).len(), 1);
    }

    #[test]
    fn test_hidden_lazy_allocation_and_free() {
        let mut grids = SubdivGrids::from_coarse(&quad_strip(), 3).unwrap();
        let coord = GridCoord { grid: 0, x: 0, y: 0 };
        assert!(grids.grid_hidden().is_none());
        assert!(!grids.sample_hidden(coord));

        let index = grids.sample_index(coord);
        grids.grid_hidden_ensure().set(0, index, true);
        assert!(grids.sample_hidden(coord));
        assert!(grids.vert_hidden(0));
        assert!(!grids.vert_hidden(1));

        grids.grid_hidden_free();
        assert!(grids.grid_hidden().is_none());
        assert!(!grids.vert_hidden(0));
    }

    #[test]
    fn test_rejects_non_quad_coarse_face() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let tri = PolyMesh::new(positions, &[vec![0, 1, 2]]);
        assert!(matches!(
            SubdivGrids::from_coarse(&tri, 3),
            Err(GridError::NonQuadFace(0))
        ));
    }
}
