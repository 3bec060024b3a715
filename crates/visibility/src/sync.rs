//! Resynchronization after external face-visibility edits.
//!
//! Editing tools outside the sculpt system write face hidden flags directly.
//! Before sculpting resumes, the vertex and edge state (and for grids the
//! per-sample bits) must be rebuilt from the faces.

use mesh::dyntopo::DynTopoMesh;
use mesh::grids::SubdivGrids;
use mesh::polygon::PolyMesh;
use tracing::debug;

use crate::flush::mesh_hide_face_flush;
use crate::operators::{MeshRepr, SculptObject};

/// Rebuild all derived visibility state from face hidden flags.
pub fn sync_all_from_faces(object: &mut SculptObject) {
    object.topology_islands_invalidate();
    match &mut object.repr {
        MeshRepr::Polygon(mesh) => mesh_hide_face_flush(mesh),
        MeshRepr::Grids { coarse, grids } => sync_grids_from_faces(coarse, grids),
        MeshRepr::DynTopo(mesh) => sync_dyntopo_from_faces(mesh),
    }
    debug!("visibility synced from face state");
}

/// Grids variant: the coarse mesh is flushed as usual and each grid inherits
/// its quad's hidden flag wholesale.
fn sync_grids_from_faces(coarse: &mut PolyMesh, grids: &mut SubdivGrids) {
    mesh_hide_face_flush(coarse);
    match coarse.hide_face().map(<[bool]>::to_vec) {
        Some(hide_face) => {
            let hidden = grids.grid_hidden_ensure();
            for grid in 0..hidden.groups() {
                hidden.fill_group(grid, hide_face[grid]);
            }
        }
        None => grids.grid_hidden_free(),
    }
    grids.mark_hidden_modified();
}

/// Dynamic topology variant: hide every vertex attached to a face, then
/// reveal the ones attached to at least one visible face.
fn sync_dyntopo_from_faces(mesh: &mut DynTopoMesh) {
    for face in 0..mesh.face_count() as u32 {
        for vert in mesh.face(face).verts {
            mesh.set_vert_hidden(vert, true);
        }
    }
    for face in 0..mesh.face_count() as u32 {
        if mesh.face(face).hidden {
            continue;
        }
        for vert in mesh.face(face).verts {
            mesh.set_vert_hidden(vert, false);
        }
    }
    mesh.update_edge_hidden();
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

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
    fn test_polygon_sync_rederives_verts_and_edges() {
        let mut mesh = quad_strip();
        mesh.hide_face_ensure()[0] = true;
        let mut object = SculptObject::new(MeshRepr::Polygon(mesh), 4);

        sync_all_from_faces(&mut object);

        let MeshRepr::Polygon(mesh) = &object.repr else {
            unreachable!();
        };
        // Verts 0 and 3 have all incident faces hidden; 1 and 4 touch the
        // visible face 1.
        assert_eq!(
            mesh.hide_vert().unwrap(),
            &[true, false, false, true, false, false]
        );
        assert!(mesh.edge_hidden(
            mesh.edges()
                .iter()
                .position(|&verts| verts == [0, 3] || verts == [3, 0])
                .unwrap()
        ));
    }

    #[test]
    fn test_grids_sync_pushes_face_state_into_bits() {
        let coarse = quad_strip();
        let grids = SubdivGrids::from_coarse(&coarse, 3).unwrap();
        let mut object = SculptObject::new(MeshRepr::Grids { coarse, grids }, 1);

        {
            let MeshRepr::Grids { coarse, .. } = &mut object.repr else {
                unreachable!();
            };
            coarse.hide_face_ensure()[1] = true;
        }
        sync_all_from_faces(&mut object);

        let MeshRepr::Grids { grids, .. } = &object.repr else {
            unreachable!();
        };
        let hidden = grids.grid_hidden().unwrap();
        assert!(!hidden.any_set_in_group(0));
        assert!(hidden.all_set_in_group(1));
        assert!(grids.hidden_modified());
    }

    #[test]
    fn test_grids_sync_without_face_state_frees_bits() {
        let coarse = quad_strip();
        let grids = SubdivGrids::from_coarse(&coarse, 3).unwrap();
        let mut object = SculptObject::new(MeshRepr::Grids { coarse, grids }, 1);

        {
            let MeshRepr::Grids { grids, .. } = &mut object.repr else {
                unreachable!();
            };
            grids.grid_hidden_ensure().fill(true);
        }
        sync_all_from_faces(&mut object);

        let MeshRepr::Grids { grids, .. } = &object.repr else {
            unreachable!();
        };
        assert!(grids.grid_hidden().is_none());
    }

    #[test]
    fn test_dyntopo_sync_keeps_shared_verts_visible() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        let mut dyn_mesh = DynTopoMesh::from_triangles(positions, &[[0, 1, 2], [1, 3, 2]]);
        dyn_mesh.set_face_hidden(0, true);
        let mut object = SculptObject::new(MeshRepr::DynTopo(dyn_mesh), 4);

        sync_all_from_faces(&mut object);

        let MeshRepr::DynTopo(mesh) = &object.repr else {
            unreachable!();
        };
        // Vertex 0 is only on the hidden face; 1 and 2 are shared with the
        // visible face 1.
        assert!(mesh.vert(0).hidden);
        assert!(!mesh.vert(1).hidden);
        assert!(!mesh.vert(2).hidden);
        assert!(!mesh.vert(3).hidden);
    }
}
