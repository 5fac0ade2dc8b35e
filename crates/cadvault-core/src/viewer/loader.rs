//! Format loaders. Parsing itself is delegated to `tobj` and `gltf`; this
//! module only flattens their output into one position/index buffer.

use glam::{Mat4, Vec3};

use crate::error::ViewerError;

/// Flattened triangle data in model space.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawMesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

/// Parse `bytes` according to `file_type` (`.obj`, `.gltf` or `.glb`).
pub fn load(file_type: &str, bytes: &[u8]) -> Result<RawMesh, ViewerError> {
    match file_type {
        ".obj" => load_obj(bytes),
        ".gltf" | ".glb" => load_gltf(file_type, bytes),
        other => Err(ViewerError::Parse {
            file_type: other.to_owned(),
            message: "no loader for this file type".to_owned(),
        }),
    }
}

fn parse_error(file_type: &str, err: impl std::fmt::Display) -> ViewerError {
    ViewerError::Parse {
        file_type: file_type.to_owned(),
        message: err.to_string(),
    }
}

fn load_obj(bytes: &[u8]) -> Result<RawMesh, ViewerError> {
    let mut reader = bytes;
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    // Material libraries sit next to the OBJ on disk and are not uploaded.
    let (models, _materials) =
        tobj::load_obj_buf(&mut reader, &options, |_| Err(tobj::LoadError::OpenFileFailed))
            .map_err(|e| parse_error(".obj", e))?;

    let mut out = RawMesh::default();
    for model in models {
        let base = out.positions.len() as u32;
        out.positions.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        out.indices.extend(model.mesh.indices.iter().map(|i| base + i));
    }
    Ok(out)
}

fn load_gltf(file_type: &str, bytes: &[u8]) -> Result<RawMesh, ViewerError> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| parse_error(file_type, e))?;

    let mut out = RawMesh::default();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                visit_node(&node, Mat4::IDENTITY, &buffers, &mut out);
            }
        }
        // Scene-less files: take meshes as authored.
        None => {
            for mesh in document.meshes() {
                append_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut out);
            }
        }
    }
    Ok(out)
}

fn visit_node(node: &gltf::Node<'_>, parent: Mat4, buffers: &[gltf::buffer::Data], out: &mut RawMesh) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        append_mesh(&mesh, world, buffers, out);
    }
    for child in node.children() {
        visit_node(&child, world, buffers, out);
    }
}

fn append_mesh(mesh: &gltf::Mesh<'_>, world: Mat4, buffers: &[gltf::buffer::Data], out: &mut RawMesh) {
    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let base = out.positions.len();
        out.positions
            .extend(positions.map(|p| world.transform_point3(Vec3::from(p))));
        let added = (out.positions.len() - base) as u32;
        let base = base as u32;
        match reader.read_indices() {
            Some(indices) => out.indices.extend(indices.into_u32().map(|i| base + i)),
            None => out.indices.extend((0..added).map(|i| base + i)),
        }
    }
}
