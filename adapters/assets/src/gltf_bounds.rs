use std::path::Path;

use glam::{Mat4, Vec3};
use neuroflight_core::Aabb;

use crate::{AssetError, BoundsLoader};

/// Reads model bounds from `.glb` and `.gltf` files.
///
/// Only the document is parsed: every primitive's POSITION accessor carries
/// its own min/max, so vertex buffers are never decoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfBoundsLoader;

impl BoundsLoader for GltfBoundsLoader {
    fn load_bounds(&self, file: &Path) -> Result<Aabb, AssetError> {
        let document = gltf::Gltf::open(file).map_err(|source| AssetError::Gltf {
            path: file.to_path_buf(),
            source,
        })?;

        let mut bounds = None;
        for scene in document.scenes() {
            for node in scene.nodes() {
                accumulate(&node, Mat4::IDENTITY, &mut bounds);
            }
        }

        bounds.ok_or_else(|| AssetError::EmptyBounds {
            path: file.to_path_buf(),
        })
    }
}

fn accumulate(node: &gltf::Node<'_>, parent: Mat4, bounds: &mut Option<Aabb>) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let local = primitive.bounding_box();
            let local = Aabb::new(Vec3::from(local.min), Vec3::from(local.max));
            for corner in local.corners() {
                let point = world.transform_point3(corner);
                let point = Aabb::new(point, point);
                *bounds = Some(match bounds.take() {
                    Some(existing) => existing.union(&point),
                    None => point,
                });
            }
        }
    }

    for child in node.children() {
        accumulate(&child, world, bounds);
    }
}
