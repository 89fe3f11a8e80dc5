//! Pose Compositor
//!
//! Walks the node hierarchy from its roots, composing world matrices, and
//! turns the world matrices of skin joints into joint matrices
//! (`world · inverse_bind`) ready for upload to a skinning shader.
//!
//! The walk uses an explicit stack instead of recursion, in the same spirit
//! as the level-order batches of a transform system: deep rigs cannot
//! overflow the call stack.

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::errors::{Error, Result};
use crate::scene::node::{DecomposedTransform, Node};
use crate::scene::skin::Skin;

/// How sampled components combine with a node's bind transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalComposition {
    /// `local = bind · animated`; missing components are identity
    #[default]
    BindThenAnimated,
    /// Sampled components replace the matching bind components
    AnimatedReplacesBind,
}

/// Resolves the parent-relative matrix of every node.
///
/// Nodes absent from `animated` keep their bind transform.
#[must_use]
pub fn local_matrices(
    nodes: &[Node],
    animated: &FxHashMap<usize, DecomposedTransform>,
    composition: LocalComposition,
) -> Vec<Mat4> {
    nodes
        .iter()
        .map(|node| match (animated.get(&node.id), composition) {
            (None, _) => node.local_bind_transform,
            (Some(t), LocalComposition::BindThenAnimated) => {
                node.local_bind_transform * t.to_mat4()
            }
            (Some(t), LocalComposition::AnimatedReplacesBind) => t.to_mat4(),
        })
        .collect()
}

/// Composes world matrices by walking down from `roots`.
///
/// `world = parent_world · local`. Nodes not reachable from any root are
/// `None`. Reaching a node twice means the hierarchy is not a forest and
/// fails with [`Error::MalformedAsset`].
pub fn compute_world_transforms(
    nodes: &[Node],
    roots: &[usize],
    locals: &[Mat4],
) -> Result<Vec<Option<Mat4>>> {
    if locals.len() != nodes.len() {
        return Err(Error::malformed(format!(
            "{} local matrices for {} nodes",
            locals.len(),
            nodes.len()
        )));
    }

    let mut world: Vec<Option<Mat4>> = vec![None; nodes.len()];
    let mut stack: Vec<(usize, Mat4)> = Vec::with_capacity(nodes.len());

    for &root in roots.iter().rev() {
        if root >= nodes.len() {
            return Err(Error::out_of_bounds("scene root", root));
        }
        stack.push((root, Mat4::IDENTITY));
    }

    while let Some((id, parent_world)) = stack.pop() {
        if world[id].is_some() {
            return Err(Error::malformed(format!(
                "node {id} is reachable along more than one path"
            )));
        }
        let node_world = parent_world * locals[id];
        world[id] = Some(node_world);

        for &child in nodes[id].children.iter().rev() {
            if child >= nodes.len() {
                return Err(Error::out_of_bounds(format!("child of node {id}"), child));
            }
            stack.push((child, node_world));
        }
    }

    Ok(world)
}

/// Joint matrices of one skin. Joints the walk never reached stay identity.
#[must_use]
pub fn joint_matrices(skin: &Skin, world: &[Option<Mat4>]) -> Vec<Mat4> {
    skin.joints
        .iter()
        .zip(&skin.inverse_bind_matrices)
        .map(|(&joint, inverse_bind)| {
            world
                .get(joint)
                .copied()
                .flatten()
                .map_or(Mat4::IDENTITY, |w| w * *inverse_bind)
        })
        .collect()
}

/// Computes the joint matrices of every skin for one pose.
///
/// Output `i` belongs to `skins[i]` and holds exactly
/// `skins[i].joints.len()` matrices.
pub fn compose_pose(
    nodes: &[Node],
    skins: &[Skin],
    roots: &[usize],
    animated: &FxHashMap<usize, DecomposedTransform>,
    composition: LocalComposition,
) -> Result<Vec<Vec<Mat4>>> {
    let locals = local_matrices(nodes, animated, composition);
    let world = compute_world_transforms(nodes, roots, &locals)?;
    Ok(skins.iter().map(|skin| joint_matrices(skin, &world)).collect())
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::node::NodeTransform;

    fn translated(id: usize, offset: Vec3) -> Node {
        Node::new(id, format!("n{id}")).with_transform(NodeTransform::Decomposed(
            DecomposedTransform {
                translation: offset,
                ..Default::default()
            },
        ))
    }

    #[test]
    fn world_accumulates_down_the_chain() {
        let nodes = vec![
            translated(0, Vec3::X).with_children(vec![1]),
            translated(1, Vec3::Y).with_children(vec![2]),
            translated(2, Vec3::Z),
        ];
        let locals = local_matrices(&nodes, &FxHashMap::default(), LocalComposition::default());
        let world = compute_world_transforms(&nodes, &[0], &locals).unwrap();
        let leaf = world[2].unwrap();
        assert!(leaf.w_axis.truncate().abs_diff_eq(Vec3::ONE, 1e-6));
    }

    #[test]
    fn unreachable_nodes_are_none() {
        let nodes = vec![translated(0, Vec3::X), translated(1, Vec3::Y)];
        let locals = local_matrices(&nodes, &FxHashMap::default(), LocalComposition::default());
        let world = compute_world_transforms(&nodes, &[0], &locals).unwrap();
        assert!(world[0].is_some());
        assert!(world[1].is_none());
    }

    #[test]
    fn shared_child_is_rejected() {
        let nodes = vec![
            Node::new(0, "a").with_children(vec![2]),
            Node::new(1, "b").with_children(vec![2]),
            Node::new(2, "c"),
        ];
        let locals = vec![Mat4::IDENTITY; 3];
        let err = compute_world_transforms(&nodes, &[0, 1], &locals).unwrap_err();
        assert!(matches!(err, Error::MalformedAsset(_)));
    }
}
