use glam::{Mat4, Quat, Vec3};

use crate::assets::schema::NodeDef;
use crate::errors::{Error, Result};

/// Translation / rotation / scale triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl DecomposedTransform {
    /// `T · R · S`
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// How a node's bind transform was authored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix(Mat4),
    Decomposed(DecomposedTransform),
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Decomposed(DecomposedTransform::default())
    }
}

impl NodeTransform {
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        match self {
            Self::Matrix(m) => *m,
            Self::Decomposed(d) => d.to_mat4(),
        }
    }

    /// TRS view of the transform. Explicit matrices are decomposed, which
    /// loses shear.
    #[must_use]
    pub fn decomposed(&self) -> DecomposedTransform {
        match self {
            Self::Matrix(m) => {
                let (scale, rotation, translation) = m.to_scale_rotation_translation();
                DecomposedTransform {
                    translation,
                    rotation,
                    scale,
                }
            }
            Self::Decomposed(d) => *d,
        }
    }
}

/// One entry of the scene hierarchy.
///
/// Nodes live in a flat array owned by [`ParsedModel`](crate::assets::ParsedModel);
/// `id` is the node's position in that array and `children` hold ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: usize,
    pub name: String,
    pub children: Vec<usize>,
    /// Parent-relative transform at bind time
    pub transform: NodeTransform,
    /// Cached `transform.to_mat4()`
    pub local_bind_transform: Mat4,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

impl Node {
    /// Creates a node with an identity bind transform and no children.
    #[must_use]
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            children: Vec::new(),
            transform: NodeTransform::default(),
            local_bind_transform: Mat4::IDENTITY,
            mesh: None,
            skin: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.local_bind_transform = transform.to_mat4();
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<usize>) -> Self {
        self.children = children;
        self
    }
}

fn node_transform(def: &NodeDef) -> NodeTransform {
    if let Some(m) = def.matrix {
        return NodeTransform::Matrix(Mat4::from_cols_array(&m));
    }
    let defaults = DecomposedTransform::default();
    NodeTransform::Decomposed(DecomposedTransform {
        translation: def.translation.map_or(defaults.translation, Vec3::from_array),
        rotation: def.rotation.map_or(defaults.rotation, Quat::from_array),
        scale: def.scale.map_or(defaults.scale, Vec3::from_array),
    })
}

/// Scene Graph Builder: converts manifest nodes into the flat node array.
///
/// Children are copied by index; no hierarchy composition happens here.
/// Rejects out-of-range child indices, nodes with more than one parent
/// and cycles, so that every later walk terminates.
pub fn build_nodes(defs: &[NodeDef]) -> Result<Vec<Node>> {
    let count = defs.len();
    let mut parent: Vec<Option<usize>> = vec![None; count];

    for (index, def) in defs.iter().enumerate() {
        for &child in &def.children {
            if child >= count {
                return Err(Error::out_of_bounds(
                    format!("child of node {index}"),
                    child,
                ));
            }
            if child == index {
                return Err(Error::malformed(format!("node {index} lists itself as a child")));
            }
            if let Some(existing) = parent[child].replace(index) {
                return Err(Error::malformed(format!(
                    "node {child} has two parents ({existing} and {index})"
                )));
            }
        }
    }

    // With one parent per node, a cycle is a parent chain that never
    // reaches a root.
    for start in 0..count {
        let mut current = start;
        let mut steps = 0;
        while let Some(p) = parent[current] {
            steps += 1;
            if steps > count {
                return Err(Error::malformed(format!(
                    "node hierarchy contains a cycle through node {start}"
                )));
            }
            current = p;
        }
    }

    Ok(defs
        .iter()
        .enumerate()
        .map(|(id, def)| {
            let transform = node_transform(def);
            Node {
                id,
                name: def.name.clone().unwrap_or_else(|| format!("Node_{id}")),
                children: def.children.clone(),
                transform,
                local_bind_transform: transform.to_mat4(),
                mesh: def.mesh,
                skin: def.skin,
            }
        })
        .collect())
}

/// Nodes that are nobody's child, in id order.
#[must_use]
pub fn parentless_nodes(nodes: &[Node]) -> Vec<usize> {
    let mut has_parent = vec![false; nodes.len()];
    for node in nodes {
        for &child in &node.children {
            if let Some(flag) = has_parent.get_mut(child) {
                *flag = true;
            }
        }
    }
    has_parent
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| (!p).then_some(i))
        .collect()
}
