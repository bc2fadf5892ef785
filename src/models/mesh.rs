//! Mesh templates and the node tree instances are cloned from.
//!
//! Geometry and textures sit behind `Arc`s: cloning a template copies the
//! node tree and transforms but shares every vertex buffer, so a thousand
//! placed lamps cost one lamp mesh.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::sync::Arc;

use crate::core::constants::{
    BASELINE_SINK_RATIO, DEFAULT_MODEL_COLOR, OUTLINE_COLOR, OUTLINE_THRESHOLD_DEGREES,
};
use crate::prelude::HashMap;
use crate::scene::collection::InstanceTag;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ];
        let moved: Vec<Point3<f64>> = corners.iter().map(|c| matrix.transform_point(c)).collect();
        Aabb::from_points(moved.iter())
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max.z - self.min.z
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
    bounds: Aabb,
}

impl Geometry {
    /// Triangles referencing missing vertices are dropped.
    pub fn new(positions: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Self {
        let count = positions.len() as u32;
        let triangles = triangles
            .into_iter()
            .filter(|t| t.iter().all(|&i| i < count))
            .collect();
        let bounds = Aabb::from_points(positions.iter());
        Self {
            positions,
            triangles,
            bounds,
        }
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn triangle(&self, index: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    fn apply_linear(&mut self, linear: &Matrix3<f64>) {
        for p in &mut self.positions {
            *p = Point3::from(linear * p.coords);
        }
        self.bounds = Aabb::from_points(self.positions.iter());
    }

    fn reverse_winding(&mut self) {
        for t in &mut self.triangles {
            t.swap(1, 2);
        }
    }

    /// Edges on the mesh boundary or between faces bent more than
    /// `threshold_degrees` apart.
    pub fn outline_edges(&self, threshold_degrees: f64) -> EdgeGeometry {
        struct Seen {
            normal: Vector3<f64>,
            from: u32,
            to: u32,
            matched: bool,
        }

        let cos_threshold = threshold_degrees.to_radians().cos();
        let mut seen: HashMap<(u32, u32), Seen> = HashMap::default();
        let mut segments = Vec::new();

        for (index, tri) in self.triangles.iter().enumerate() {
            let [a, b, c] = self.triangle(index);
            let Some(normal) = (b - a).cross(&(c - a)).try_normalize(f64::EPSILON) else {
                continue;
            };

            for (from, to) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let key = (from.min(to), from.max(to));
                match seen.get_mut(&key) {
                    None => {
                        seen.insert(
                            key,
                            Seen {
                                normal,
                                from,
                                to,
                                matched: false,
                            },
                        );
                    }
                    Some(first) if !first.matched => {
                        first.matched = true;
                        if first.normal.dot(&normal) <= cos_threshold {
                            segments.push([self.positions[from as usize], self.positions[to as usize]]);
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        for edge in seen.values().filter(|s| !s.matched) {
            segments.push([
                self.positions[edge.from as usize],
                self.positions[edge.to as usize],
            ]);
        }

        EdgeGeometry { segments }
    }
}

/// Line segments drawn over a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    pub segments: Vec<[Point3<f64>; 2]>,
}

/// Decoded RGBA8 texture
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Flat { color: [u8; 3] },
    Textured { texture: Arc<Texture> },
}

impl Default for Material {
    fn default() -> Self {
        Self::Flat {
            color: DEFAULT_MODEL_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: Arc<Geometry>,
        material: Material,
    },
    Outline {
        edges: Arc<EdgeGeometry>,
        color: [u8; 3],
    },
}

/// One node of a model's part hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node
    pub transform: Matrix4<f64>,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
    /// Set on the node that identifies a whole pickable object
    pub tag: Option<Arc<InstanceTag>>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Matrix4::identity(),
            kind: NodeKind::Group,
            children: Vec::new(),
            tag: None,
        }
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            kind: NodeKind::Mesh {
                geometry: Arc::new(geometry),
                material: Material::default(),
            },
            ..Self::group(name)
        }
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut SceneNode)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    /// Bounds of all meshes below this node, in the parent's space.
    pub fn bounds(&self, parent: &Matrix4<f64>) -> Aabb {
        let world = parent * self.transform;
        let own = match &self.kind {
            NodeKind::Mesh { geometry, .. } => geometry.bounds().transformed(&world),
            _ => Aabb::empty(),
        };
        self.children
            .iter()
            .fold(own, |acc, child| acc.union(&child.bounds(&world)))
    }
}

/// Canonical model owned by the model cache; instances are clones of its root.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshTemplate {
    root: SceneNode,
    baseline_z: f64,
}

impl MeshTemplate {
    pub fn new(root: SceneNode) -> Self {
        Self {
            root,
            baseline_z: 0.0,
        }
    }

    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    pub fn bounds(&self) -> Aabb {
        self.root.bounds(&Matrix4::identity())
    }

    /// Z offset instances are placed at
    pub fn baseline_z(&self) -> f64 {
        self.baseline_z
    }

    /// Rotates Y-up geometry into the map's Z-up frame: `(x, y, z) -> (x, -z, y)`.
    pub fn convert_y_up_to_z_up(&mut self) {
        let y_up_to_z_up = Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 0.0, -1.0, //
            0.0, 1.0, 0.0,
        );
        self.for_each_geometry(|geometry| geometry.apply_linear(&y_up_to_z_up));
    }

    pub fn reverse_winding(&mut self) {
        self.for_each_geometry(Geometry::reverse_winding);
    }

    pub fn bind_texture(&mut self, texture: Arc<Texture>) {
        self.root.visit_mut(&mut |node| {
            if let NodeKind::Mesh { material, .. } = &mut node.kind {
                *material = Material::Textured {
                    texture: texture.clone(),
                };
            }
        });
    }

    /// Hangs an edge outline under every mesh so untextured models still read.
    pub fn add_outline_fallback(&mut self) {
        self.root.visit_mut(&mut |node| {
            let NodeKind::Mesh { geometry, .. } = &node.kind else {
                return;
            };
            let outline = SceneNode {
                kind: NodeKind::Outline {
                    edges: Arc::new(geometry.outline_edges(OUTLINE_THRESHOLD_DEGREES)),
                    color: OUTLINE_COLOR,
                },
                ..SceneNode::group(format!("{}-outline", node.name))
            };
            node.children.push(outline);
        });
    }

    /// Sinks the model by a fraction of its height so uneven terrain doesn't
    /// leave it floating.
    pub fn seat_on_ground(&mut self) {
        self.baseline_z = -self.bounds().height() * BASELINE_SINK_RATIO;
    }

    /// Fresh node tree sharing this template's geometry.
    pub fn instantiate(&self) -> SceneNode {
        self.root.clone()
    }

    fn for_each_geometry(&mut self, mut f: impl FnMut(&mut Geometry)) {
        self.root.visit_mut(&mut |node| {
            if let NodeKind::Mesh { geometry, .. } = &mut node.kind {
                f(Arc::make_mut(geometry));
            }
        });
    }
}
