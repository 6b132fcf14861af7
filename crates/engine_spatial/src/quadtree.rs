//! Point quadtree with per-node radius bounds.
//!
//! Each indexed point carries the bounding radius of its collider. Every node
//! tracks the largest radius stored anywhere below it, so a circle query can
//! discard a whole subtree when the query circle, grown by that radius, cannot
//! reach the subtree's bounds.

use engine_component::Entity;
use engine_math::{Aabb, Vec2};

/// One indexed entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialPoint {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    /// Bounding radius of the entity's collider.
    pub radius: f32,
}

impl SpatialPoint {
    #[must_use]
    pub fn new(entity: Entity, position: Vec2, radius: f32) -> Self {
        Self {
            entity,
            x: position.x,
            y: position.y,
            radius,
        }
    }

    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Shape limits for a [`QuadTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadTreeConfig {
    /// Points a leaf holds before it splits.
    pub node_capacity: usize,
    /// Depth at which leaves stop splitting.
    pub max_depth: u32,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            node_capacity: 8,
            max_depth: 8,
        }
    }
}

#[derive(Debug)]
struct Node {
    bounds: Aabb,
    /// Largest point radius in this subtree.
    max_radius: f32,
    depth: u32,
    points: Vec<SpatialPoint>,
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            max_radius: 0.0,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, point: SpatialPoint, config: &QuadTreeConfig) {
        self.max_radius = self.max_radius.max(point.radius);

        if let Some(children) = self.children.as_deref_mut() {
            match children.iter_mut().find(|c| c.bounds.contains(point.position())) {
                Some(child) => child.insert(point, config),
                None => self.points.push(point),
            }
            return;
        }

        self.points.push(point);
        if self.points.len() > config.node_capacity && self.depth < config.max_depth {
            self.split(config);
        }
    }

    fn split(&mut self, config: &QuadTreeConfig) {
        let [nw, ne, sw, se] = self.bounds.quadrants();
        let depth = self.depth + 1;
        let mut children = Box::new([
            Node::new(nw, depth),
            Node::new(ne, depth),
            Node::new(sw, depth),
            Node::new(se, depth),
        ]);
        let mut kept = Vec::new();
        for point in self.points.drain(..) {
            match children.iter_mut().find(|c| c.bounds.contains(point.position())) {
                Some(child) => child.insert(point, config),
                None => kept.push(point),
            }
        }
        self.points = kept;
        self.children = Some(children);
    }

    fn query(&self, center: Vec2, radius: f32, visited: &mut usize, out: &mut Vec<SpatialPoint>) {
        let reach = radius + self.max_radius;
        if self.bounds.distance_squared_to(center) > reach * reach {
            return;
        }
        *visited += 1;
        for point in &self.points {
            let r = radius + point.radius;
            if point.position().distance_squared(center) <= r * r {
                out.push(*point);
            }
        }
        if let Some(children) = self.children.as_deref() {
            for child in children {
                child.query(center, radius, visited, out);
            }
        }
    }

    fn depth(&self) -> u32 {
        match self.children.as_deref() {
            Some(children) => children.iter().map(Node::depth).max().unwrap_or(self.depth),
            None => self.depth,
        }
    }
}

/// Traversal statistics of a circle query.
#[derive(Debug, Default)]
pub struct QueryStats {
    pub nodes_visited: usize,
}

/// A quadtree over [`SpatialPoint`]s.
#[derive(Debug, Default)]
pub struct QuadTree {
    root: Option<Node>,
    config: QuadTreeConfig,
    len: usize,
}

impl QuadTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new(config: QuadTreeConfig) -> Self {
        Self {
            root: None,
            config,
            len: 0,
        }
    }

    /// Build a tree whose root bounds cover every point.
    #[must_use]
    pub fn build(points: &[SpatialPoint], config: QuadTreeConfig) -> Self {
        let mut tree = Self::new(config);
        let Some(first) = points.first() else {
            return tree;
        };
        let bounds = points
            .iter()
            .fold(Aabb::new(first.position(), first.position()), |b, p| {
                b.including(p.position())
            });
        tree.root = Some(Node::new(bounds, 0));
        for &point in points {
            tree.insert(point);
        }
        tree
    }

    /// Insert a point. A point outside the root bounds grows the root, and
    /// is kept at the root unless it falls inside one of its quadrants.
    pub fn insert(&mut self, point: SpatialPoint) {
        let config = self.config;
        let root = self
            .root
            .get_or_insert_with(|| Node::new(Aabb::new(point.position(), point.position()), 0));
        root.bounds = root.bounds.including(point.position());
        root.insert(point, &config);
        self.len += 1;
    }

    /// Every point whose distance to `center` is at most `radius` plus the
    /// point's own radius.
    #[must_use]
    pub fn query_circle(&self, center: Vec2, radius: f32) -> Vec<SpatialPoint> {
        self.query_circle_with_stats(center, radius).0
    }

    /// [`QuadTree::query_circle`], also reporting how many nodes were visited.
    #[must_use]
    pub fn query_circle_with_stats(&self, center: Vec2, radius: f32) -> (Vec<SpatialPoint>, QueryStats) {
        let mut out = Vec::new();
        let mut stats = QueryStats::default();
        if let Some(root) = &self.root {
            root.query(center, radius, &mut stats.nodes_visited, &mut out);
        }
        (out, stats)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Depth of the deepest node, 0 for a single leaf.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.root.as_ref().map_or(0, Node::depth)
    }

    /// Remove every point.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }
}
