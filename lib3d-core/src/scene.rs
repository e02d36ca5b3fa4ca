/// Scene registry: the current set of drawable triangles and lines, keyed by
/// content handles, flattened into per-vertex attribute buffers for drawing
use std::collections::{BTreeMap, HashMap};

use crate::geometry::{Color, Handle, Line, Triangle, Vertex};

/// Floats per vertex in both the position and the color buffer
pub const COMPONENTS_PER_VERTEX: usize = 4;

/// Flattened attribute buffers: `[x, y, z, 1]` and `[r, g, b, a]` per vertex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBuffers {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl AttributeBuffers {
    fn with_vertices(count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(count * COMPONENTS_PER_VERTEX),
            colors: Vec::with_capacity(count * COMPONENTS_PER_VERTEX),
        }
    }

    fn push_vertex(&mut self, v: &Vertex, c: &Color) {
        self.positions.extend_from_slice(&[v.x, v.y, v.z, 1.0]);
        self.colors.extend_from_slice(&c.to_array());
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / COMPONENTS_PER_VERTEX
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Handle-keyed map that iterates in first-insertion order.
///
/// Overwriting an existing key keeps its position.
#[derive(Debug, Clone)]
struct OrderedPrimitives<T> {
    entries: HashMap<Handle, (u64, T)>,
    order: BTreeMap<u64, Handle>,
    next_sequence: u64,
}

impl<T> OrderedPrimitives<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    fn insert(&mut self, handle: Handle, value: T) {
        if let Some(entry) = self.entries.get_mut(&handle) {
            entry.1 = value;
            return;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.order.insert(sequence, handle);
        self.entries.insert(handle, (sequence, value));
    }

    fn remove(&mut self, handle: Handle) -> Option<T> {
        let (sequence, value) = self.entries.remove(&handle)?;
        self.order.remove(&sequence);
        Some(value)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(&handle).map(|(_, value)| value)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.order
            .values()
            .filter_map(move |handle| self.entries.get(handle).map(|(_, value)| (*handle, value)))
    }
}

/// The set of distinct primitive shapes to draw.
///
/// Identical geometry maps to the same handle, so adding it twice keeps a
/// single entry (the later color wins). Removing an absent handle is a no-op.
#[derive(Debug, Clone)]
pub struct Scene {
    triangles: OrderedPrimitives<Triangle>,
    lines: OrderedPrimitives<Line>,
    generation: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            triangles: OrderedPrimitives::new(),
            lines: OrderedPrimitives::new(),
            generation: 0,
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) -> Handle {
        let handle = triangle.handle();
        self.triangles.insert(handle, triangle);
        self.generation += 1;
        handle
    }

    pub fn add_line(&mut self, line: Line) -> Handle {
        let handle = line.handle();
        self.lines.insert(handle, line);
        self.generation += 1;
        handle
    }

    pub fn remove_triangle(&mut self, handle: Handle) {
        if self.triangles.remove(handle).is_some() {
            self.generation += 1;
        }
    }

    pub fn remove_line(&mut self, handle: Handle) {
        if self.lines.remove(handle).is_some() {
            self.generation += 1;
        }
    }

    /// Remove every triangle and line
    pub fn reset(&mut self) {
        self.triangles.clear();
        self.lines.clear();
        self.generation += 1;
    }

    pub fn triangle(&self, handle: Handle) -> Option<&Triangle> {
        self.triangles.get(handle)
    }

    pub fn line(&self, handle: Handle) -> Option<&Line> {
        self.lines.get(handle)
    }

    pub fn contains_triangle(&self, handle: Handle) -> bool {
        self.triangles.get(handle).is_some()
    }

    pub fn contains_line(&self, handle: Handle) -> bool {
        self.lines.get(handle).is_some()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0 && self.line_count() == 0
    }

    /// Triangles in insertion order
    pub fn triangles(&self) -> impl Iterator<Item = (Handle, &Triangle)> + '_ {
        self.triangles.iter()
    }

    /// Lines in insertion order
    pub fn lines(&self) -> impl Iterator<Item = (Handle, &Line)> + '_ {
        self.lines.iter()
    }

    /// Bumped on every change; compare against a stored value to detect
    /// stale flattened buffers
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Three vertices per triangle, in insertion order
    pub fn flatten_triangles(&self) -> AttributeBuffers {
        let mut buffers = AttributeBuffers::with_vertices(self.triangle_count() * 3);
        for (_, t) in self.triangles() {
            for v in t.vertices() {
                buffers.push_vertex(&v, &t.color);
            }
        }
        buffers
    }

    /// Two vertices per line, in insertion order
    pub fn flatten_lines(&self) -> AttributeBuffers {
        let mut buffers = AttributeBuffers::with_vertices(self.line_count() * 2);
        for (_, l) in self.lines() {
            for v in l.vertices() {
                buffers.push_vertex(&v, &l.color);
            }
        }
        buffers
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x: f32, color: Color) -> Line {
        Line::new(Vertex::ORIGIN, Vertex::new(x, 0.0, 0.0), color)
    }

    fn triangle(z: f32) -> Triangle {
        Triangle::new(
            Vertex::new(1.0, 1.0, z),
            Vertex::new(1.0, 0.0, z),
            Vertex::new(0.0, 1.0, z),
            Color::new(0.72, 0.13, 0.2, 1.0),
        )
    }

    #[test]
    fn test_adding_identical_triangle_keeps_one_entry() {
        let mut scene = Scene::new();
        let a = scene.add_triangle(triangle(-1.0));
        let b = scene.add_triangle(triangle(-1.0));
        assert_eq!(a, b);
        assert_eq!(scene.triangle_count(), 1);
    }

    #[test]
    fn test_overwrite_replaces_color_in_place() {
        let mut scene = Scene::new();
        scene.add_line(line(1.0, Color::RED));
        scene.add_line(line(2.0, Color::GREEN));
        let h = scene.add_line(line(1.0, Color::BLUE));

        assert_eq!(scene.line_count(), 2);
        assert_eq!(scene.line(h).unwrap().color, Color::BLUE);
        let order: Vec<f32> = scene.lines().map(|(_, l)| l.v2.x).collect();
        assert_eq!(order, vec![1.0, 2.0]);
    }

    #[test]
    fn test_removing_absent_handle_is_noop() {
        let mut scene = Scene::new();
        let h = scene.add_triangle(triangle(-1.0));
        let generation = scene.generation();

        scene.remove_triangle(h ^ 1);
        scene.remove_line(h);
        assert_eq!(scene.triangle_count(), 1);
        assert_eq!(scene.generation(), generation);

        scene.remove_triangle(h);
        assert_eq!(scene.triangle_count(), 0);
        assert!(scene.generation() > generation);
    }

    #[test]
    fn test_reset_empties_buffers() {
        let mut scene = Scene::new();
        scene.add_triangle(triangle(-1.0));
        scene.add_line(line(1.0, Color::RED));
        scene.reset();

        assert!(scene.is_empty());
        assert!(scene.flatten_triangles().is_empty());
        assert_eq!(scene.flatten_lines().positions.len(), 0);
        assert_eq!(scene.flatten_lines().colors.len(), 0);
    }

    #[test]
    fn test_flatten_triangles_layout() {
        let mut scene = Scene::new();
        scene.add_triangle(triangle(-1.0));
        scene.add_triangle(triangle(0.0));

        let buffers = scene.flatten_triangles();
        assert_eq!(buffers.vertex_count(), 6);
        assert_eq!(buffers.colors.len(), 24);
        assert_eq!(&buffers.positions[0..4], &[1.0, 1.0, -1.0, 1.0]);
        assert_eq!(&buffers.positions[12..16], &[1.0, 1.0, 0.0, 1.0]);
        assert_eq!(&buffers.colors[4..8], &[0.72, 0.13, 0.2, 1.0]);
    }

    #[test]
    fn test_order_survives_removal() {
        let mut scene = Scene::new();
        let handles: Vec<Handle> = (1..=4).map(|i| scene.add_line(line(i as f32, Color::RED))).collect();
        scene.remove_line(handles[1]);
        // re-added after removal goes to the back
        scene.add_line(line(2.0, Color::RED));

        let order: Vec<f32> = scene.lines().map(|(_, l)| l.v2.x).collect();
        assert_eq!(order, vec![1.0, 3.0, 4.0, 2.0]);

        let buffers = scene.flatten_lines();
        assert_eq!(buffers.vertex_count(), 8);
        assert_eq!(&buffers.positions[4..8], &[1.0, 0.0, 0.0, 1.0]);
    }
}
