//! Undirected labeled graph over hashable keys
//!
//! The sniffer uses this structure to track which network nodes claim to be
//! connected to which others. Edges are undirected and self-loops are
//! ignored; removing a vertex drops every edge incident to it.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A vertex and its adjacency set.
#[derive(Debug, Clone)]
pub struct Vertex<K, V> {
    key: K,
    value: V,
    neighbors: HashSet<K>,
}

impl<K, V> Vertex<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &K> {
        self.neighbors.iter()
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph<K, V> {
    vertices: HashMap<K, Vertex<K, V>>,
}

impl<K, V> Graph<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            vertices: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.vertices.contains_key(key)
    }

    pub fn vertex(&self, key: &K) -> Option<&Vertex<K, V>> {
        self.vertices.get(key)
    }

    pub fn vertex_mut(&mut self, key: &K) -> Option<&mut Vertex<K, V>> {
        self.vertices.get_mut(key)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<K, V>> {
        self.vertices.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.vertices.keys()
    }

    pub fn neighbors(&self, key: &K) -> Option<impl Iterator<Item = &K>> {
        self.vertices.get(key).map(|v| v.neighbors.iter())
    }

    /// Adds a vertex; a key already present keeps its existing value and
    /// edges.
    pub fn add_vertex(&mut self, key: K, value: V) {
        self.vertices.entry(key.clone()).or_insert_with(|| Vertex {
            key,
            value,
            neighbors: HashSet::new(),
        });
    }

    /// Adds a vertex, building the value only when the key is new.
    pub fn add_vertex_with(&mut self, key: K, value: impl FnOnce() -> V) {
        self.vertices.entry(key.clone()).or_insert_with(|| Vertex {
            key,
            value: value(),
            neighbors: HashSet::new(),
        });
    }

    /// Adds an undirected edge. Self-loops and edges touching unknown
    /// vertices are ignored; duplicates collapse.
    pub fn add_edge(&mut self, a: &K, b: &K) {
        if a == b || !self.vertices.contains_key(a) || !self.vertices.contains_key(b) {
            return;
        }
        if let Some(vertex) = self.vertices.get_mut(a) {
            vertex.neighbors.insert(b.clone());
        }
        if let Some(vertex) = self.vertices.get_mut(b) {
            vertex.neighbors.insert(a.clone());
        }
    }

    pub fn remove_edge(&mut self, a: &K, b: &K) {
        if !self.vertices.contains_key(a) || !self.vertices.contains_key(b) {
            return;
        }
        if let Some(vertex) = self.vertices.get_mut(a) {
            vertex.neighbors.remove(b);
        }
        if let Some(vertex) = self.vertices.get_mut(b) {
            vertex.neighbors.remove(a);
        }
    }

    /// Removes a vertex together with every edge incident to it.
    pub fn remove_vertex(&mut self, key: &K) {
        if let Some(vertex) = self.vertices.remove(key) {
            for neighbor in vertex.neighbors {
                if let Some(other) = self.vertices.get_mut(&neighbor) {
                    other.neighbors.remove(key);
                }
            }
        }
    }

    /// Depth-first traversal from `start`. Returning `false` from `visit`
    /// stops descending below that vertex, siblings are still explored.
    pub fn dfs(&self, start: &K, mut visit: impl FnMut(&K, &V) -> bool) {
        if !self.vertices.contains_key(start) {
            return;
        }
        let mut visited: HashSet<K> = HashSet::new();
        let mut stack = vec![start.clone()];
        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let Some(vertex) = self.vertices.get(&key) else {
                continue;
            };
            if !visit(&vertex.key, &vertex.value) {
                continue;
            }
            for neighbor in &vertex.neighbors {
                if !visited.contains(neighbor) {
                    stack.push(neighbor.clone());
                }
            }
        }
    }
}
