//! Procedural motion for top-level nodes.
//!
//! Moving nodes without touching their shapes keeps the record count and
//! every non-transform field stable, so the packer takes the in-place update
//! path on every animated frame.

use std::f32::consts::TAU;

use glam::Vec3;
use scene::{EntityId, NodeGraph};
use tracing::debug;

use crate::config::AnimationConfig;

/// Bobs every root node up and down around its loaded position.
#[derive(Debug, Clone)]
pub struct Bobber {
    amplitude: f32,
    speed: f32,
    rest: Vec<(EntityId, Vec3)>,
}

impl Bobber {
    /// Captures the current translation of each root as its rest position.
    pub fn new(graph: &NodeGraph, config: &AnimationConfig) -> Self {
        let rest = graph
            .roots()
            .iter()
            .filter_map(|&id| graph.node(id).map(|node| (id, node.translation)))
            .collect();
        Self {
            amplitude: config.bob_amplitude,
            speed: config.bob_speed,
            rest,
        }
    }

    pub fn is_active(&self) -> bool {
        self.amplitude != 0.0 && self.speed != 0.0
    }

    /// Vertical offset of the `index`-th root at `seconds`. Roots are phase
    /// shifted so they do not move in lockstep.
    pub fn offset(&self, index: usize, seconds: f32) -> f32 {
        let phase = index as f32 * 0.25 * TAU;
        self.amplitude * (seconds * self.speed * TAU + phase).sin()
    }

    /// Moves every captured root to its position at `seconds`. Roots that
    /// no longer exist are ignored.
    pub fn apply(&self, graph: &mut NodeGraph, seconds: f32) {
        if !self.is_active() {
            return;
        }
        for (index, &(id, rest)) in self.rest.iter().enumerate() {
            let position = rest + Vec3::Y * self.offset(index, seconds);
            if let Err(e) = graph.set_translation(id, position) {
                debug!("Not bobbing {id:?}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_roots(n: usize) -> NodeGraph {
        let mut graph = NodeGraph::new();
        for i in 0..n {
            let id = graph.spawn(&format!("root{i}"));
            graph.set_translation(id, Vec3::new(i as f32, 1.0, 0.0)).unwrap();
        }
        graph
    }

    #[test]
    fn disabled_animation_leaves_graph_alone() {
        let mut graph = graph_with_roots(2);
        let config = AnimationConfig {
            bob_amplitude: 0.0,
            bob_speed: 1.0,
        };
        let bobber = Bobber::new(&graph, &config);
        assert!(!bobber.is_active());
        bobber.apply(&mut graph, 0.3);
        let root = graph.roots()[0];
        assert_eq!(graph.node(root).unwrap().translation, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn roots_move_vertically_around_rest() {
        let mut graph = graph_with_roots(1);
        let config = AnimationConfig {
            bob_amplitude: 0.5,
            bob_speed: 1.0,
        };
        let bobber = Bobber::new(&graph, &config);
        let root = graph.roots()[0];

        // Quarter period: sin reaches its peak.
        bobber.apply(&mut graph, 0.25);
        let moved = graph.node(root).unwrap().translation;
        assert!((moved - Vec3::new(0.0, 1.5, 0.0)).length() < 1e-5, "got {moved}");

        // Motion is relative to the rest pose, not cumulative.
        bobber.apply(&mut graph, 0.0);
        let back = graph.node(root).unwrap().translation;
        assert!((back - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5, "got {back}");
    }

    #[test]
    fn children_are_not_animated_directly() {
        let mut graph = NodeGraph::new();
        let root = graph.spawn("root");
        let child = graph.spawn_child(root, "child").unwrap();
        graph.set_translation(child, Vec3::X).unwrap();

        let bobber = Bobber::new(&graph, &AnimationConfig::default());
        bobber.apply(&mut graph, 1.3);
        assert_eq!(graph.node(child).unwrap().translation, Vec3::X);
    }

    #[test]
    fn despawned_root_is_skipped() {
        let mut graph = graph_with_roots(2);
        let config = AnimationConfig {
            bob_amplitude: 0.5,
            bob_speed: 1.0,
        };
        let bobber = Bobber::new(&graph, &config);
        let [gone, kept] = [graph.roots()[0], graph.roots()[1]];
        graph.despawn(gone).unwrap();

        bobber.apply(&mut graph, 0.5);
        assert!(graph.node(gone).is_none());
        let moved = graph.node(kept).unwrap().translation;
        assert!((moved.y - 1.0).abs() > 1e-3, "Remaining root still moves, got {moved}");
    }
}
