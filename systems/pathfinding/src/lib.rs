#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure A* planner over the world's navigation oracle.
//!
//! The planner charges the provider's per-cell entry cost for every step and
//! guides the search with a Manhattan heuristic. Tile costs are always at
//! least one, so the heuristic never overestimates and the first goal pop is
//! optimal. Expansion order is made deterministic by breaking f-score ties
//! with the order nodes entered the frontier.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use log::trace;

use scrapline_core::{GridPos, WorldProvider};

/// Frontier entry ordered for a min-heap on f-score, then insertion order.
#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f_score: f32,
    sequence: u64,
    position: GridPos,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the std max-heap pops the smallest f-score first.
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// A* pathfinder that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct Pathfinder {
    open: BinaryHeap<OpenNode>,
    came_from: HashMap<GridPos, GridPos>,
    g_score: HashMap<GridPos, f32>,
}

impl Pathfinder {
    /// Creates a new pathfinder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans a cheapest path from `start` to `goal` over the provider.
    ///
    /// The output buffer is cleared first. On success it holds every cell of
    /// the path including both endpoints; when `start == goal` it holds the
    /// single start cell; when no path exists it stays empty.
    pub fn find_path<P: WorldProvider>(
        &mut self,
        start: GridPos,
        goal: GridPos,
        provider: &P,
        out: &mut Vec<GridPos>,
    ) {
        out.clear();
        if start == goal {
            out.push(start);
            return;
        }

        self.open.clear();
        self.came_from.clear();
        self.g_score.clear();

        let mut sequence = 0_u64;
        self.open.push(OpenNode {
            f_score: 0.0,
            sequence,
            position: start,
        });
        let _ = self.g_score.insert(start, 0.0);

        let mut expanded = 0_u64;
        while let Some(node) = self.open.pop() {
            let current = node.position;
            expanded += 1;

            if current == goal {
                self.reconstruct(current, out);
                trace!(
                    "path ({}, {}) -> ({}, {}): {} cells, {expanded} expansions",
                    start.x(),
                    start.y(),
                    goal.x(),
                    goal.y(),
                    out.len()
                );
                return;
            }

            let current_g = self.g_score.get(&current).copied().unwrap_or(f32::INFINITY);
            for neighbor in provider.neighbors(current) {
                let tentative_g = current_g + provider.cost(neighbor);
                let known_g = self
                    .g_score
                    .get(&neighbor)
                    .copied()
                    .unwrap_or(f32::INFINITY);
                if tentative_g < known_g {
                    let _ = self.came_from.insert(neighbor, current);
                    let _ = self.g_score.insert(neighbor, tentative_g);
                    sequence += 1;
                    self.open.push(OpenNode {
                        f_score: tentative_g + neighbor.manhattan_distance(goal) as f32,
                        sequence,
                        position: neighbor,
                    });
                }
            }
        }

        trace!(
            "no path ({}, {}) -> ({}, {}) after {expanded} expansions",
            start.x(),
            start.y(),
            goal.x(),
            goal.y()
        );
    }

    fn reconstruct(&self, goal: GridPos, out: &mut Vec<GridPos>) {
        out.push(goal);
        let mut current = goal;
        while let Some(&previous) = self.came_from.get(&current) {
            current = previous;
            out.push(current);
        }
        out.reverse();
    }
}
