#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Probabilistic perception and target tracking.
//!
//! Physical visibility falls off linearly with distance and is blended with
//! the observer's fuzzy combat confidence to produce a tracking confidence.
//! Low confidence degrades the reported target position with bounded noise;
//! losing sight decays the stored belief instead of discarding it, so agents
//! keep hunting where a rival was last seen.

pub mod fuzzy;

use std::collections::BTreeMap;

use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use scrapline_core::{AgentId, GridPos};

use crate::fuzzy::ConfidenceModel;

/// Distance at which physical visibility reaches zero.
pub const MAX_VISION_RANGE: f32 = 15.0;
/// Confidence above which the tracked position is reported exactly.
pub const EXACT_CONFIDENCE: f32 = 0.8;
/// Confidence above which suppression fire is still worthwhile.
pub const SUPPRESSION_CONFIDENCE: f32 = 0.4;
/// Confidence lost per update while the target is out of sight.
const BLIND_DECAY: f32 = 0.1;
/// Largest positional error, in cells per axis, at zero confidence.
const MAX_NOISE_CELLS: f32 = 5.0;

/// Physical visibility of `target` from `observer`, in `[0, 1]`.
///
/// Linear falloff with Euclidean distance; zero beyond
/// [`MAX_VISION_RANGE`].
#[must_use]
pub fn visibility(observer: GridPos, target: GridPos) -> f32 {
    let distance = observer.euclidean_distance(target);
    if distance > MAX_VISION_RANGE {
        return 0.0;
    }
    (1.0 - distance / MAX_VISION_RANGE).max(0.0)
}

/// Probabilistic belief about one target's location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetEstimate {
    /// Estimated cell, possibly degraded by noise.
    pub position: GridPos,
    /// Tracking confidence in `[0, 1]`.
    pub confidence: f32,
    /// Tick at which the target was last physically seen.
    pub last_seen_tick: u64,
}

/// Targeting behavior appropriate for a given tracking confidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetingStrategy {
    /// Trust the estimate and engage it directly.
    Exact,
    /// Spray the estimated area without committing.
    Suppression,
    /// Hold fire and keep looking.
    Search,
}

impl TargetingStrategy {
    /// Strategy band the provided confidence falls into.
    #[must_use]
    pub fn for_confidence(confidence: f32) -> Self {
        if confidence > EXACT_CONFIDENCE {
            Self::Exact
        } else if confidence > SUPPRESSION_CONFIDENCE {
            Self::Suppression
        } else {
            Self::Search
        }
    }
}

/// Tracks each observer's beliefs about rival positions.
#[derive(Debug)]
pub struct BeliefTracker {
    model: ConfidenceModel,
    beliefs: BTreeMap<(AgentId, AgentId), TargetEstimate>,
    rng: ChaCha8Rng,
}

impl BeliefTracker {
    /// Creates a tracker whose perception noise follows `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            model: ConfidenceModel::new(),
            beliefs: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Stored belief of `observer` about `target`, if one exists.
    #[must_use]
    pub fn belief(&self, observer: AgentId, target: AgentId) -> Option<&TargetEstimate> {
        self.beliefs.get(&(observer, target))
    }

    /// Updates the observer's belief about a target and returns it.
    ///
    /// While the target is visible the tracking confidence blends physical
    /// visibility (70%) with the observer's fuzzy combat confidence (30%),
    /// and low confidence perturbs the reported position by up to
    /// [`MAX_NOISE_CELLS`] per axis. While the target is out of sight the
    /// stored belief decays by [`BLIND_DECAY`] per update with its position
    /// frozen; with no stored belief a zero-confidence estimate is returned
    /// without being recorded.
    pub fn update_belief(
        &mut self,
        observer: AgentId,
        observer_position: GridPos,
        target: AgentId,
        target_position: GridPos,
        tick: u64,
        observer_health: f32,
        observer_ammo: f32,
    ) -> TargetEstimate {
        let key = (observer, target);
        let vis_score = visibility(observer_position, target_position);

        if vis_score <= 0.01 {
            if let Some(belief) = self.beliefs.get_mut(&key) {
                belief.confidence = (belief.confidence - BLIND_DECAY).max(0.0);
                return *belief;
            }
            return TargetEstimate {
                position: GridPos::new(0, 0),
                confidence: 0.0,
                last_seen_tick: tick,
            };
        }

        let internal = self.model.combat_confidence(observer_health, observer_ammo);
        let confidence = (vis_score * 0.7 + internal * 0.3).clamp(0.0, 1.0);

        let position = if confidence > EXACT_CONFIDENCE {
            target_position
        } else {
            let noise_range = ((1.0 - confidence) * MAX_NOISE_CELLS) as i32;
            let dx = self.rng.gen_range(-noise_range..=noise_range);
            let dy = self.rng.gen_range(-noise_range..=noise_range);
            target_position.offset(dx, dy)
        };

        let estimate = TargetEstimate {
            position,
            confidence,
            last_seen_tick: tick,
        };
        trace!(
            "agent {} tracks agent {} at ({}, {}) with confidence {confidence:.2}",
            observer.get(),
            target.get(),
            position.x(),
            position.y()
        );
        let _ = self.beliefs.insert(key, estimate);
        estimate
    }
}
