//! Fuzzy inference over an agent's internal state.
//!
//! Combat confidence is derived from health and ammo through three Mamdani
//! rules and defuzzified as a strength-weighted average of the rule outputs.
//! Set boundaries extend one unit past the physical range so membership never
//! drops to zero exactly at the edges.

/// Triangular membership function over a scalar input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangularSet {
    low: f32,
    peak: f32,
    high: f32,
}

impl TriangularSet {
    /// Creates a set with the provided support `[low, high]` and peak.
    #[must_use]
    pub const fn new(low: f32, peak: f32, high: f32) -> Self {
        Self { low, peak, high }
    }

    /// Membership degree of `x` in `[0, 1]`.
    #[must_use]
    pub fn membership(&self, x: f32) -> f32 {
        if x <= self.low || x >= self.high {
            return 0.0;
        }
        if x == self.peak {
            return 1.0;
        }
        if x < self.peak {
            if self.peak == self.low {
                return 1.0;
            }
            (x - self.low) / (self.peak - self.low)
        } else {
            if self.high == self.peak {
                return 1.0;
            }
            (self.high - x) / (self.high - self.peak)
        }
    }
}

/// Rule output centroid for low confidence.
const LOW_CONFIDENCE: f32 = 0.2;
/// Rule output centroid for medium confidence.
const MEDIUM_CONFIDENCE: f32 = 0.5;
/// Rule output centroid for high confidence.
const HIGH_CONFIDENCE: f32 = 0.9;

/// Fuzzy model mapping health and ammo to combat confidence.
#[derive(Clone, Copy, Debug)]
pub struct ConfidenceModel {
    health_low: TriangularSet,
    health_medium: TriangularSet,
    health_high: TriangularSet,
    ammo_low: TriangularSet,
    ammo_medium: TriangularSet,
    ammo_high: TriangularSet,
}

impl Default for ConfidenceModel {
    fn default() -> Self {
        Self {
            health_low: TriangularSet::new(-1.0, 0.0, 50.0),
            health_medium: TriangularSet::new(25.0, 50.0, 75.0),
            health_high: TriangularSet::new(50.0, 100.0, 101.0),
            ammo_low: TriangularSet::new(-1.0, 0.0, 5.0),
            ammo_medium: TriangularSet::new(2.0, 5.0, 10.0),
            ammo_high: TriangularSet::new(5.0, 20.0, 21.0),
        }
    }
}

impl ConfidenceModel {
    /// Creates the model with its standard set boundaries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Combat confidence in `[0, 1]` for the provided internal state.
    ///
    /// Rules: high health and high ammo yield high confidence; medium health
    /// and medium ammo yield medium confidence; low health or low ammo yields
    /// low confidence. Returns zero when no rule fires at all.
    #[must_use]
    pub fn combat_confidence(&self, health: f32, ammo: f32) -> f32 {
        let confident = self
            .health_high
            .membership(health)
            .min(self.ammo_high.membership(ammo));
        let steady = self
            .health_medium
            .membership(health)
            .min(self.ammo_medium.membership(ammo));
        let shaken = self
            .health_low
            .membership(health)
            .max(self.ammo_low.membership(ammo));

        let weight_sum = confident + steady + shaken;
        if weight_sum == 0.0 {
            return 0.0;
        }
        (confident * HIGH_CONFIDENCE + steady * MEDIUM_CONFIDENCE + shaken * LOW_CONFIDENCE)
            / weight_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn triangular_membership_matches_the_ramp() {
        let set = TriangularSet::new(0.0, 5.0, 10.0);
        assert_close(set.membership(0.0), 0.0);
        assert_close(set.membership(5.0), 1.0);
        assert_close(set.membership(10.0), 0.0);
        assert_close(set.membership(2.5), 0.5);
        assert_close(set.membership(7.5), 0.5);
        assert_close(set.membership(-1.0), 0.0);
        assert_close(set.membership(11.0), 0.0);
    }

    #[test]
    fn full_health_and_ammo_yield_high_confidence() {
        let model = ConfidenceModel::new();
        assert_close(model.combat_confidence(100.0, 20.0), 0.9);
    }

    #[test]
    fn depleted_agents_yield_low_confidence() {
        let model = ConfidenceModel::new();
        assert_close(model.combat_confidence(10.0, 0.0), 0.2);
    }

    #[test]
    fn medium_everything_yields_the_middle_band() {
        let model = ConfidenceModel::new();
        assert_close(model.combat_confidence(50.0, 5.0), 0.5);
    }

    #[test]
    fn an_empty_weapon_dominates_full_health() {
        let model = ConfidenceModel::new();
        assert_close(model.combat_confidence(100.0, 0.0), 0.2);
    }

    #[test]
    fn confidence_stays_inside_the_unit_interval() {
        let model = ConfidenceModel::new();
        let cases = [
            (0.0, 0.0),
            (100.0, 20.0),
            (50.0, 5.0),
            (100.0, 0.0),
            (0.0, 20.0),
            (-10.0, -10.0),
            (200.0, 50.0),
            (f32::INFINITY, f32::INFINITY),
        ];
        for (health, ammo) in cases {
            let confidence = model.combat_confidence(health, ammo);
            assert!(
                (0.0..=1.0).contains(&confidence),
                "confidence {confidence} out of range for health={health}, ammo={ammo}"
            );
        }
    }
}
