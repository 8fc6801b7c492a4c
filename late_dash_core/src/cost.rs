//! Edge costs modulated by the speed boost and the hazard's position.
//!
//! Costs depend on the hazard position at call time, so the same start and
//! goal can price differently from one call to the next.

use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    config::{BASE_COST, EngineConfig},
};

/// Global modifiers applied uniformly to every edge of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModifiers {
    pub speed_boost_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    danger_radius: u32,
    proximity_penalty_scale: f64,
    speed_boost_multiplier: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel::from_config(&EngineConfig::default())
    }
}

impl CostModel {
    pub fn new(
        danger_radius: u32,
        proximity_penalty_scale: f64,
        speed_boost_multiplier: f64,
    ) -> Self {
        debug_assert!(proximity_penalty_scale >= 0.0, "negative proximity penalty");
        debug_assert!(speed_boost_multiplier >= 0.0, "negative boost multiplier");
        CostModel {
            danger_radius,
            proximity_penalty_scale,
            speed_boost_multiplier,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        CostModel::new(
            config.danger_radius,
            config.proximity_penalty_scale,
            config.speed_boost_multiplier,
        )
    }

    fn scaled(&self, base: f64, modifiers: CostModifiers) -> f64 {
        if modifiers.speed_boost_active {
            base * self.speed_boost_multiplier
        } else {
            base
        }
    }

    /// Surcharge for standing on `to` while the hazard is at `hazard`.
    pub fn proximity_surcharge(&self, to: Position, hazard: Option<Position>) -> f64 {
        match hazard {
            Some(hazard) => {
                let distance = to.manhattan(hazard);
                if distance <= self.danger_radius {
                    self.proximity_penalty_scale * f64::from(self.danger_radius - distance + 1)
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    /// Cost of a single step from `from` onto the walkable cell `to`.
    ///
    /// The boost halves the base cost only; the hazard surcharge is added
    /// unscaled on top.
    pub fn edge_cost(
        &self,
        from: Position,
        to: Position,
        hazard: Option<Position>,
        modifiers: CostModifiers,
    ) -> f64 {
        let base = if from.is_diagonal_to(to) {
            SQRT_2
        } else {
            BASE_COST
        };
        let cost = self.scaled(base, modifiers) + self.proximity_surcharge(to, hazard);
        debug_assert!(cost.is_finite() && cost >= 0.0, "edge cost out of range: {cost}");
        cost
    }

    /// Cost of hopping between the two ends of a door pair. Doors are safe,
    /// so no surcharge applies.
    pub fn teleport_cost(&self, modifiers: CostModifiers) -> f64 {
        self.scaled(BASE_COST, modifiers)
    }
}

/// The speed-boost gadget carried by the mover.
///
/// `moves_left` is `None` for a boost that lasts until switched off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedBoost {
    pub active: bool,
    pub moves_left: Option<u32>,
}

impl SpeedBoost {
    pub fn activated(duration: Option<u32>) -> Self {
        match duration {
            Some(0) => SpeedBoost::default(),
            _ => SpeedBoost {
                active: true,
                moves_left: duration,
            },
        }
    }

    pub fn modifiers(self) -> CostModifiers {
        CostModifiers {
            speed_boost_active: self.active,
        }
    }
}

/// Consumes one mover step from a limited boost, expiring it at zero.
pub fn apply_step_to_modifier(state: SpeedBoost) -> SpeedBoost {
    match state {
        SpeedBoost {
            active: true,
            moves_left: Some(left),
        } if left <= 1 => SpeedBoost::default(),
        SpeedBoost {
            active: true,
            moves_left: Some(left),
        } => SpeedBoost {
            active: true,
            moves_left: Some(left - 1),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOST: CostModifiers = CostModifiers {
        speed_boost_active: true,
    };
    const PLAIN: CostModifiers = CostModifiers {
        speed_boost_active: false,
    };

    fn pos(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn plain_step_costs_one_and_boost_halves_it() {
        let model = CostModel::default();
        assert_eq!(model.edge_cost(pos(0, 0), pos(0, 1), None, PLAIN), 1.0);
        assert_eq!(model.edge_cost(pos(0, 0), pos(0, 1), None, BOOST), 0.5);
    }

    #[test]
    fn diagonal_step_costs_root_two() {
        let model = CostModel::default();
        assert_eq!(model.edge_cost(pos(0, 0), pos(1, 1), None, PLAIN), SQRT_2);
    }

    #[test]
    fn surcharge_grows_toward_the_hazard_and_ignores_boost() {
        let model = CostModel::default();
        let hazard = Some(pos(5, 5));
        // distance 2: 3.0 * (2 - 2 + 1)
        assert_eq!(model.edge_cost(pos(5, 2), pos(5, 3), hazard, PLAIN), 4.0);
        // distance 1: 3.0 * 2
        assert_eq!(model.edge_cost(pos(5, 3), pos(5, 4), hazard, PLAIN), 7.0);
        assert_eq!(model.edge_cost(pos(5, 3), pos(5, 4), hazard, BOOST), 6.5);
        // distance 3 is outside the radius
        assert_eq!(model.edge_cost(pos(5, 1), pos(5, 2), hazard, PLAIN), 1.0);
    }

    #[test]
    fn teleport_has_no_surcharge() {
        let model = CostModel::default();
        assert_eq!(model.teleport_cost(PLAIN), 1.0);
        assert_eq!(model.teleport_cost(BOOST), 0.5);
    }

    #[test]
    fn limited_boost_expires_after_its_moves() {
        let mut boost = SpeedBoost::activated(Some(2));
        boost = apply_step_to_modifier(boost);
        assert_eq!(boost.moves_left, Some(1));
        assert!(boost.modifiers().speed_boost_active);
        boost = apply_step_to_modifier(boost);
        assert_eq!(boost, SpeedBoost::default());
    }

    #[test]
    fn unlimited_boost_survives_steps() {
        let boost = SpeedBoost::activated(None);
        assert_eq!(apply_step_to_modifier(boost), boost);
        assert_eq!(
            apply_step_to_modifier(SpeedBoost::default()),
            SpeedBoost::default()
        );
    }
}
