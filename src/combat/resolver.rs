//! Pure damage resolution for a single attack. No state, no logging: stats
//! in, damage and outcome flags out. Callers own HP mutation.
//!
//! Roll order is fixed (combo, dodge, block, crit, penetrate) so a seeded
//! source replays an identical battle. Block is only rolled when the attack
//! was not dodged, and penetrate only when it did not crit; crit is rolled
//! even against a dodge (the roll is consumed, the multiplier is not
//! applied), matching the reference draw pattern.

use serde::Serialize;

use crate::combat::rng::RollSource;
use crate::combat::stats::StatSet;

/// Dampening and block efficiency cap just shy of 100% in the damage path.
pub const RATE_DAMPEN_CAP: f64 = 99.99;

/// Outcome flags of one attack. Dodge/block are mutually exclusive, as are
/// crit/penetrate; combo suppresses all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttackEffect {
    Combo,
    Crit,
    Penetrate,
    Dodge,
    Block,
}

/// Resolved attack: final damage plus the effects that shaped it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOutcome {
    pub damage: f64,
    pub effects: Vec<AttackEffect>,
    /// The defender's next action is to be skipped.
    pub combo: bool,
}

impl AttackOutcome {
    pub fn has(&self, effect: AttackEffect) -> bool {
        self.effects.contains(&effect)
    }
}

/// Damage reduction percentage granted by the defender's defense. A zero
/// denominator (nobody has defense or four-dimensions) means no reduction.
pub fn damage_reduction(attacker: &StatSet, defender: &StatSet) -> f64 {
    let denominator = defender.defense + attacker.four_dimensions + defender.four_dimensions;
    if denominator > 0.0 {
        defender.defense / denominator * 100.0
    } else {
        0.0
    }
}

/// A trigger rate dampened by the defender's toughness.
pub fn dampened_rate(base_rate: f64, toughness: f64) -> f64 {
    let toughness = toughness.clamp(0.0, RATE_DAMPEN_CAP);
    base_rate * (1.0 - toughness / 100.0)
}

/// Pre-effect damage: attack through reduction and both damage coefficients,
/// rounded with a floor of 1.
pub fn base_damage(attacker: &StatSet, defender: &StatSet) -> f64 {
    let reduction = damage_reduction(attacker, defender);
    let damage = attacker.attack
        * (1.0 - reduction / 100.0)
        * (1.0 + (attacker.damage_coefficient - 100.0) / 100.0)
        * (1.0 + (defender.damage_taken_coefficient - 100.0) / 100.0);
    damage.round().max(1.0)
}

/// Resolve one attack. `follow_up` suppresses the combo check so a combo can
/// never chain off itself.
pub fn resolve_attack(
    attacker: &StatSet,
    defender: &StatSet,
    follow_up: bool,
    rng: &mut dyn RollSource,
) -> AttackOutcome {
    let damage = base_damage(attacker, defender);

    if !follow_up {
        let combo_rate = dampened_rate(attacker.combo_rate, defender.toughness);
        if rng.roll_percent() < combo_rate {
            // Combo lands the plain hit and skips the defender's next action;
            // no other effect applies to this attack.
            return AttackOutcome {
                damage,
                effects: vec![AttackEffect::Combo],
                combo: true,
            };
        }
    }

    let mut damage = damage;
    let mut effects = Vec::new();

    let dodged = rng.roll_percent() < defender.dodge_rate;
    let blocked = !dodged && rng.roll_percent() < defender.block_rate;

    let crit = rng.roll_percent() < dampened_rate(attacker.crit_rate, defender.toughness);
    let penetrate =
        !crit && rng.roll_percent() < dampened_rate(attacker.penetrate_rate, defender.toughness);

    if dodged {
        damage = 0.0;
        effects.push(AttackEffect::Dodge);
    } else if blocked {
        let efficiency = defender.block_efficiency.clamp(0.0, RATE_DAMPEN_CAP);
        damage *= 1.0 - efficiency / 100.0;
        effects.push(AttackEffect::Block);
    }

    if !dodged {
        if crit {
            damage *= attacker.crit_damage / 100.0;
            effects.push(AttackEffect::Crit);
        } else if penetrate {
            damage *= attacker.penetrate_damage / 100.0;
            effects.push(AttackEffect::Penetrate);
        }
        damage = damage.round().max(1.0);
    }

    AttackOutcome {
        damage,
        effects,
        combo: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::rng::{Rng, ScriptedRolls};

    fn attacker(attack: f64) -> StatSet {
        StatSet {
            max_hp: 1000.0,
            current_hp: 1000.0,
            attack,
            ..StatSet::default()
        }
    }

    #[test]
    fn zero_defense_denominator_means_no_reduction() {
        let a = attacker(200.0);
        let d = attacker(100.0);
        assert_eq!(damage_reduction(&a, &d), 0.0);
        assert_eq!(base_damage(&a, &d), 200.0);
    }

    #[test]
    fn reduction_follows_defense_over_pools() {
        let a = StatSet {
            four_dimensions: 100.0,
            ..attacker(1000.0)
        };
        let d = StatSet {
            defense: 300.0,
            four_dimensions: 100.0,
            ..attacker(0.0)
        };
        assert_eq!(damage_reduction(&a, &d), 60.0);
        assert_eq!(base_damage(&a, &d), 400.0);
    }

    #[test]
    fn damage_floors_at_one() {
        let a = attacker(1.0);
        let d = StatSet {
            defense: 1_000_000.0,
            ..attacker(0.0)
        };
        assert_eq!(base_damage(&a, &d), 1.0);

        let mut rng = ScriptedRolls::constant(100.0);
        let outcome = resolve_attack(&a, &d, false, &mut rng);
        assert_eq!(outcome.damage, 1.0);
    }

    #[test]
    fn dodge_zeroes_damage_and_suppresses_attack_effects() {
        let a = StatSet {
            crit_rate: 100.0,
            ..attacker(500.0)
        };
        let d = StatSet {
            dodge_rate: 100.0,
            ..attacker(0.0)
        };
        let mut rng = ScriptedRolls::constant(0.0);
        let outcome = resolve_attack(&a, &d, false, &mut rng);

        assert_eq!(outcome.damage, 0.0);
        assert!(outcome.has(AttackEffect::Dodge));
        assert!(!outcome.has(AttackEffect::Crit));
        assert!(!outcome.has(AttackEffect::Block));
    }

    #[test]
    fn dodge_and_block_are_mutually_exclusive() {
        let a = attacker(500.0);
        let d = StatSet {
            dodge_rate: 100.0,
            block_rate: 100.0,
            ..attacker(0.0)
        };
        for seed in 0..50 {
            let mut rng = Rng::new(seed);
            let outcome = resolve_attack(&a, &d, false, &mut rng);
            assert!(!(outcome.has(AttackEffect::Dodge) && outcome.has(AttackEffect::Block)));
        }
    }

    #[test]
    fn crit_and_penetrate_are_mutually_exclusive() {
        let a = StatSet {
            crit_rate: 100.0,
            penetrate_rate: 100.0,
            crit_damage: 200.0,
            penetrate_damage: 300.0,
            ..attacker(100.0)
        };
        let d = attacker(0.0);
        for seed in 0..50 {
            let mut rng = Rng::new(seed);
            let outcome = resolve_attack(&a, &d, false, &mut rng);
            assert!(!(outcome.has(AttackEffect::Crit) && outcome.has(AttackEffect::Penetrate)));
        }
        let mut rng = ScriptedRolls::constant(0.0);
        let outcome = resolve_attack(&a, &d, false, &mut rng);
        assert!(outcome.has(AttackEffect::Crit));
        assert_eq!(outcome.damage, 200.0);
    }

    #[test]
    fn combo_suppresses_every_other_effect() {
        let a = StatSet {
            combo_rate: 100.0,
            crit_rate: 100.0,
            penetrate_rate: 100.0,
            ..attacker(100.0)
        };
        let d = StatSet {
            dodge_rate: 100.0,
            block_rate: 100.0,
            ..attacker(0.0)
        };
        let mut rng = ScriptedRolls::constant(0.0);
        let outcome = resolve_attack(&a, &d, false, &mut rng);

        assert!(outcome.combo);
        assert_eq!(outcome.effects, vec![AttackEffect::Combo]);
        assert_eq!(outcome.damage, 100.0);
        // Combo consumed exactly one roll.
        assert_eq!(rng.rolls_consumed(), 1);
    }

    #[test]
    fn follow_up_attacks_never_roll_combo() {
        let a = StatSet {
            combo_rate: 100.0,
            ..attacker(100.0)
        };
        let d = attacker(0.0);
        let mut rng = ScriptedRolls::constant(0.0);
        let outcome = resolve_attack(&a, &d, true, &mut rng);
        assert!(!outcome.combo);
    }

    #[test]
    fn full_toughness_nullifies_dampened_rates() {
        assert_eq!(dampened_rate(100.0, 100.0), 100.0 * (1.0 - 99.99 / 100.0));
        let a = StatSet {
            combo_rate: 100.0,
            crit_rate: 100.0,
            penetrate_rate: 100.0,
            ..attacker(100.0)
        };
        let d = StatSet {
            toughness: 100.0,
            ..attacker(0.0)
        };
        // Rolls of exactly the residual rate or above never trigger; with a
        // 0.01% residual, any roll >= 0.01 fails every dampened check.
        let mut rng = ScriptedRolls::constant(0.01);
        let outcome = resolve_attack(&a, &d, false, &mut rng);
        assert!(!outcome.combo);
        assert!(!outcome.has(AttackEffect::Crit));
        assert!(!outcome.has(AttackEffect::Penetrate));
    }

    #[test]
    fn block_scales_by_efficiency() {
        let a = attacker(1000.0);
        let d = StatSet {
            block_rate: 100.0,
            block_efficiency: 75.0,
            ..attacker(0.0)
        };
        // combo and dodge rolls miss, block roll hits, crit and penetrate miss.
        let mut rng = ScriptedRolls::new(vec![99.0, 99.0, 0.0, 99.0, 99.0]);
        let outcome = resolve_attack(&a, &d, false, &mut rng);
        assert!(outcome.has(AttackEffect::Block));
        assert_eq!(outcome.damage, 250.0);
    }
}
