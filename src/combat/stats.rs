//! Combatant stat model: the full attribute sheet, clamp rules, and the
//! base/effective split. `base` holds the configured values; `effective` is
//! derived from base plus all active card contributions and is the only copy
//! combat reads or mutates.

use serde::{Deserialize, Serialize};

use crate::combat::card::EffectLedger;

/// Every stat a combatant carries. Probability rates and toughness live in
/// `[0, 100]`; coefficient stats are percentages that may exceed 100 but
/// never go negative; everything else is floored at 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatSet {
    pub max_hp: f64,
    pub current_hp: f64,
    pub attack: f64,
    pub defense: f64,
    pub four_dimensions: f64,
    pub speed: f64,
    pub toughness: f64,
    pub crit_rate: f64,
    pub penetrate_rate: f64,
    pub dodge_rate: f64,
    pub block_rate: f64,
    pub combo_rate: f64,
    pub crit_damage: f64,
    pub penetrate_damage: f64,
    pub block_efficiency: f64,
    pub damage_coefficient: f64,
    pub damage_taken_coefficient: f64,
    pub heal_coefficient: f64,
}

impl Default for StatSet {
    /// Neutral sheet: no offense or defense, multiplier coefficients at the
    /// 100% identity.
    fn default() -> Self {
        Self {
            max_hp: 0.0,
            current_hp: 0.0,
            attack: 0.0,
            defense: 0.0,
            four_dimensions: 0.0,
            speed: 0.0,
            toughness: 0.0,
            crit_rate: 0.0,
            penetrate_rate: 0.0,
            dodge_rate: 0.0,
            block_rate: 0.0,
            combo_rate: 0.0,
            crit_damage: 100.0,
            penetrate_damage: 100.0,
            block_efficiency: 0.0,
            damage_coefficient: 100.0,
            damage_taken_coefficient: 100.0,
            heal_coefficient: 100.0,
        }
    }
}

/// Addressable stat names, used by card effects and the clamp table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatName {
    MaxHp,
    CurrentHp,
    Attack,
    Defense,
    FourDimensions,
    Speed,
    Toughness,
    CritRate,
    PenetrateRate,
    DodgeRate,
    BlockRate,
    ComboRate,
    CritDamage,
    PenetrateDamage,
    BlockEfficiency,
    DamageCoefficient,
    DamageTakenCoefficient,
    HealCoefficient,
}

impl StatName {
    /// True for rates bounded to `[0, 100]`.
    pub const fn is_percentage_bounded(self) -> bool {
        matches!(
            self,
            Self::Toughness
                | Self::CritRate
                | Self::PenetrateRate
                | Self::DodgeRate
                | Self::BlockRate
                | Self::ComboRate
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxHp => "maxHp",
            Self::CurrentHp => "currentHp",
            Self::Attack => "attack",
            Self::Defense => "defense",
            Self::FourDimensions => "fourDimensions",
            Self::Speed => "speed",
            Self::Toughness => "toughness",
            Self::CritRate => "critRate",
            Self::PenetrateRate => "penetrateRate",
            Self::DodgeRate => "dodgeRate",
            Self::BlockRate => "blockRate",
            Self::ComboRate => "comboRate",
            Self::CritDamage => "critDamage",
            Self::PenetrateDamage => "penetrateDamage",
            Self::BlockEfficiency => "blockEfficiency",
            Self::DamageCoefficient => "damageCoefficient",
            Self::DamageTakenCoefficient => "damageTakenCoefficient",
            Self::HealCoefficient => "healCoefficient",
        }
    }
}

/// Clamp a raw value into the legal range for `stat`.
pub fn clamp_stat(stat: StatName, raw: f64) -> f64 {
    if stat.is_percentage_bounded() {
        raw.clamp(0.0, 100.0)
    } else {
        raw.max(0.0)
    }
}

impl StatSet {
    pub fn get(&self, stat: StatName) -> f64 {
        match stat {
            StatName::MaxHp => self.max_hp,
            StatName::CurrentHp => self.current_hp,
            StatName::Attack => self.attack,
            StatName::Defense => self.defense,
            StatName::FourDimensions => self.four_dimensions,
            StatName::Speed => self.speed,
            StatName::Toughness => self.toughness,
            StatName::CritRate => self.crit_rate,
            StatName::PenetrateRate => self.penetrate_rate,
            StatName::DodgeRate => self.dodge_rate,
            StatName::BlockRate => self.block_rate,
            StatName::ComboRate => self.combo_rate,
            StatName::CritDamage => self.crit_damage,
            StatName::PenetrateDamage => self.penetrate_damage,
            StatName::BlockEfficiency => self.block_efficiency,
            StatName::DamageCoefficient => self.damage_coefficient,
            StatName::DamageTakenCoefficient => self.damage_taken_coefficient,
            StatName::HealCoefficient => self.heal_coefficient,
        }
    }

    /// Clamps `value` into range for `stat` before assignment.
    pub fn set(&mut self, stat: StatName, value: f64) {
        let value = clamp_stat(stat, value);
        match stat {
            StatName::MaxHp => self.max_hp = value,
            StatName::CurrentHp => self.current_hp = value,
            StatName::Attack => self.attack = value,
            StatName::Defense => self.defense = value,
            StatName::FourDimensions => self.four_dimensions = value,
            StatName::Speed => self.speed = value,
            StatName::Toughness => self.toughness = value,
            StatName::CritRate => self.crit_rate = value,
            StatName::PenetrateRate => self.penetrate_rate = value,
            StatName::DodgeRate => self.dodge_rate = value,
            StatName::BlockRate => self.block_rate = value,
            StatName::ComboRate => self.combo_rate = value,
            StatName::CritDamage => self.crit_damage = value,
            StatName::PenetrateDamage => self.penetrate_damage = value,
            StatName::BlockEfficiency => self.block_efficiency = value,
            StatName::DamageCoefficient => self.damage_coefficient = value,
            StatName::DamageTakenCoefficient => self.damage_taken_coefficient = value,
            StatName::HealCoefficient => self.heal_coefficient = value,
        }
        if matches!(stat, StatName::MaxHp | StatName::CurrentHp) {
            self.cap_current_hp();
        }
    }

    /// Re-establishes `current_hp <= max_hp` after any HP-adjacent mutation.
    pub fn cap_current_hp(&mut self) {
        self.current_hp = self.current_hp.clamp(0.0, self.max_hp);
    }

    /// Clamps every field in place. Used when ingesting configured values.
    pub fn clamp_all(&mut self) {
        for stat in ALL_STATS {
            self.set(stat, self.get(stat));
        }
    }

    /// Remaining HP as a percentage of max. A zero-`max_hp` sheet reads as
    /// 0%, never NaN.
    pub fn hp_percent(&self) -> f64 {
        if self.max_hp > 0.0 {
            self.current_hp / self.max_hp * 100.0
        } else {
            0.0
        }
    }
}

pub const ALL_STATS: [StatName; 18] = [
    StatName::MaxHp,
    StatName::CurrentHp,
    StatName::Attack,
    StatName::Defense,
    StatName::FourDimensions,
    StatName::Speed,
    StatName::Toughness,
    StatName::CritRate,
    StatName::PenetrateRate,
    StatName::DodgeRate,
    StatName::BlockRate,
    StatName::ComboRate,
    StatName::CritDamage,
    StatName::PenetrateDamage,
    StatName::BlockEfficiency,
    StatName::DamageCoefficient,
    StatName::DamageTakenCoefficient,
    StatName::HealCoefficient,
];

/// One fighter: display name, configured base sheet, derived effective sheet,
/// and the card ledger that separates the two.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub name: String,
    base: StatSet,
    effective: StatSet,
    pub ledger: EffectLedger,
}

impl Combatant {
    pub fn new(name: impl Into<String>, mut base: StatSet) -> Self {
        base.clamp_all();
        Self {
            name: name.into(),
            base,
            effective: base,
            ledger: EffectLedger::default(),
        }
    }

    pub fn base(&self) -> &StatSet {
        &self.base
    }

    pub fn effective(&self) -> &StatSet {
        &self.effective
    }

    pub fn effective_mut(&mut self) -> &mut StatSet {
        &mut self.effective
    }

    /// Clamp and overwrite configured base values. Does not touch the
    /// effective sheet; callers recompute it from the ledger afterwards.
    pub fn update_base(&mut self, mut stats: StatSet) {
        stats.clamp_all();
        self.base = stats;
    }

    /// Discard all derived state: effective becomes a copy of base.
    pub fn reset_to_base(&mut self) {
        self.effective = self.base;
    }

    /// Start-of-battle HP fill on the effective sheet.
    pub fn restore_full_hp(&mut self) {
        self.effective.current_hp = self.effective.max_hp;
    }

    /// Apply `damage` to effective HP, floored at 0. Returns the damage taken.
    pub fn take_damage(&mut self, damage: f64) -> f64 {
        self.effective.current_hp = (self.effective.current_hp - damage).max(0.0);
        damage
    }

    pub fn is_defeated(&self) -> bool {
        self.effective.current_hp <= 0.0
    }

    pub fn hp_percent(&self) -> f64 {
        self.effective.hp_percent()
    }
}
