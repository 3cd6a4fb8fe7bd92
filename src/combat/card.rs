//! Card buff engine: definitions, stacked instances, the per-combatant
//! effect ledger, and the deterministic effective-stat recompute.
//!
//! Effective stats are never adjusted incrementally. Any ledger change resets
//! both sheets to base and replays every contribution, summing raw values per
//! stat before a single clamp, so repeated add/remove cycles cannot drift.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::stats::{Combatant, StatName, StatSet};

/// Combat phase at which a card's effect is evaluated. The scheduler fires
/// the start/attack/defense/outcome phases; the remaining variants are legal
/// catalog values that only contribute through the passive recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerType {
    Passive,
    OnBattleStart,
    OnTurnStart,
    OnAttack,
    OnTakeDamage,
    OnHeal,
    OnKill,
    OnDefense,
    OnDodge,
    OnBlock,
    OnPenetrate,
    OnCombo,
    OnLowHp,
    OnHighHp,
    OnDeath,
    OnCrit,
}

impl TriggerType {
    /// Numeric code from the card data format.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Passive),
            2 => Some(Self::OnBattleStart),
            3 => Some(Self::OnTurnStart),
            4 => Some(Self::OnAttack),
            5 => Some(Self::OnTakeDamage),
            6 => Some(Self::OnHeal),
            7 => Some(Self::OnKill),
            8 => Some(Self::OnDefense),
            9 => Some(Self::OnDodge),
            10 => Some(Self::OnBlock),
            11 => Some(Self::OnPenetrate),
            12 => Some(Self::OnCombo),
            13 => Some(Self::OnLowHp),
            14 => Some(Self::OnHighHp),
            15 => Some(Self::OnDeath),
            16 => Some(Self::OnCrit),
            _ => None,
        }
    }
}

/// Formula used to turn a card's magnitude into a stat contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Flat,
    SpeedDifference,
    StackCount,
    TargetCurrentHpPercent,
    TargetLostHpPercent,
    SelfMaxHpPercent,
    SelfAttackPercent,
}

impl ValueType {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Flat),
            2 => Some(Self::SpeedDifference),
            3 => Some(Self::StackCount),
            4 => Some(Self::TargetCurrentHpPercent),
            5 => Some(Self::TargetLostHpPercent),
            6 => Some(Self::SelfMaxHpPercent),
            7 => Some(Self::SelfAttackPercent),
            _ => None,
        }
    }
}

/// Which combatant receives the contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    SelfSide,
    Enemy,
}

impl TargetType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "self" => Some(Self::SelfSide),
            "enemy" => Some(Self::Enemy),
            _ => None,
        }
    }
}

/// Stat addressed by a buff, in the card data's code space. Two codes (final
/// damage and final damage taken) have no backing stat; applying them is a
/// logged no-op rather than an engine fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuffStat {
    Attack,
    Defense,
    Hp,
    Speed,
    DamageCoefficient,
    CritRate,
    PenetrateRate,
    BlockRate,
    DodgeRate,
    ComboRate,
    Toughness,
    CritDamage,
    PenetrateDamage,
    FinalDamage,
    FinalDamageTaken,
    MaxHp,
    CurrentHp,
    HealCoefficient,
    BlockEfficiency,
}

impl BuffStat {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Attack),
            2 => Some(Self::Defense),
            3 => Some(Self::Hp),
            4 => Some(Self::Speed),
            5 => Some(Self::DamageCoefficient),
            6 => Some(Self::CritRate),
            7 => Some(Self::PenetrateRate),
            8 => Some(Self::BlockRate),
            9 => Some(Self::DodgeRate),
            10 => Some(Self::ComboRate),
            11 => Some(Self::Toughness),
            12 => Some(Self::CritDamage),
            13 => Some(Self::PenetrateDamage),
            14 => Some(Self::FinalDamage),
            15 => Some(Self::FinalDamageTaken),
            16 => Some(Self::MaxHp),
            17 => Some(Self::CurrentHp),
            18 => Some(Self::HealCoefficient),
            19 => Some(Self::BlockEfficiency),
            _ => None,
        }
    }

    /// The stat this buff writes, if one exists. The legacy HP buff writes
    /// through to current HP.
    pub const fn stat(self) -> Option<StatName> {
        match self {
            Self::Attack => Some(StatName::Attack),
            Self::Defense => Some(StatName::Defense),
            Self::Hp | Self::CurrentHp => Some(StatName::CurrentHp),
            Self::Speed => Some(StatName::Speed),
            Self::DamageCoefficient => Some(StatName::DamageCoefficient),
            Self::CritRate => Some(StatName::CritRate),
            Self::PenetrateRate => Some(StatName::PenetrateRate),
            Self::BlockRate => Some(StatName::BlockRate),
            Self::DodgeRate => Some(StatName::DodgeRate),
            Self::ComboRate => Some(StatName::ComboRate),
            Self::Toughness => Some(StatName::Toughness),
            Self::CritDamage => Some(StatName::CritDamage),
            Self::PenetrateDamage => Some(StatName::PenetrateDamage),
            Self::MaxHp => Some(StatName::MaxHp),
            Self::HealCoefficient => Some(StatName::HealCoefficient),
            Self::BlockEfficiency => Some(StatName::BlockEfficiency),
            Self::FinalDamage | Self::FinalDamageTaken => None,
        }
    }
}

/// Static description of one buff card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDefinition {
    pub id: String,
    pub buff_stat: BuffStat,
    pub trigger: TriggerType,
    pub value: ValueType,
    pub target: TargetType,
    pub magnitude: f64,
    pub description: String,
    /// Narrative line for the log; `{player}` is replaced with the acting
    /// combatant's name.
    pub report_template: String,
}

impl CardDefinition {
    pub fn report_line(&self, player_name: &str) -> String {
        self.report_template.replace("{player}", player_name)
    }
}

/// A definition stacked onto one combatant.
#[derive(Debug, Clone, PartialEq)]
pub struct CardInstance {
    pub definition: CardDefinition,
    pub stacks: u32,
}

/// Ordered collection of a combatant's active card instances. Adding a card
/// already present raises its stack count instead of duplicating the entry.
#[derive(Debug, Clone, Default)]
pub struct EffectLedger {
    instances: Vec<CardInstance>,
}

impl EffectLedger {
    pub fn add(&mut self, definition: CardDefinition) {
        if let Some(existing) = self
            .instances
            .iter_mut()
            .find(|instance| instance.definition.id == definition.id)
        {
            existing.stacks += 1;
        } else {
            self.instances.push(CardInstance {
                definition,
                stacks: 1,
            });
        }
    }

    /// Drop one whole instance (all stacks). Returns false when the id is
    /// not on the ledger.
    pub fn remove(&mut self, definition_id: &str) -> bool {
        let before = self.instances.len();
        self.instances
            .retain(|instance| instance.definition.id != definition_id);
        self.instances.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardInstance> {
        self.instances.iter()
    }

    pub fn stacks_of(&self, definition_id: &str) -> u32 {
        self.instances
            .iter()
            .find(|instance| instance.definition.id == definition_id)
            .map_or(0, |instance| instance.stacks)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

/// Evaluate a card's contribution for the acting side against `opponent`.
pub fn resolve_value(
    value: ValueType,
    magnitude: f64,
    own: &StatSet,
    opponent: &StatSet,
    stacks: u32,
) -> f64 {
    let stacks = stacks as f64;
    match value {
        ValueType::Flat | ValueType::StackCount => magnitude * stacks,
        ValueType::SpeedDifference => (own.speed - opponent.speed).max(0.0) * magnitude * stacks,
        ValueType::TargetCurrentHpPercent => {
            if opponent.max_hp > 0.0 {
                opponent.current_hp / opponent.max_hp * 100.0 * magnitude * stacks
            } else {
                0.0
            }
        }
        ValueType::TargetLostHpPercent => {
            if opponent.max_hp > 0.0 {
                (opponent.max_hp - opponent.current_hp) / opponent.max_hp * 100.0 * magnitude * stacks
            } else {
                0.0
            }
        }
        ValueType::SelfMaxHpPercent => own.max_hp / 100.0 * magnitude * stacks,
        ValueType::SelfAttackPercent => own.attack / 100.0 * magnitude * stacks,
    }
}

/// Raw per-stat contribution sums for one sheet. Summing first and clamping
/// once keeps the recompute order-independent.
#[derive(Debug, Clone, Default)]
pub struct ContributionSet {
    sums: BTreeMap<StatName, f64>,
}

impl ContributionSet {
    pub fn add(&mut self, stat: StatName, value: f64) {
        *self.sums.entry(stat).or_insert(0.0) += value;
    }

    pub fn total_for(&self, stat: StatName) -> f64 {
        self.sums.get(&stat).copied().unwrap_or(0.0)
    }

    /// Fold the sums into `stats`, one clamp per touched stat.
    pub fn apply_to(&self, stats: &mut StatSet) {
        for (&stat, &sum) in &self.sums {
            stats.set(stat, stats.get(stat) + sum);
        }
        stats.cap_current_hp();
    }
}

/// Wholesale recompute of both effective sheets from base plus both ledgers.
/// Enemy-targeted cards cross over, so the recompute is pair-level. Value
/// formulas read the freshly reset base snapshots of both sides.
pub fn recompute_effective(a: &mut Combatant, b: &mut Combatant) {
    a.reset_to_base();
    b.reset_to_base();

    let snapshot_a = *a.effective();
    let snapshot_b = *b.effective();
    let mut sums_a = ContributionSet::default();
    let mut sums_b = ContributionSet::default();

    collect_ledger(&a.ledger, &snapshot_a, &snapshot_b, &mut sums_a, &mut sums_b);
    collect_ledger(&b.ledger, &snapshot_b, &snapshot_a, &mut sums_b, &mut sums_a);

    sums_a.apply_to(a.effective_mut());
    sums_b.apply_to(b.effective_mut());
}

fn collect_ledger(
    ledger: &EffectLedger,
    own: &StatSet,
    opponent: &StatSet,
    own_sums: &mut ContributionSet,
    opponent_sums: &mut ContributionSet,
) {
    for instance in ledger.iter() {
        let definition = &instance.definition;
        let Some(stat) = definition.buff_stat.stat() else {
            continue;
        };
        let value = resolve_value(definition.value, definition.magnitude, own, opponent, instance.stacks);
        match definition.target {
            TargetType::SelfSide => own_sums.add(stat, value),
            TargetType::Enemy => opponent_sums.add(stat, value),
        }
    }
}

/// Apply every ledger instance of `owner` whose trigger matches, mutating
/// effective stats of the targeted side immediately (these in-battle bonuses
/// last until the next recompute). Returns the narrative lines produced.
pub fn apply_for_trigger(
    owner: &mut Combatant,
    opponent: &mut Combatant,
    trigger: TriggerType,
) -> Vec<String> {
    let mut lines = Vec::new();
    // Snapshot the instance list so value formulas observe stats as mutated
    // by earlier instances, matching single-pass application order.
    let instances: Vec<CardInstance> = owner.ledger.iter().cloned().collect();
    for instance in instances {
        let definition = &instance.definition;
        if definition.trigger != trigger {
            continue;
        }
        let Some(stat) = definition.buff_stat.stat() else {
            lines.push(format!(
                "{}: effect '{}' has no backing stat, skipped",
                owner.name, definition.id
            ));
            continue;
        };
        let value = resolve_value(
            definition.value,
            definition.magnitude,
            owner.effective(),
            opponent.effective(),
            instance.stacks,
        );
        let target = match definition.target {
            TargetType::SelfSide => owner.effective_mut(),
            TargetType::Enemy => opponent.effective_mut(),
        };
        let current = target.get(stat);
        target.set(stat, current + value);
        lines.push(instance.definition.report_line(&owner.name));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(max_hp: f64, current_hp: f64, attack: f64, speed: f64) -> StatSet {
        StatSet {
            max_hp,
            current_hp,
            attack,
            speed,
            ..StatSet::default()
        }
    }

    fn flat_card(id: &str, buff_stat: BuffStat, magnitude: f64) -> CardDefinition {
        CardDefinition {
            id: id.to_string(),
            buff_stat,
            trigger: TriggerType::Passive,
            value: ValueType::Flat,
            target: TargetType::SelfSide,
            magnitude,
            description: String::from("test card"),
            report_template: String::from("{player} gains a bonus"),
        }
    }

    #[test]
    fn value_formulas_match_definitions() {
        let own = sheet(1000.0, 1000.0, 400.0, 30.0);
        let opponent = sheet(2000.0, 500.0, 100.0, 10.0);

        assert_eq!(resolve_value(ValueType::Flat, 5.0, &own, &opponent, 3), 15.0);
        assert_eq!(
            resolve_value(ValueType::SpeedDifference, 2.0, &own, &opponent, 1),
            40.0
        );
        assert_eq!(
            resolve_value(ValueType::StackCount, 4.0, &own, &opponent, 2),
            8.0
        );
        assert_eq!(
            resolve_value(ValueType::TargetCurrentHpPercent, 1.0, &own, &opponent, 1),
            25.0
        );
        assert_eq!(
            resolve_value(ValueType::TargetLostHpPercent, 1.0, &own, &opponent, 1),
            75.0
        );
        assert_eq!(
            resolve_value(ValueType::SelfMaxHpPercent, 2.0, &own, &opponent, 1),
            20.0
        );
        assert_eq!(
            resolve_value(ValueType::SelfAttackPercent, 10.0, &own, &opponent, 1),
            40.0
        );
    }

    #[test]
    fn speed_difference_floors_negative_gaps() {
        let slow = sheet(100.0, 100.0, 0.0, 5.0);
        let fast = sheet(100.0, 100.0, 0.0, 50.0);
        assert_eq!(resolve_value(ValueType::SpeedDifference, 3.0, &slow, &fast, 1), 0.0);
    }

    #[test]
    fn ledger_collapses_duplicate_definitions() {
        let mut ledger = EffectLedger::default();
        ledger.add(flat_card("atk_up", BuffStat::Attack, 10.0));
        ledger.add(flat_card("atk_up", BuffStat::Attack, 10.0));
        ledger.add(flat_card("def_up", BuffStat::Defense, 5.0));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.stacks_of("atk_up"), 2);
        assert_eq!(ledger.stacks_of("def_up"), 1);
    }

    #[test]
    fn recompute_applies_stacked_flat_contributions() {
        let mut a = Combatant::new("A", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut b = Combatant::new("B", sheet(1000.0, 1000.0, 100.0, 10.0));
        a.ledger.add(flat_card("atk_up", BuffStat::Attack, 25.0));
        a.ledger.add(flat_card("atk_up", BuffStat::Attack, 25.0));

        recompute_effective(&mut a, &mut b);
        assert_eq!(a.effective().attack, 150.0);
        assert_eq!(b.effective().attack, 100.0);
    }

    #[test]
    fn enemy_targeted_cards_land_on_the_other_sheet() {
        let mut a = Combatant::new("A", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut b = Combatant::new("B", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut debuff = flat_card("atk_down", BuffStat::Attack, -40.0);
        debuff.target = TargetType::Enemy;
        a.ledger.add(debuff);

        recompute_effective(&mut a, &mut b);
        assert_eq!(a.effective().attack, 100.0);
        assert_eq!(b.effective().attack, 60.0);
    }

    #[test]
    fn remove_and_readd_leaves_no_drift() {
        let mut a = Combatant::new("A", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut b = Combatant::new("B", sheet(1000.0, 1000.0, 100.0, 10.0));
        a.ledger.add(flat_card("crit_up", BuffStat::CritRate, 7.5));
        recompute_effective(&mut a, &mut b);
        let once = a.effective().crit_rate;

        for _ in 0..10 {
            assert!(a.ledger.remove("crit_up"));
            recompute_effective(&mut a, &mut b);
            assert_eq!(a.effective().crit_rate, a.base().crit_rate);
            a.ledger.add(flat_card("crit_up", BuffStat::CritRate, 7.5));
            recompute_effective(&mut a, &mut b);
        }
        assert_eq!(a.effective().crit_rate, once);
    }

    #[test]
    fn recompute_sums_before_clamping() {
        // +80 and +80 crit rate should clamp once at 100, not at 100 twice
        // with a later -60 pulling from a pre-clamped total.
        let mut a = Combatant::new("A", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut b = Combatant::new("B", sheet(1000.0, 1000.0, 100.0, 10.0));
        a.ledger.add(flat_card("up_a", BuffStat::CritRate, 80.0));
        a.ledger.add(flat_card("up_b", BuffStat::CritRate, 80.0));
        a.ledger.add(flat_card("down", BuffStat::CritRate, -70.0));

        recompute_effective(&mut a, &mut b);
        assert_eq!(a.effective().crit_rate, 90.0);
    }

    #[test]
    fn missing_backing_stat_is_a_skipped_no_op() {
        let mut a = Combatant::new("A", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut b = Combatant::new("B", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut card = flat_card("final_dmg", BuffStat::FinalDamage, 50.0);
        card.trigger = TriggerType::OnAttack;
        a.ledger.add(card);

        recompute_effective(&mut a, &mut b);
        assert_eq!(*a.effective(), *a.base());

        let lines = apply_for_trigger(&mut a, &mut b, TriggerType::OnAttack);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("skipped"));
        assert_eq!(*a.effective(), *a.base());
    }

    #[test]
    fn trigger_application_only_fires_matching_instances() {
        let mut a = Combatant::new("A", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut b = Combatant::new("B", sheet(1000.0, 1000.0, 100.0, 10.0));
        let mut on_attack = flat_card("rage", BuffStat::Attack, 30.0);
        on_attack.trigger = TriggerType::OnAttack;
        on_attack.report_template = String::from("{player} is enraged");
        a.ledger.add(on_attack);
        a.ledger.add(flat_card("passive", BuffStat::Defense, 10.0));

        // The recompute counts every ledger entry; trigger firing stacks the
        // matching card's bonus on top of that.
        recompute_effective(&mut a, &mut b);
        assert_eq!(a.effective().attack, 130.0);

        let lines = apply_for_trigger(&mut a, &mut b, TriggerType::OnAttack);
        assert_eq!(lines, vec![String::from("A is enraged")]);
        assert_eq!(a.effective().attack, 160.0);
        assert_eq!(a.effective().defense, 10.0);
    }

    #[test]
    fn code_tables_cover_known_ranges_only() {
        assert_eq!(TriggerType::from_code(16), Some(TriggerType::OnCrit));
        assert_eq!(TriggerType::from_code(0), None);
        assert_eq!(TriggerType::from_code(17), None);
        assert_eq!(ValueType::from_code(7), Some(ValueType::SelfAttackPercent));
        assert_eq!(ValueType::from_code(8), None);
        assert_eq!(BuffStat::from_code(19), Some(BuffStat::BlockEfficiency));
        assert_eq!(BuffStat::from_code(20), None);
        assert_eq!(TargetType::from_label("Enemy"), Some(TargetType::Enemy));
        assert_eq!(TargetType::from_label("all"), None);
    }
}
