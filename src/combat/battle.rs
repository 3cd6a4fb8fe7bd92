//! Turn scheduler: alternating attacks between two slots, combo turn-skips,
//! tie-break alternation, victory/turn-limit detection, and the battle log.
//!
//! Interactive hosts drive one turn at a time via [Battle::step_turn] on
//! their own timer; cancellation is simply not calling again. Batch runs use
//! [Battle::run], which loops turns with no delay.

use serde::Serialize;

use crate::combat::card::{apply_for_trigger, recompute_effective, CardDefinition, TriggerType};
use crate::combat::resolver::{damage_reduction, resolve_attack, AttackEffect};
use crate::combat::rng::RollSource;
use crate::combat::stats::Combatant;

/// Combatant position. A tagged slot, never pointer identity, so skip flags
/// and tie-break records survive resets and clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub const fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BattleState {
    Idle,
    InProgress,
    Ended,
}

/// How much narration the battle keeps. Batch runs drop per-attack lines and
/// keep only milestones (start, progress, final statistics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Off,
    Milestones,
    Full,
}

/// Ordered narrative lines emitted by the engine. The host decides
/// presentation; the engine only filters by mode.
#[derive(Debug, Clone)]
pub struct BattleLog {
    mode: LogMode,
    lines: Vec<String>,
}

impl BattleLog {
    pub fn new(mode: LogMode) -> Self {
        Self {
            mode,
            lines: Vec::new(),
        }
    }

    pub fn set_mode(&mut self, mode: LogMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> LogMode {
        self.mode
    }

    /// Per-attack narration; kept only in full mode.
    pub fn event(&mut self, line: impl Into<String>) {
        if self.mode == LogMode::Full {
            self.lines.push(line.into());
        }
    }

    /// Start/progress/summary narration; kept unless logging is off.
    pub fn milestone(&mut self, line: impl Into<String>) {
        if self.mode != LogMode::Off {
            self.lines.push(line.into());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Result of one completed battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleReport {
    pub winner: Option<Slot>,
    pub turns: u32,
    pub by_turn_limit: bool,
    pub hp_percent: [f64; 2],
    pub damage_dealt: [f64; 2],
}

struct AttackStep {
    defeated: bool,
    combo: bool,
}

/// The battle state machine over two owned combatants.
#[derive(Debug)]
pub struct Battle {
    combatants: [Combatant; 2],
    state: BattleState,
    current_turn: u32,
    max_turns: u32,
    skip_next_turn: Option<Slot>,
    last_first_attacker: Option<Slot>,
    show_damage_reduction: bool,
    damage_dealt: [f64; 2],
    winner: Option<Slot>,
    ended_by_turn_limit: bool,
    batch_mode: bool,
    pub log: BattleLog,
}

impl Battle {
    pub fn new(a: Combatant, b: Combatant) -> Self {
        Self {
            combatants: [a, b],
            state: BattleState::Idle,
            current_turn: 0,
            max_turns: 0,
            skip_next_turn: None,
            last_first_attacker: None,
            show_damage_reduction: false,
            damage_dealt: [0.0, 0.0],
            winner: None,
            ended_by_turn_limit: false,
            batch_mode: false,
            log: BattleLog::new(LogMode::Full),
        }
    }

    pub fn combatant(&self, slot: Slot) -> &Combatant {
        &self.combatants[slot.index()]
    }

    pub fn combatant_mut(&mut self, slot: Slot) -> &mut Combatant {
        &mut self.combatants[slot.index()]
    }

    pub fn state(&self) -> BattleState {
        self.state
    }

    pub fn current_turn(&self) -> u32 {
        self.current_turn
    }

    /// 0 disables the limit.
    pub fn set_max_turns(&mut self, max_turns: u32) {
        self.max_turns = max_turns;
    }

    pub fn set_show_damage_reduction(&mut self, show: bool) {
        self.show_damage_reduction = show;
    }

    pub fn winner(&self) -> Option<Slot> {
        self.winner
    }

    pub fn ended_by_turn_limit(&self) -> bool {
        self.ended_by_turn_limit
    }

    pub fn damage_dealt(&self, slot: Slot) -> f64 {
        self.damage_dealt[slot.index()]
    }

    pub fn last_first_attacker(&self) -> Option<Slot> {
        self.last_first_attacker
    }

    pub(crate) fn set_batch_mode(&mut self, batch: bool) {
        self.batch_mode = batch;
    }

    /// Stack a card onto a slot's ledger and recompute both effective sheets.
    pub fn add_card(&mut self, slot: Slot, definition: CardDefinition) {
        self.combatants[slot.index()].ledger.add(definition);
        self.recompute();
    }

    /// Remove a card (all stacks) from a slot's ledger. The affected stats
    /// fall back to base plus the remaining ledger, never a subtraction.
    pub fn remove_card(&mut self, slot: Slot, definition_id: &str) -> bool {
        let removed = self.combatants[slot.index()].ledger.remove(definition_id);
        if removed {
            self.recompute();
        }
        removed
    }

    fn recompute(&mut self) {
        let [a, b] = &mut self.combatants;
        recompute_effective(a, b);
    }

    /// Transition Idle (or Ended) into a fresh in-progress battle: effective
    /// sheets rebuilt from base plus ledgers, full HP, battle-start triggers
    /// for both sides in slot order.
    pub fn start(&mut self) {
        self.current_turn = 0;
        self.skip_next_turn = None;
        self.damage_dealt = [0.0, 0.0];
        self.winner = None;
        self.ended_by_turn_limit = false;

        self.recompute();
        for combatant in &mut self.combatants {
            combatant.restore_full_hp();
        }

        self.state = BattleState::InProgress;
        let start_line = format!(
            "Battle begins: {} vs {}",
            self.combatants[0].name, self.combatants[1].name
        );
        self.log.event(start_line);

        self.fire_trigger(Slot::A, TriggerType::OnBattleStart);
        self.fire_trigger(Slot::B, TriggerType::OnBattleStart);
    }

    /// Return to Idle. Keeps base stats, keeps ledgers, recomputes effective
    /// sheets with full HP. The tie-break record survives only inside a
    /// batch, where alternation across battles is the point.
    pub fn reset(&mut self, keep_log: bool) {
        self.state = BattleState::Idle;
        self.current_turn = 0;
        self.skip_next_turn = None;
        self.damage_dealt = [0.0, 0.0];
        self.winner = None;
        self.ended_by_turn_limit = false;
        if !self.batch_mode {
            self.last_first_attacker = None;
        }
        if !keep_log {
            self.log.clear();
        }
        self.recompute();
        for combatant in &mut self.combatants {
            combatant.restore_full_hp();
        }
    }

    /// Pick this turn's first attacker: strictly higher speed wins; an exact
    /// tie alternates against the recorded previous choice, defaulting to A.
    fn choose_first_attacker(&mut self) -> Slot {
        let speed_a = self.combatants[0].effective().speed;
        let speed_b = self.combatants[1].effective().speed;
        let first = if speed_a > speed_b {
            Slot::A
        } else if speed_b > speed_a {
            Slot::B
        } else if self.last_first_attacker == Some(Slot::A) {
            Slot::B
        } else {
            Slot::A
        };
        self.last_first_attacker = Some(first);
        first
    }

    fn fire_trigger(&mut self, owner: Slot, trigger: TriggerType) {
        let (own, opponent) = pair_mut(&mut self.combatants, owner);
        for line in apply_for_trigger(own, opponent, trigger) {
            self.log.event(line);
        }
    }

    fn process_attack(&mut self, attacker: Slot, rng: &mut dyn RollSource) -> AttackStep {
        self.fire_trigger(attacker, TriggerType::OnAttack);
        self.fire_trigger(attacker.other(), TriggerType::OnDefense);

        let (own, opponent) = pair_mut(&mut self.combatants, attacker);
        let outcome = resolve_attack(own.effective(), opponent.effective(), false, rng);

        for (effect, trigger, on_attacker) in [
            (AttackEffect::Crit, TriggerType::OnCrit, true),
            (AttackEffect::Penetrate, TriggerType::OnPenetrate, true),
            (AttackEffect::Combo, TriggerType::OnCombo, true),
            (AttackEffect::Dodge, TriggerType::OnDodge, false),
            (AttackEffect::Block, TriggerType::OnBlock, false),
        ] {
            if outcome.has(effect) {
                let owner = if on_attacker { attacker } else { attacker.other() };
                self.fire_trigger(owner, trigger);
            }
        }

        let (_, defender) = pair_mut(&mut self.combatants, attacker);
        let dealt = defender.take_damage(outcome.damage);
        self.damage_dealt[attacker.index()] += dealt;

        let line = self.attack_line(attacker, &outcome.effects, dealt);
        self.log.event(line);
        if self.show_damage_reduction {
            let (own, opponent) = pair_mut(&mut self.combatants, attacker);
            let reduction = damage_reduction(own.effective(), opponent.effective());
            self.log.event(format!("damage reduction: {reduction:.2}%"));
        }

        AttackStep {
            defeated: self.combatants[attacker.other().index()].is_defeated(),
            combo: outcome.combo,
        }
    }

    fn attack_line(&self, attacker: Slot, effects: &[AttackEffect], damage: f64) -> String {
        let attacker_name = &self.combatant(attacker).name;
        let defender_name = &self.combatant(attacker.other()).name;
        let mut line = format!("{attacker_name} attacks {defender_name}");

        let offense: Vec<&str> = effects
            .iter()
            .filter_map(|effect| match effect {
                AttackEffect::Crit => Some("crit"),
                AttackEffect::Penetrate => Some("penetrate"),
                AttackEffect::Combo => Some("combo"),
                _ => None,
            })
            .collect();
        if !offense.is_empty() {
            line.push_str(&format!(" ({})", offense.join(", ")));
        }

        let defense: Vec<&str> = effects
            .iter()
            .filter_map(|effect| match effect {
                AttackEffect::Dodge => Some("dodge"),
                AttackEffect::Block => Some("block"),
                _ => None,
            })
            .collect();
        if !defense.is_empty() {
            line.push_str(&format!(", {defender_name} ({})", defense.join(", ")));
        }

        line.push_str(&format!(", dealing {damage:.0} damage"));
        line
    }

    /// Check the turn limit; runs after both actions of a turn and after any
    /// combo early end. Higher remaining HP percentage wins, exact tie draws.
    fn check_turn_limit(&mut self) -> bool {
        if self.max_turns == 0 || self.current_turn < self.max_turns {
            return false;
        }
        let percent_a = self.combatants[0].hp_percent();
        let percent_b = self.combatants[1].hp_percent();
        let winner = if percent_a > percent_b {
            Some(Slot::A)
        } else if percent_b > percent_a {
            Some(Slot::B)
        } else {
            None
        };
        self.end_battle(winner, true);
        true
    }

    fn end_battle(&mut self, winner: Option<Slot>, by_turn_limit: bool) {
        self.state = BattleState::Ended;
        self.winner = winner;
        self.ended_by_turn_limit = by_turn_limit;
        let line = match winner {
            None => "Battle over: draw".to_string(),
            Some(slot) if by_turn_limit => format!(
                "Turn limit reached, {} wins on remaining HP ({:.1}% vs {:.1}%)",
                self.combatant(slot).name,
                self.combatants[slot.index()].hp_percent(),
                self.combatants[slot.other().index()].hp_percent(),
            ),
            Some(slot) => format!("Battle over: {} wins", self.combatant(slot).name),
        };
        self.log.event(line);
    }

    /// Advance one full turn (both slots act or are skipped). Returns the
    /// resulting state so hosts can stop scheduling once the battle ends.
    pub fn step_turn(&mut self, rng: &mut dyn RollSource) -> BattleState {
        if self.state != BattleState::InProgress {
            return self.state;
        }

        self.current_turn += 1;
        self.log.event(format!("Turn {}", self.current_turn));
        self.fire_trigger(Slot::A, TriggerType::OnTurnStart);
        self.fire_trigger(Slot::B, TriggerType::OnTurnStart);

        let first = self.choose_first_attacker();
        for attacker in [first, first.other()] {
            if self.skip_next_turn == Some(attacker) {
                self.skip_next_turn = None;
                let line = format!("{}'s action is skipped", self.combatant(attacker).name);
                self.log.event(line);
                continue;
            }

            let step = self.process_attack(attacker, rng);
            if step.defeated {
                self.end_battle(Some(attacker), false);
                return self.state;
            }
            if step.combo {
                let combo_line = format!("{} triggers a combo!", self.combatant(attacker).name);
                let skip_line = format!(
                    "{}'s next action is skipped",
                    self.combatant(attacker.other()).name
                );
                self.log.event(combo_line);
                self.log.event(skip_line);
                self.skip_next_turn = Some(attacker.other());
                self.check_turn_limit();
                return self.state;
            }
        }

        self.check_turn_limit();
        self.state
    }

    /// Run to completion with no inter-turn delay. Starts the battle if it
    /// is not already in progress.
    pub fn run(&mut self, rng: &mut dyn RollSource) -> BattleReport {
        if self.state != BattleState::InProgress {
            self.start();
        }
        while self.state == BattleState::InProgress {
            self.step_turn(rng);
        }
        self.report()
    }

    pub fn report(&self) -> BattleReport {
        BattleReport {
            winner: self.winner,
            turns: self.current_turn,
            by_turn_limit: self.ended_by_turn_limit,
            hp_percent: [self.combatants[0].hp_percent(), self.combatants[1].hp_percent()],
            damage_dealt: self.damage_dealt,
        }
    }
}

/// Disjoint mutable access to (actor, other) without pointer identity games.
fn pair_mut(combatants: &mut [Combatant; 2], slot: Slot) -> (&mut Combatant, &mut Combatant) {
    let (left, right) = combatants.split_at_mut(1);
    match slot {
        Slot::A => (&mut left[0], &mut right[0]),
        Slot::B => (&mut right[0], &mut left[0]),
    }
}
