//! Batch simulation: N independent battles between the same pair, run
//! back-to-back with no delay, aggregated into win/damage/HP statistics.
//!
//! Battles never run concurrently; cooperation with the host is explicit
//! chunking via [BatchRun::run_chunk], so a long batch yields control every
//! `chunk_size` battles instead of blocking indefinitely.

use serde::Serialize;

use crate::combat::battle::{Battle, BattleReport, Slot};
use crate::combat::rng::RollSource;

/// Default number of battles per cooperative chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub runs: usize,
    pub chunk_size: usize,
}

impl BatchConfig {
    pub fn new(runs: usize) -> Self {
        Self {
            runs,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// How often progress milestones are logged, scaled to the batch size.
    pub fn progress_interval(&self) -> usize {
        match self.runs {
            0..=100 => 10,
            101..=500 => 50,
            501..=1000 => 100,
            1001..=5000 => 500,
            _ => 1000,
        }
    }
}

/// One completed battle inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRecord {
    pub winner: Option<Slot>,
    pub turns: u32,
    pub hp_percent: [f64; 2],
    pub damage_dealt: [f64; 2],
}

impl From<BattleReport> for BattleRecord {
    fn from(report: BattleReport) -> Self {
        Self {
            winner: report.winner,
            turns: report.turns,
            hp_percent: report.hp_percent,
            damage_dealt: report.damage_dealt,
        }
    }
}

/// Aggregate statistics over a whole batch. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub wins_a: usize,
    pub wins_b: usize,
    pub draws: usize,
    pub win_rate_a: f64,
    pub win_rate_b: f64,
    pub draw_rate: f64,
    pub avg_turns: f64,
    /// Mean remaining HP percentage across the battles each side won; 0 when
    /// that side never won.
    pub avg_winning_hp_a: f64,
    pub avg_winning_hp_b: f64,
    pub avg_damage_a: f64,
    pub avg_damage_b: f64,
}

impl BatchSummary {
    fn from_records(records: &[BattleRecord]) -> Self {
        let total = records.len();
        let mut wins_a = 0usize;
        let mut wins_b = 0usize;
        let mut draws = 0usize;
        let mut turns_sum = 0u64;
        let mut winning_hp_a = 0.0;
        let mut winning_hp_b = 0.0;
        let mut damage_a = 0.0;
        let mut damage_b = 0.0;

        for record in records {
            turns_sum += u64::from(record.turns);
            damage_a += record.damage_dealt[Slot::A.index()];
            damage_b += record.damage_dealt[Slot::B.index()];
            match record.winner {
                Some(Slot::A) => {
                    wins_a += 1;
                    winning_hp_a += record.hp_percent[Slot::A.index()];
                }
                Some(Slot::B) => {
                    wins_b += 1;
                    winning_hp_b += record.hp_percent[Slot::B.index()];
                }
                None => draws += 1,
            }
        }

        let percent_of = |count: usize| {
            if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            }
        };
        let mean_or_zero = |sum: f64, count: usize| if count > 0 { sum / count as f64 } else { 0.0 };

        Self {
            total,
            wins_a,
            wins_b,
            draws,
            win_rate_a: percent_of(wins_a),
            win_rate_b: percent_of(wins_b),
            draw_rate: percent_of(draws),
            avg_turns: mean_or_zero(turns_sum as f64, total),
            avg_winning_hp_a: mean_or_zero(winning_hp_a, wins_a),
            avg_winning_hp_b: mean_or_zero(winning_hp_b, wins_b),
            avg_damage_a: mean_or_zero(damage_a, total),
            avg_damage_b: mean_or_zero(damage_b, total),
        }
    }
}

/// Stepper over a batch. Each [run_chunk](BatchRun::run_chunk) call plays up
/// to `chunk_size` battles and returns; the host interleaves its own work
/// between calls. Ledgers are preserved across the in-batch resets and the
/// tie-break record carries across the whole batch.
pub struct BatchRun<'a> {
    battle: &'a mut Battle,
    config: BatchConfig,
    records: Vec<BattleRecord>,
}

impl<'a> BatchRun<'a> {
    pub fn new(battle: &'a mut Battle, config: BatchConfig) -> Self {
        battle.set_batch_mode(true);
        battle
            .log
            .milestone(format!("Running {} battles...", config.runs));
        Self {
            battle,
            config,
            records: Vec::with_capacity(config.runs),
        }
    }

    pub fn completed(&self) -> usize {
        self.records.len()
    }

    pub fn is_done(&self) -> bool {
        self.records.len() >= self.config.runs
    }

    pub fn records(&self) -> &[BattleRecord] {
        &self.records
    }

    /// Play up to `chunk_size` battles. Returns true while more remain.
    pub fn run_chunk(&mut self, rng: &mut dyn RollSource) -> bool {
        let end = (self.records.len() + self.config.chunk_size).min(self.config.runs);
        let interval = self.config.progress_interval();

        while self.records.len() < end {
            self.battle.reset(true);
            let report = self.battle.run(rng);
            self.records.push(report.into());

            let completed = self.records.len();
            if completed % interval == 0 || completed == self.config.runs {
                let so_far = BatchSummary::from_records(&self.records);
                let line = format!(
                    "after {completed}: {} {:.1}% | {} {:.1}%",
                    self.battle.combatant(Slot::A).name,
                    so_far.win_rate_a,
                    self.battle.combatant(Slot::B).name,
                    so_far.win_rate_b,
                );
                self.battle.log.milestone(line);
            }
        }
        !self.is_done()
    }

    /// Aggregate, log the final statistics block, and release the battle.
    pub fn finish(self) -> BatchSummary {
        let summary = BatchSummary::from_records(&self.records);
        let name_a = self.battle.combatant(Slot::A).name.clone();
        let name_b = self.battle.combatant(Slot::B).name.clone();
        let log = &mut self.battle.log;
        log.milestone("Battle statistics:".to_string());
        log.milestone(format!("total battles: {}", summary.total));
        log.milestone(format!(
            "{name_a} wins: {} ({:.2}%)",
            summary.wins_a, summary.win_rate_a
        ));
        log.milestone(format!(
            "{name_b} wins: {} ({:.2}%)",
            summary.wins_b, summary.win_rate_b
        ));
        log.milestone(format!(
            "draws: {} ({:.2}%)",
            summary.draws, summary.draw_rate
        ));
        log.milestone(format!("average turns: {:.1}", summary.avg_turns));
        log.milestone(format!(
            "average winning HP: {name_a} {:.1}% | {name_b} {:.1}%",
            summary.avg_winning_hp_a, summary.avg_winning_hp_b
        ));
        log.milestone(format!(
            "average damage: {name_a} {:.0} | {name_b} {:.0}",
            summary.avg_damage_a, summary.avg_damage_b
        ));
        self.battle.set_batch_mode(false);
        summary
    }
}

/// Run a whole batch to completion in one call.
pub fn run_batch(battle: &mut Battle, runs: usize, rng: &mut dyn RollSource) -> BatchSummary {
    run_batch_with(battle, BatchConfig::new(runs), rng)
}

pub fn run_batch_with(
    battle: &mut Battle,
    config: BatchConfig,
    rng: &mut dyn RollSource,
) -> BatchSummary {
    let mut run = BatchRun::new(battle, config);
    while run.run_chunk(rng) {}
    run.finish()
}
