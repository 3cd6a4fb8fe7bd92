pub mod batch;
pub mod battle;
pub mod card;
pub mod resolver;
pub mod rng;
pub mod stats;

pub use batch::{
    run_batch, run_batch_with, BatchConfig, BatchRun, BatchSummary, BattleRecord,
    DEFAULT_CHUNK_SIZE,
};
pub use battle::{Battle, BattleLog, BattleReport, BattleState, LogMode, Slot};
pub use card::{
    apply_for_trigger, recompute_effective, resolve_value, BuffStat, CardDefinition, CardInstance,
    ContributionSet, EffectLedger, TargetType, TriggerType, ValueType,
};
pub use resolver::{
    base_damage, damage_reduction, dampened_rate, resolve_attack, AttackEffect, AttackOutcome,
    RATE_DAMPEN_CAP,
};
pub use rng::{RollSource, Rng, ScriptedRolls};
pub use stats::{clamp_stat, Combatant, StatName, StatSet, ALL_STATS};
