//! Command dispatch for the duelsim binary: run one narrated battle, run a
//! batch, or validate a card catalog. Results print as JSON by default or a
//! tab table with `--table`.

use serde::Serialize;

use crate::catalog::load_catalog;
use crate::combat::{
    run_batch, Battle, BattleReport, BatchSummary, Combatant, LogMode, Rng, Slot, StatSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Simulate,
    Batch,
    Cards,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("simulate") => Some(Command::Simulate),
        Some("batch") => Some(Command::Batch),
        Some("cards") => Some(Command::Cards),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Batch) => handle_batch(args),
        Some(Command::Cards) => handle_cards(args),
        None => {
            eprintln!("usage: duelsim <simulate|batch|cards>");
            2
        }
    }
}

/// Demo fighters for the CLI: a balanced attacker and a slightly slower,
/// bulkier defender, so single runs show varied outcomes.
fn demo_pair() -> (Combatant, Combatant) {
    let alice = Combatant::new(
        "Alice",
        StatSet {
            max_hp: 1_000_000.0,
            current_hp: 1_000_000.0,
            attack: 100_000.0,
            defense: 100_000.0,
            four_dimensions: 10_000.0,
            speed: 100.0,
            crit_rate: 15.0,
            penetrate_rate: 15.0,
            dodge_rate: 15.0,
            block_rate: 15.0,
            crit_damage: 150.0,
            penetrate_damage: 200.0,
            block_efficiency: 50.0,
            ..StatSet::default()
        },
    );
    let bob = Combatant::new(
        "Bob",
        StatSet {
            max_hp: 1_200_000.0,
            current_hp: 1_200_000.0,
            attack: 90_000.0,
            defense: 120_000.0,
            four_dimensions: 10_000.0,
            speed: 90.0,
            crit_rate: 10.0,
            penetrate_rate: 10.0,
            dodge_rate: 20.0,
            block_rate: 20.0,
            crit_damage: 150.0,
            penetrate_damage: 200.0,
            block_efficiency: 60.0,
            ..StatSet::default()
        },
    );
    (alice, bob)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateOutput {
    max_turns: u32,
    seed: u64,
    report: BattleReport,
    log: Vec<String>,
}

fn handle_simulate(args: &[String]) -> i32 {
    let max_turns = parse_u32_arg(args.get(2), "max_turns", 30);
    let seed = parse_u64_arg(args.get(3), "seed", 7);
    let as_table = args.iter().any(|arg| arg == "--table");

    let (alice, bob) = demo_pair();
    let mut battle = Battle::new(alice, bob);
    battle.set_max_turns(max_turns);
    let mut rng = Rng::new(seed);
    let report = battle.run(&mut rng);

    if as_table {
        println!("max_turns\tseed\twinner\tturns\thp_a\thp_b");
        println!(
            "{}\t{}\t{}\t{}\t{:.1}\t{:.1}",
            max_turns,
            seed,
            winner_label(&battle, report.winner),
            report.turns,
            report.hp_percent[0],
            report.hp_percent[1],
        );
        return 0;
    }

    let output = SimulateOutput {
        max_turns,
        seed,
        report,
        log: battle.log.drain(),
    };
    match serde_json::to_string_pretty(&output) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize simulation result: {err}");
            1
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchOutput {
    runs: usize,
    seed: u64,
    summary: BatchSummary,
    log: Vec<String>,
}

fn handle_batch(args: &[String]) -> i32 {
    let runs = parse_u32_arg(args.get(2), "runs", 1000) as usize;
    let seed = parse_u64_arg(args.get(3), "seed", 7);
    let as_table = args.iter().any(|arg| arg == "--table");

    let (alice, bob) = demo_pair();
    let mut battle = Battle::new(alice, bob);
    battle.set_max_turns(50);
    battle.log.set_mode(LogMode::Milestones);
    let mut rng = Rng::new(seed);
    let summary = run_batch(&mut battle, runs, &mut rng);

    if as_table {
        println!("runs\tseed\twin_rate_a\twin_rate_b\tdraw_rate\tavg_turns");
        println!(
            "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.1}",
            runs, seed, summary.win_rate_a, summary.win_rate_b, summary.draw_rate, summary.avg_turns
        );
        return 0;
    }

    let output = BatchOutput {
        runs,
        seed,
        summary,
        log: battle.log.drain(),
    };
    match serde_json::to_string_pretty(&output) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize batch result: {err}");
            1
        }
    }
}

fn handle_cards(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: duelsim cards <path-to-catalog.csv>");
        return 2;
    };

    match load_catalog(path) {
        Ok(report) => {
            println!("accepted {} card(s)", report.cards.len());
            for card in &report.cards {
                println!("- {}: {}", card.id, card.description);
            }
            if !report.is_clean() {
                eprintln!("rejected {} row(s):", report.rejected.len());
                for rejected in &report.rejected {
                    eprintln!("- row {} ({}): {}", rejected.row, rejected.id, rejected.reason);
                }
                return 1;
            }
            0
        }
        Err(err) => {
            eprintln!("catalog load failed: {err}");
            1
        }
    }
}

fn winner_label(battle: &Battle, winner: Option<Slot>) -> String {
    match winner {
        Some(slot) => battle.combatant(slot).name.clone(),
        None => "draw".to_string(),
    }
}

fn parse_u32_arg(value: Option<&String>, name: &str, default: u32) -> u32 {
    match value {
        None => default,
        Some(raw) if raw.starts_with("--") => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("invalid {name} '{raw}', defaulting to {default}");
            default
        }),
    }
}

fn parse_u64_arg(value: Option<&String>, name: &str, default: u64) -> u64 {
    match value {
        None => default,
        Some(raw) if raw.starts_with("--") => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("invalid {name} '{raw}', defaulting to {default}");
            default
        }),
    }
}
