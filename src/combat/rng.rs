//! Fast PRNG for combat simulation. Uses SplitMix64 for throughput and good statistical quality.
//! Deterministic: same seed produces the same sequence. Not cryptographically secure.
//!
//! All probability checks in the engine draw through [RollSource], so tests can
//! swap in a scripted source and force any outcome path.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// A stream of percentage rolls in `[0, 100)`. A rate check passes when the
/// roll is strictly below the rate, so a rate of 0 never triggers and a rate
/// of 100 always does.
pub trait RollSource {
    fn roll_percent(&mut self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }

    /// Uniform value in `[0, 1)` built from the top 53 bits.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl RollSource for Rng {
    #[inline]
    fn roll_percent(&mut self) -> f64 {
        self.next_f64() * 100.0
    }
}

/// Replays a fixed list of rolls, then repeats the final value. Lets tests
/// pin down exactly which checks pass in a resolution sequence.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    rolls: Vec<f64>,
    cursor: usize,
}

impl ScriptedRolls {
    pub fn new(rolls: Vec<f64>) -> Self {
        Self { rolls, cursor: 0 }
    }

    /// A source whose every roll is `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    pub fn rolls_consumed(&self) -> usize {
        self.cursor
    }
}

impl RollSource for ScriptedRolls {
    fn roll_percent(&mut self) -> f64 {
        let value = match self.rolls.get(self.cursor) {
            Some(value) => *value,
            None => self.rolls.last().copied().unwrap_or(100.0),
        };
        self.cursor += 1;
        value
    }
}
