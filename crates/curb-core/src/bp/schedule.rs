//! Ordering strategies for the sequential message-update sweep.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Decides which factor to update next during a sweep. One sweep consists of
/// `len` calls to `next`; implementations are free to repeat or permute.
/// Injectable so tests can force a deterministic order.
pub trait UpdateSchedule {
    /// Index of the next factor to update, out of `len` factors.
    fn next(&mut self, len: usize) -> usize;
}

/// Randomised sequential schedule: every sweep visits each factor exactly
/// once, in a freshly shuffled order drawn from a seeded generator.
#[derive(Debug)]
pub struct RandomSequential {
    rng: StdRng,
    order: Vec<usize>,
    pos: usize,
}

impl RandomSequential {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            order: Vec::new(),
            pos: 0,
        }
    }
}

impl UpdateSchedule for RandomSequential {
    fn next(&mut self, len: usize) -> usize {
        if self.pos >= self.order.len() || self.order.len() != len {
            self.order = (0..len).collect();
            self.order.shuffle(&mut self.rng);
            self.pos = 0;
        }
        let idx = self.order[self.pos];
        self.pos += 1;
        idx
    }
}

/// Plain round-robin schedule, for deterministic tests.
#[derive(Debug, Default)]
pub struct InOrder {
    pos: usize,
}

impl InOrder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateSchedule for InOrder {
    fn next(&mut self, len: usize) -> usize {
        let idx = self.pos % len;
        self.pos += 1;
        idx
    }
}
