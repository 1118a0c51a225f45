use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Tick;

/// Seeded random-walk tick source for paper runs and tests.
///
/// Each round advances a shared epoch and emits one tick per instrument,
/// stepping every price by up to `step_pct` in either direction. The same
/// seed always reproduces the same tape.
pub struct SyntheticTickFeed {
    rng: StdRng,
    epoch: i64,
    tick_interval_secs: i64,
    prices: Vec<(String, f64)>,
    step_pct: f64,
}

impl SyntheticTickFeed {
    pub fn new(instruments: &[String], seed: u64, start_epoch: i64) -> Self {
        let prices = instruments
            .iter()
            .enumerate()
            .map(|(i, instrument)| (instrument.clone(), 100.0 * (1.0 + i as f64 * 0.5)))
            .collect();

        Self {
            rng: StdRng::seed_from_u64(seed),
            epoch: start_epoch,
            tick_interval_secs: 2,
            prices,
            step_pct: 0.001,
        }
    }

    /// One tick per instrument at the next epoch.
    pub fn next_round(&mut self) -> Vec<Tick> {
        self.epoch += self.tick_interval_secs;
        let mut ticks = Vec::with_capacity(self.prices.len());

        for i in 0..self.prices.len() {
            let step = self.rng.gen_range(-1.0..1.0) * self.step_pct * self.prices[i].1;
            self.prices[i].1 = (self.prices[i].1 + step).max(0.01);
            ticks.push(Tick {
                instrument: self.prices[i].0.clone(),
                price: self.prices[i].1,
                epoch: self.epoch,
            });
        }

        ticks
    }
}
