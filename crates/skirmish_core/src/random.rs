//! Seeded random source for one simulation run.
//!
//! All entropy in a run comes from a single ChaCha8 stream derived from a
//! 64-bit seed. Processes draw from it in scheduler order, so the same seed
//! and the same allocation replay the exact same game.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};

use crate::grid::{Board, Cell};

/// Smallest uniform draw used for Lévy jump lengths.
///
/// Caps a single jump at `LEVY_MIN_UNIFORM^(-1/alpha)`.
pub const LEVY_MIN_UNIFORM: f64 = 0.0001;

/// Unit step directions for random walks: +x, -x, +y, -y.
const DIRECTIONS: [Cell; 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Seedable generator of the samples the simulation needs.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: ChaCha8Rng,
}

impl RandomSource {
    /// Create a random source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[low, high]`.
    pub fn uniform_int(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Bernoulli trial succeeding with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Uniform cell on the board.
    pub fn cell(&mut self, board: &Board) -> Cell {
        let size = board.half_width();
        let x = self.uniform_int(-size, size);
        let y = self.uniform_int(-size, size);
        (x, y)
    }

    /// Exponential inter-arrival time of a Poisson process with `rate`.
    ///
    /// Non-positive or non-finite rates never fire and yield infinity.
    pub fn exponential(&mut self, rate: f64) -> f64 {
        match Exp::new(rate) {
            Ok(exp) if rate > 0.0 && rate.is_finite() => exp.sample(&mut self.rng),
            _ => f64::INFINITY,
        }
    }

    /// One of the four unit directions, uniformly.
    pub fn direction(&mut self) -> Cell {
        DIRECTIONS[self.rng.gen_range(0..DIRECTIONS.len())]
    }

    /// Pareto-tailed jump length `U^(-1/alpha)`, `U` uniform in `(0.0001, 1]`.
    pub fn levy_length(&mut self, alpha: f64) -> f64 {
        let u = 1.0 - self.unit() * (1.0 - LEVY_MIN_UNIFORM);
        u.powf(-1.0 / alpha)
    }

    /// Isotropic Lévy-flight displacement rounded to the nearest cell.
    pub fn levy_jump(&mut self, alpha: f64) -> Cell {
        let angle = self.unit() * TAU;
        let length = self.levy_length(alpha);
        let dx = (length * angle.cos()).round();
        let dy = (length * angle.sin()).round();
        (dx as i32, dy as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantile(samples: &mut [f64], q: f64) -> f64 {
        samples.sort_by(f64::total_cmp);
        let idx = ((samples.len() - 1) as f64 * q) as usize;
        samples[idx]
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RandomSource::new(7);
        let mut b = RandomSource::new(7);
        for _ in 0..100 {
            assert_eq!(a.uniform_int(-50, 50), b.uniform_int(-50, 50));
            assert_eq!(a.exponential(2.0).to_bits(), b.exponential(2.0).to_bits());
        }
    }

    #[test]
    fn test_cells_stay_on_board() {
        let board = Board::new(5);
        let mut rng = RandomSource::new(1);
        for _ in 0..1000 {
            assert!(board.contains(rng.cell(&board)));
        }
    }

    #[test]
    fn test_exponential_mean() {
        let mut rng = RandomSource::new(3);
        let n = 20_000;
        let mean = (0..n).map(|_| rng.exponential(4.0)).sum::<f64>() / n as f64;
        assert!((mean - 0.25).abs() < 0.02, "mean was {mean}");
    }

    #[test]
    fn test_exponential_zero_rate_never_fires() {
        let mut rng = RandomSource::new(3);
        assert!(rng.exponential(0.0).is_infinite());
    }

    #[test]
    fn test_direction_covers_all_four() {
        let mut rng = RandomSource::new(11);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(rng.direction());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_levy_length_bounds() {
        let mut rng = RandomSource::new(5);
        let cap = LEVY_MIN_UNIFORM.powf(-1.0 / 2.0);
        for _ in 0..1000 {
            let l = rng.levy_length(2.0);
            assert!(l >= 1.0 && l <= cap + 1e-9);
        }
    }

    #[test]
    fn test_levy_heavier_tail_for_small_alpha() {
        let mut rng = RandomSource::new(99);
        let mut heavy: Vec<f64> = (0..5000).map(|_| rng.levy_length(0.5)).collect();
        let mut light: Vec<f64> = (0..5000).map(|_| rng.levy_length(2.0)).collect();

        let heavy_q99 = quantile(&mut heavy, 0.99);
        let light_q99 = quantile(&mut light, 0.99);
        assert!(
            heavy_q99 > 10.0 * light_q99,
            "alpha=0.5 q99 {heavy_q99} vs alpha=2 q99 {light_q99}"
        );

        let heavy_q90 = quantile(&mut heavy, 0.90);
        let light_q90 = quantile(&mut light, 0.90);
        assert!(heavy_q90 > light_q90);
    }
}
