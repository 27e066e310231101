//! Parent selection
//!
//! [`SelectionEngine`] is reset once per generation with the fitness values
//! of the old population. The reset draws all `pop_size` parents up front,
//! and each call hands out the next one. Equal fitness always resolves to
//! the lower population index.
//!
//! SUS pointers walk the wheel in index order, so the SUS buffer is always
//! shuffled. Other schemes are shuffled only when `randomize_select` is set.

use std::cmp::Ordering;

use crate::config::{EngineConfig, SelectType};
use crate::error::ContractViolation;
use crate::random::{shuffle, RandomSource};

/// Stateful parent selector
#[derive(Clone, Debug)]
pub struct SelectionEngine {
    select_type: SelectType,
    tournament_size: f64,
    with_replacement: bool,
    p_tournament_prob: f64,
    truncation_proportion: f64,
    randomize_select: bool,

    fitness: Vec<f64>,
    /// Parents drawn at reset, handed out in order
    selected: Vec<usize>,
    calls: usize,
    /// Running fitness sums for proportional selection and SUS
    cumulative: Vec<f64>,
    /// First SUS pointer
    sus_offset: f64,
    /// Indices best first, for truncation
    ranked: Vec<usize>,
    /// Shuffled indices feeding tournaments without replacement
    pool: Vec<usize>,
    pool_pos: usize,
}

impl SelectionEngine {
    /// Create the selector described by a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            select_type: config.select_type,
            tournament_size: config.tournament_size,
            with_replacement: config.tournament_with_replacement,
            p_tournament_prob: config.p_tournament_prob,
            truncation_proportion: config.truncation_proportion,
            randomize_select: config.randomize_select,
            fitness: Vec::new(),
            selected: Vec::new(),
            calls: 0,
            cumulative: Vec::new(),
            sus_offset: 0.0,
            ranked: Vec::new(),
            pool: Vec::new(),
            pool_pos: 0,
        }
    }

    /// The selection scheme
    pub fn select_type(&self) -> SelectType {
        self.select_type
    }

    /// Calls made since the last reset
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Start a new generation with the old population's fitness values
    ///
    /// Draws exactly `fitness.len()` parents.
    pub fn reset(&mut self, fitness: &[f64], rng: &mut dyn RandomSource) {
        self.fitness.clear();
        self.fitness.extend_from_slice(fitness);
        self.calls = 0;
        let n = fitness.len();

        match self.select_type {
            SelectType::Proportional | SelectType::Sus => {
                self.cumulative.clear();
                let mut total = 0.0;
                for &f in fitness {
                    total += if f.is_finite() { f.max(0.0) } else { 0.0 };
                    self.cumulative.push(total);
                }
                if n > 0 {
                    self.sus_offset = rng.uniform01() * total / n as f64;
                }
            }
            SelectType::Truncation => {
                self.ranked = (0..n).collect();
                let f = &self.fitness;
                // Stable sort keeps the lower index first among equals
                self.ranked
                    .sort_by(|&a, &b| f[b].partial_cmp(&f[a]).unwrap_or(Ordering::Equal));
            }
            SelectType::Tournament if !self.with_replacement => {
                self.pool = (0..n).collect();
                shuffle(rng, &mut self.pool);
                self.pool_pos = 0;
            }
            SelectType::Tournament | SelectType::PTournament | SelectType::Linear => {}
        }

        self.selected.clear();
        for call in 0..n {
            let index = self.pick(call, rng);
            self.selected.push(index);
        }
        if self.randomize_select || self.select_type == SelectType::Sus {
            shuffle(rng, &mut self.selected);
        }
    }

    /// Select the next parent
    ///
    /// At most `pop_size` calls are allowed between resets.
    pub fn select_next(&mut self) -> Result<usize, ContractViolation> {
        let index = self
            .selected
            .get(self.calls)
            .copied()
            .ok_or(ContractViolation::SelectionOverrun {
                calls: self.calls + 1,
                pop_size: self.fitness.len(),
            })?;
        self.calls += 1;
        Ok(index)
    }

    /// Draw the parent for the `call`-th slot of the buffer
    fn pick(&mut self, call: usize, rng: &mut dyn RandomSource) -> usize {
        let n = self.fitness.len();
        match self.select_type {
            SelectType::Proportional => self.proportional(rng),
            SelectType::Sus => self.sus(call),
            SelectType::Tournament => self.tournament(rng),
            SelectType::PTournament => self.p_tournament(rng),
            SelectType::Truncation => {
                let cutoff = ((n as f64 * self.truncation_proportion).ceil() as usize).clamp(1, n);
                self.ranked[rng.index(cutoff)]
            }
            SelectType::Linear => call,
        }
    }

    /// True if `a` beats `b`: higher fitness, lower index on ties
    fn beats(&self, a: usize, b: usize) -> bool {
        match self.fitness[a].partial_cmp(&self.fitness[b]) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Less) => false,
            _ => a < b,
        }
    }

    fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn locate(&self, r: f64) -> usize {
        let n = self.fitness.len();
        self.cumulative.partition_point(|&c| c <= r).min(n - 1)
    }

    fn proportional(&self, rng: &mut dyn RandomSource) -> usize {
        let total = self.total();
        if total <= 0.0 {
            return rng.index(self.fitness.len());
        }
        self.locate(rng.uniform01() * total)
    }

    fn sus(&self, call: usize) -> usize {
        let n = self.fitness.len();
        let total = self.total();
        if total <= 0.0 {
            return call % n;
        }
        self.locate(self.sus_offset + call as f64 * total / n as f64)
    }

    /// Tournament size for one tournament, rounding fractions probabilistically
    fn draw_size(&self, rng: &mut dyn RandomSource) -> usize {
        let whole = self.tournament_size.floor();
        let fraction = self.tournament_size - whole;
        let mut size = whole as usize;
        if fraction > 0.0 && rng.flip(fraction) {
            size += 1;
        }
        size.clamp(1, self.fitness.len())
    }

    fn next_from_pool(&mut self, rng: &mut dyn RandomSource) -> usize {
        if self.pool_pos >= self.pool.len() {
            shuffle(rng, &mut self.pool);
            self.pool_pos = 0;
        }
        let index = self.pool[self.pool_pos];
        self.pool_pos += 1;
        index
    }

    fn tournament(&mut self, rng: &mut dyn RandomSource) -> usize {
        let size = self.draw_size(rng);
        let n = self.fitness.len();
        let mut contestants: Vec<usize> = Vec::with_capacity(size);
        while contestants.len() < size {
            let candidate = if self.with_replacement {
                rng.index(n)
            } else {
                self.next_from_pool(rng)
            };
            if !self.with_replacement && contestants.contains(&candidate) {
                continue;
            }
            contestants.push(candidate);
        }
        let mut winner = contestants[0];
        for &c in &contestants[1..] {
            if self.beats(c, winner) {
                winner = c;
            }
        }
        winner
    }

    fn p_tournament(&self, rng: &mut dyn RandomSource) -> usize {
        let n = self.fitness.len();
        let a = rng.index(n);
        let b = rng.index(n);
        let (better, worse) = if self.beats(a, b) || a == b { (a, b) } else { (b, a) };
        if rng.flip(self.p_tournament_prob) {
            better
        } else {
            worse
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::chromosome::GeneType;
    use crate::random::StdRandom;

    fn engine(select_type: SelectType) -> SelectionEngine {
        let mut config = EngineConfig::new(GeneType::Real, 4);
        config.select_type = select_type;
        SelectionEngine::from_config(&config)
    }

    #[test]
    fn test_overrun_is_reported() {
        let mut sel = engine(SelectType::Tournament);
        let mut rng = StdRandom::new(42);
        sel.reset(&[1.0, 2.0], &mut rng);
        sel.select_next().unwrap();
        sel.select_next().unwrap();
        assert_eq!(
            sel.select_next(),
            Err(ContractViolation::SelectionOverrun {
                calls: 3,
                pop_size: 2
            })
        );
        sel.reset(&[1.0, 2.0], &mut rng);
        assert!(sel.select_next().is_ok());
    }

    #[test]
    fn test_tournament_prefers_better() {
        let mut sel = engine(SelectType::Tournament);
        let mut rng = StdRandom::new(42);
        let fitness: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let mut total = 0;
        for _ in 0..20 {
            sel.reset(&fitness, &mut rng);
            for _ in 0..10 {
                total += sel.select_next().unwrap();
            }
        }
        // Binary tournament pushes the mean index well above 4.5
        assert!(total as f64 / 200.0 > 5.0);
    }

    #[test]
    fn test_tournament_tie_goes_to_lower_index() {
        let mut config = EngineConfig::new(GeneType::Real, 4);
        config.tournament_with_replacement = false;
        let mut sel = SelectionEngine::from_config(&config);
        let mut rng = StdRandom::new(42);
        sel.reset(&[3.0, 3.0], &mut rng);
        assert_eq!(sel.select_next().unwrap(), 0);
        assert_eq!(sel.select_next().unwrap(), 0);
    }

    #[test]
    fn test_tournament_without_replacement_visits_everyone() {
        let mut config = EngineConfig::new(GeneType::Real, 4);
        config.tournament_with_replacement = false;
        config.tournament_size = 1.0;
        let mut sel = SelectionEngine::from_config(&config);
        let mut rng = StdRandom::new(7);
        sel.reset(&[1.0, 5.0, 2.0, 4.0], &mut rng);
        let mut picked: Vec<usize> = (0..4).map(|_| sel.select_next().unwrap()).collect();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_proportional_skips_zero_fitness() {
        let mut sel = engine(SelectType::Proportional);
        let mut rng = StdRandom::new(42);
        for _ in 0..10 {
            sel.reset(&[0.0, 1.0, 0.0, 3.0], &mut rng);
            for _ in 0..4 {
                let i = sel.select_next().unwrap();
                assert!(i == 1 || i == 3);
            }
        }
    }

    #[test]
    fn test_sus_is_evenly_spread() {
        let mut sel = engine(SelectType::Sus);
        let mut rng = StdRandom::new(42);
        sel.reset(&[1.0, 1.0, 1.0, 1.0], &mut rng);
        let mut picked: Vec<usize> = (0..4).map(|_| sel.select_next().unwrap()).collect();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sus_partial_draw_reaches_whole_population() {
        let mut sel = engine(SelectType::Sus);
        let mut rng = StdRandom::new(42);
        let fitness = vec![1.0; 100];
        let mut highest = 0;
        for _ in 0..5 {
            sel.reset(&fitness, &mut rng);
            for _ in 0..10 {
                highest = highest.max(sel.select_next().unwrap());
            }
        }
        assert!(highest >= 10, "first ten parents all came from the lowest indices");
    }

    #[test]
    fn test_randomize_select_shuffles_every_scheme() {
        let fitness: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let draw = |select_type: SelectType, randomize: bool| {
            let mut config = EngineConfig::new(GeneType::Real, 4);
            config.select_type = select_type;
            config.randomize_select = randomize;
            let mut sel = SelectionEngine::from_config(&config);
            let mut rng = StdRandom::new(11);
            sel.reset(&fitness, &mut rng);
            (0..50).map(|_| sel.select_next().unwrap()).collect::<Vec<usize>>()
        };

        for select_type in [SelectType::Truncation, SelectType::Linear] {
            let plain = draw(select_type, false);
            let shuffled = draw(select_type, true);
            assert_ne!(plain, shuffled, "{select_type:?} order unchanged");
            let (mut a, mut b) = (plain, shuffled);
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b, "{select_type:?} picks differ");
        }
    }

    #[test]
    fn test_truncation_uses_top_fraction() {
        let mut sel = engine(SelectType::Truncation);
        let mut rng = StdRandom::new(42);
        for _ in 0..10 {
            sel.reset(&[1.0, 4.0, 2.0, 3.0], &mut rng);
            for _ in 0..4 {
                let i = sel.select_next().unwrap();
                assert!(i == 1 || i == 3);
            }
        }
    }

    #[test]
    fn test_linear_is_sequential() {
        let mut sel = engine(SelectType::Linear);
        let mut rng = StdRandom::new(42);
        sel.reset(&[1.0, 4.0, 2.0, 3.0], &mut rng);
        let picked: Vec<usize> = (0..4).map(|_| sel.select_next().unwrap()).collect();
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_p_tournament_probability() {
        let mut config = EngineConfig::new(GeneType::Real, 4);
        config.select_type = SelectType::PTournament;
        config.p_tournament_prob = 1.0;
        let mut sel = SelectionEngine::from_config(&config);
        let mut rng = StdRandom::new(42);
        let mut worse = 0;
        for _ in 0..200 {
            sel.reset(&[0.0, 10.0], &mut rng);
            for _ in 0..2 {
                if sel.select_next().unwrap() == 0 {
                    worse += 1;
                }
            }
        }
        // Index 0 only wins when drawn against itself, about a quarter of the time
        assert!(worse < 200, "worse picked {worse} times");
    }
}
