//! Explicit weighted-choice tables.
//!
//! A table is a list of `(outcome, weight)` bands laid end to end. A roll in
//! `0..total` lands in exactly one band, so the distribution is visible in
//! the table itself and each band can be hit deliberately in tests through
//! [`WeightedTable::pick_at`].

use rand::Rng;

/// Errors building a weighted table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeightError {
    #[error("weighted table has no entries")]
    Empty,

    #[error("weighted table weights sum to zero")]
    ZeroTotal,

    #[error("weighted table weights sum past u32::MAX")]
    Overflow,
}

/// A discrete distribution over outcomes of type `A`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedTable<A> {
    bands: Vec<(A, u32)>,
    total: u32,
}

impl<A: Copy> WeightedTable<A> {
    pub fn new(bands: Vec<(A, u32)>) -> Result<Self, WeightError> {
        if bands.is_empty() {
            return Err(WeightError::Empty);
        }
        let total = bands
            .iter()
            .try_fold(0u32, |sum, (_, weight)| sum.checked_add(*weight))
            .ok_or(WeightError::Overflow)?;
        if total == 0 {
            return Err(WeightError::ZeroTotal);
        }
        Ok(Self { bands, total })
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn bands(&self) -> &[(A, u32)] {
        &self.bands
    }

    /// Outcome for a roll in `0..total`. Rolls past the end land in the last
    /// band. Band bounds never exceed `total`, which `new` checked.
    pub fn pick_at(&self, roll: u32) -> A {
        let mut upper = 0;
        for (outcome, weight) in &self.bands {
            upper += weight;
            if roll < upper {
                return *outcome;
            }
        }
        // `new` guarantees at least one band
        self.bands[self.bands.len() - 1].0
    }

    /// Draw an outcome.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> A {
        self.pick_at(rng.random_range(0..self.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Gesture {
        Look,
        Wander,
        Nothing,
    }

    fn idle_table() -> WeightedTable<Gesture> {
        WeightedTable::new(vec![
            (Gesture::Look, 3),
            (Gesture::Wander, 1),
            (Gesture::Nothing, 6),
        ])
        .unwrap()
    }

    #[test]
    fn rolls_map_to_bands() {
        let table = idle_table();
        assert_eq!(table.total(), 10);
        assert_eq!(table.pick_at(0), Gesture::Look);
        assert_eq!(table.pick_at(2), Gesture::Look);
        assert_eq!(table.pick_at(3), Gesture::Wander);
        assert_eq!(table.pick_at(4), Gesture::Nothing);
        assert_eq!(table.pick_at(9), Gesture::Nothing);
        assert_eq!(table.pick_at(500), Gesture::Nothing);
    }

    #[test]
    fn zero_weight_band_is_never_picked() {
        let table = WeightedTable::new(vec![(Gesture::Look, 0), (Gesture::Wander, 5)]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            assert_eq!(table.pick(&mut rng), Gesture::Wander);
        }
    }

    #[test]
    fn empty_and_zero_tables_rejected() {
        assert_eq!(
            WeightedTable::<Gesture>::new(vec![]).unwrap_err(),
            WeightError::Empty
        );
        assert_eq!(
            WeightedTable::new(vec![(Gesture::Look, 0)]).unwrap_err(),
            WeightError::ZeroTotal
        );
    }

    #[test]
    fn overflowing_weights_rejected() {
        assert_eq!(
            WeightedTable::new(vec![(Gesture::Look, u32::MAX), (Gesture::Wander, 1)]).unwrap_err(),
            WeightError::Overflow
        );

        let full = WeightedTable::new(vec![(Gesture::Look, u32::MAX - 1), (Gesture::Wander, 1)])
            .unwrap();
        assert_eq!(full.total(), u32::MAX);
        assert_eq!(full.pick_at(u32::MAX - 1), Gesture::Wander);
    }

    #[test]
    fn frequencies_follow_weights() {
        let table = idle_table();
        let mut rng = StdRng::seed_from_u64(99);
        let draws = 20_000;
        let looks = (0..draws)
            .filter(|_| table.pick(&mut rng) == Gesture::Look)
            .count();
        let share = looks as f64 / draws as f64;
        assert!((share - 0.3).abs() < 0.02, "look share was {share}");
    }
}
