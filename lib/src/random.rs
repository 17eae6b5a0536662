use crate::Symbol;
use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The random source used everywhere outside of tests. A fixed seed makes
/// guesses and weight initialization reproducible.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Defines a random generator for moves. Every move 1..=8 is equally likely,
/// the padding symbol is never produced.
impl Distribution<Symbol> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Symbol {
        random_move(rng)
    }
}

pub(crate) fn random_move<R: Rng + ?Sized>(rng: &mut R) -> Symbol {
    Symbol(rng.gen_range(Symbol::MIN_MOVE..=Symbol::MAX_MOVE))
}

/// Picks a move that differs from `previous`.
/// The runtime of this function is not deterministic. (Geometric distribution)
pub(crate) fn random_move_except<R: Rng + ?Sized>(rng: &mut R, previous: Symbol) -> Symbol {
    loop {
        let candidate = random_move(rng);
        if candidate != previous {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_moves_cover_the_keypad() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [0usize; 9];
        for _ in 0..4000 {
            let symbol: Symbol = rng.gen();
            assert!(!symbol.is_padding(), "Padding is not a move");
            seen[symbol.class()] += 1;
        }
        assert_eq!(seen[0], 0);
        for (class, count) in seen.iter().enumerate().skip(1) {
            assert!(*count > 300, "Move {} only drawn {} times", class, count);
        }
    }

    #[test]
    fn except_never_repeats() {
        let mut rng = StdRng::seed_from_u64(11);
        for previous in Symbol::all_moves() {
            for _ in 0..200 {
                assert_ne!(random_move_except(&mut rng, previous), previous);
            }
        }
    }
}
