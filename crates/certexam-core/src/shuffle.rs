//! Per-attempt option shuffling.
//!
//! Options are re-shuffled for every attempt so their on-screen position is
//! never a stable tell. The RNG is always injected: tests pass a seeded
//! [`StdRng`], production seeds one from the OS entropy source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::FinalExamQuestion;

/// Return a Fisher–Yates permutation of `items`.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    shuffle_in_place(&mut out, rng);
    out
}

/// Fisher–Yates shuffle in place.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Shuffled option list for a question, or `None` for free-text questions.
pub fn shuffle_options<R: Rng + ?Sized>(
    question: &FinalExamQuestion,
    rng: &mut R,
) -> Option<Vec<String>> {
    question.options.as_deref().map(|opts| shuffle(opts, rng))
}

/// Deterministic RNG for tests and replays.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Production RNG, seeded from the operating system's entropy source.
pub fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}
