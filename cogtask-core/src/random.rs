use rand::Rng;

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for k in (1..items.len()).rev() {
        let idx = rng.random_range(0..=k);
        items.swap(k, idx);
    }
}

/// Uniform draw from the inclusive millisecond range.
pub fn jitter_ms<R: Rng>(rng: &mut R, (min, max): (u64, u64)) -> u64 {
    rng.random_range(min..=max)
}

/// Uniform index below `len`.
pub fn index<R: Rng>(rng: &mut R, len: usize) -> usize {
    rng.random_range(0..len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut items: Vec<u32> = (0..80).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..80).collect::<Vec<_>>());
        assert_ne!(items, sorted);
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let v = jitter_ms(&mut rng, (400, 600));
            assert!((400..=600).contains(&v));
        }
        assert_eq!(jitter_ms(&mut rng, (800, 800)), 800);
    }
}
