//! Roster partitioning into random pairs, with an odd member out joining the last pair.

use rand::Rng;
use rand::seq::SliceRandom;

/// Split `members` into random pairs using the thread-local RNG.
pub fn partition<T: Clone>(members: &[T]) -> Vec<Vec<T>> {
    partition_with(members, &mut rand::thread_rng())
}

/// Split `members` into random pairs; with an odd count the last subset has three.
/// Fewer than two members yields no subsets.
pub fn partition_with<T, R>(members: &[T], rng: &mut R) -> Vec<Vec<T>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if members.len() <= 1 {
        return Vec::new();
    }

    let mut shuffled = members.to_vec();
    shuffled.shuffle(rng);

    let mut subsets: Vec<Vec<T>> = shuffled.chunks(2).map(<[T]>::to_vec).collect();
    if shuffled.len() % 2 == 1
        && let Some(leftover) = subsets.pop()
        && let Some(last) = subsets.last_mut()
    {
        last.extend(leftover);
    }
    subsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn roster(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("U{i}")).collect()
    }

    #[test]
    fn test_empty_and_single() {
        assert!(partition::<String>(&[]).is_empty());
        assert!(partition(&roster(1)).is_empty());
    }

    #[test]
    fn test_pair() {
        let subsets = partition(&roster(2));
        assert_eq!(subsets.len(), 1);
        let mut only = subsets[0].clone();
        only.sort();
        assert_eq!(only, vec!["U0".to_string(), "U1".to_string()]);
    }

    #[test]
    fn test_five_members_make_a_pair_and_a_triple() {
        let members: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
        let subsets = partition(&members);
        assert_eq!(subsets.len(), 2);

        let mut sizes: Vec<usize> = subsets.iter().map(Vec::len).collect();
        sizes.sort();
        assert_eq!(sizes, vec![2, 3]);

        let covered: HashSet<&String> = subsets.iter().flatten().collect();
        assert_eq!(covered.len(), 5);
    }

    #[test]
    fn test_exact_cover_for_many_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 2..=41 {
            let members = roster(n);
            let subsets = partition_with(&members, &mut rng);

            assert_eq!(subsets.len(), n / 2, "subset count for {n}");
            assert!(subsets.iter().all(|s| s.len() == 2 || s.len() == 3));
            assert!(subsets.iter().filter(|s| s.len() == 3).count() <= 1);
            if n % 2 == 1 {
                assert_eq!(subsets.last().map(Vec::len), Some(3));
            }

            let mut flat: Vec<String> = subsets.into_iter().flatten().collect();
            flat.sort();
            let mut expected = members.clone();
            expected.sort();
            assert_eq!(flat, expected, "cover for {n}");
        }
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let members = roster(10);
        let a = partition_with(&members, &mut StdRng::seed_from_u64(42));
        let b = partition_with(&members, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_pairings_vary() {
        // Shuffling should not always produce the same first pair.
        let members = roster(8);
        let mut rng = StdRng::seed_from_u64(1);
        let firsts: HashSet<Vec<String>> = (0..50)
            .map(|_| {
                let mut first = partition_with(&members, &mut rng)[0].clone();
                first.sort();
                first
            })
            .collect();
        assert!(firsts.len() > 1);
    }
}
