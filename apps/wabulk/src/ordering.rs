//! Recipient ordering policy

use rand::seq::SliceRandom;

/// Returns the recipients in their given order, or a uniform Fisher-Yates
/// permutation when `randomize` is set. Every recipient appears exactly
/// once either way. Callers re-invoke this per outbound request so each
/// request gets its own ordering.
pub fn order_recipients(recipients: &[String], randomize: bool) -> Vec<String> {
    let mut ordered = recipients.to_vec();
    if randomize {
        ordered.shuffle(&mut rand::thread_rng());
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn numbers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("+1555000{i:04}")).collect()
    }

    #[test]
    fn without_randomize_the_order_is_identical() {
        let input = numbers(8);
        assert_eq!(order_recipients(&input, false), input);
    }

    #[test]
    fn shuffle_is_a_permutation_with_no_loss_or_duplication() {
        let input = numbers(20);
        for _ in 0..50 {
            let shuffled = order_recipients(&input, true);
            assert_eq!(shuffled.len(), input.len());
            let distinct: HashSet<&String> = shuffled.iter().collect();
            assert_eq!(distinct.len(), input.len());
            for number in &input {
                assert!(shuffled.contains(number));
            }
        }
    }

    #[test]
    fn shuffle_actually_moves_something_eventually() {
        let input = numbers(10);
        let moved = (0..50).any(|_| order_recipients(&input, true) != input);
        assert!(moved);
    }
}
