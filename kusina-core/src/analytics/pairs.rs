//! Items ordered together
//!
//! Every order contributes each unordered pair of its distinct item names
//! once. Pairs are keyed canonically as `"A & B"` with `A < B`.

use std::collections::BTreeSet;

use super::leaderboard::Tally;

pub const PAIR_SEPARATOR: &str = " & ";

/// Canonical key for an unordered pair.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}{}{}", a, PAIR_SEPARATOR, b)
    } else {
        format!("{}{}{}", b, PAIR_SEPARATOR, a)
    }
}

/// Count co-occurring pairs across `baskets`.
///
/// Each basket is the list of item names of one order; duplicates within a
/// basket count once. The tally keeps pairs in first-seen order.
pub fn count_pairs<I, B, S>(baskets: I) -> Tally
where
    I: IntoIterator<Item = B>,
    B: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tally = Tally::new();
    for basket in baskets {
        let names: BTreeSet<String> = basket
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let names: Vec<&String> = names.iter().collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                tally.add(&pair_key(a, b), 1.0);
            }
        }
    }
    tally
}
