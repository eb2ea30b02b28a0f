//! Top-N rankings
//!
//! Subjects are tallied in a [`Tally`], which remembers first-seen order,
//! then [`rank_top_n`] sorts descending with a stable sort so equal values
//! keep that order.

use std::collections::HashMap;

use serde::Serialize;

/// Number of leading places shown with a medal.
pub const PODIUM_PLACES: usize = 3;

/// Insertion-ordered accumulator keyed by subject id.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    order: Vec<String>,
    values: HashMap<String, f64>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subject: &str, amount: f64) {
        match self.values.get_mut(subject) {
            Some(value) => *value += amount,
            None => {
                self.order.push(subject.to_string());
                self.values.insert(subject.to_string(), amount);
            }
        }
    }

    pub fn get(&self, subject: &str) -> Option<f64> {
        self.values.get(subject).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// (subject, value) in first-seen order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.order
            .iter()
            .map(|s| (s.as_str(), self.values.get(s).copied().unwrap_or(0.0)))
    }
}

impl<'a> FromIterator<(&'a str, f64)> for Tally {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for (subject, amount) in iter {
            tally.add(subject, amount);
        }
        tally
    }
}

/// One ranked subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub subject_id: String,
    pub display_name: String,
    pub value: f64,
    /// 1-based
    pub rank: usize,
}

impl LeaderboardEntry {
    pub fn is_podium(&self) -> bool {
        self.rank <= PODIUM_PLACES
    }
}

/// Highest `n` subjects, descending by value.
///
/// `display_name` maps a subject id to its shown name.
pub fn rank_top_n(
    tally: &Tally,
    n: usize,
    display_name: impl Fn(&str) -> String,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<(&str, f64)> = tally.entries().collect();
    // sort_by is stable: ties stay in first-seen order
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));

    entries
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (subject, value))| LeaderboardEntry {
            subject_id: subject.to_string(),
            display_name: display_name(subject),
            value,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(pairs: &[(&str, f64)]) -> Tally {
        pairs.iter().copied().collect()
    }

    fn subjects(entries: &[LeaderboardEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.subject_id.as_str()).collect()
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let t = tally(&[("u1", 5.0), ("u2", 9.0), ("u3", 9.0)]);
        let top = rank_top_n(&t, 2, str::to_string);
        assert_eq!(subjects(&top), vec!["u2", "u3"]);
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[1].value, 9.0);
    }

    #[test]
    fn test_length_is_min_of_n_and_subjects() {
        let t = tally(&[("a", 1.0), ("b", 0.0)]);
        assert_eq!(rank_top_n(&t, 5, str::to_string).len(), 2);
        assert_eq!(rank_top_n(&t, 1, str::to_string).len(), 1);
        assert!(rank_top_n(&t, 0, str::to_string).is_empty());
        assert!(rank_top_n(&Tally::new(), 3, str::to_string).is_empty());
    }

    #[test]
    fn test_zero_values_kept() {
        let t = tally(&[("a", 0.0), ("b", 0.0)]);
        let top = rank_top_n(&t, 5, str::to_string);
        assert_eq!(subjects(&top), vec!["a", "b"]);
    }

    #[test]
    fn test_values_non_increasing_and_podium() {
        let t = tally(&[("a", 1.0), ("b", 7.0), ("c", 3.0), ("d", 7.0), ("e", 2.0)]);
        let top = rank_top_n(&t, 5, |s| s.to_uppercase());
        assert!(top.windows(2).all(|w| w[0].value >= w[1].value));
        assert_eq!(subjects(&top), vec!["b", "d", "c", "e", "a"]);
        assert_eq!(top[0].display_name, "B");
        let podium: Vec<bool> = top.iter().map(LeaderboardEntry::is_podium).collect();
        assert_eq!(podium, vec![true, true, true, false, false]);
    }

    #[test]
    fn test_tally_accumulates() {
        let mut t = Tally::new();
        t.add("x", 2.0);
        t.add("y", 1.0);
        t.add("x", 3.0);
        assert_eq!(t.get("x"), Some(5.0));
        assert_eq!(t.len(), 2);
        let order: Vec<&str> = t.entries().map(|(s, _)| s).collect();
        assert_eq!(order, vec!["x", "y"]);
    }
}
