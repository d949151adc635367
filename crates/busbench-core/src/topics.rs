//! Topic naming.

use serde::{Deserialize, Serialize};

/// Ordered topic names, zero-padded so lexical order matches numeric order.
///
/// The width is the number of digits of the largest index: 10 topics are
/// `topic-0`..`topic-9`, 11 topics are `topic-00`..`topic-10`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicSet(Vec<String>);

impl TopicSet {
    pub fn new(count: usize) -> Self {
        if count == 0 {
            return Self(Vec::new());
        }
        let width = (count - 1).to_string().len();
        Self(
            (0..count)
                .map(|n| format!("topic-{n:0width$}"))
                .collect(),
        )
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Topics `from..to`, clamped to the set.
    pub fn slice(&self, from: usize, to: usize) -> Vec<String> {
        let to = to.min(self.0.len());
        let from = from.min(to);
        self.0[from..to].to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_counts_are_unpadded() {
        assert_eq!(TopicSet::new(1).names(), ["topic-0"]);
        assert_eq!(TopicSet::new(2).names(), ["topic-0", "topic-1"]);
        assert!(TopicSet::new(0).is_empty());
    }

    #[test]
    fn ten_topics_fit_one_digit() {
        let topics = TopicSet::new(10);
        assert_eq!(topics.names().first().map(String::as_str), Some("topic-0"));
        assert_eq!(topics.names().last().map(String::as_str), Some("topic-9"));
    }

    #[test]
    fn padding_grows_past_ten() {
        let topics = TopicSet::new(11);
        assert_eq!(topics.names()[0], "topic-00");
        assert_eq!(topics.names()[10], "topic-10");

        let topics = TopicSet::new(1000);
        assert_eq!(topics.names()[0], "topic-000");
        assert_eq!(topics.names()[999], "topic-999");
    }

    #[test]
    fn lexical_order_matches_numeric_order() {
        let topics = TopicSet::new(120);
        let mut sorted = topics.names().to_vec();
        sorted.sort();
        assert_eq!(sorted, topics.names());
    }

    #[test]
    fn slice_is_clamped() {
        let topics = TopicSet::new(3);
        assert_eq!(topics.slice(1, 2), vec!["topic-1".to_string()]);
        assert_eq!(topics.slice(2, 10).len(), 1);
        assert!(topics.slice(5, 10).is_empty());
    }
}
