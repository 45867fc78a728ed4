//! Key Classification
//!
//! Decides which group a sampled key belongs to. Groups are discovered on
//! the fly: the first key of a new family creates its group, later keys of
//! the same family are matched onto it.
//!
//! ## Algorithm
//!
//! 1. Explicit [`GroupRule`]s are tried in order; the first regex that
//!    matches the raw key names the group.
//! 2. Every ASCII digit is removed from the key (digits are usually ids),
//!    giving the candidate pattern: `user:1001` -> `user:`.
//! 3. The candidate is compared with the pattern of every known group, in
//!    group creation order. The group sharing the longest common prefix
//!    wins; ties go to the group seen first. The prefix must cover at least
//!    `ceil(len(candidate) / divisor)` characters.
//! 4. The winner is only used if it holds keys of the same type. Otherwise,
//!    or when nothing qualified, the group is `<candidate>:<type>`.
//!
//! Classification is a pure function of the key and the known groups. The
//! caller owns the group map and performs the insert.

use regex::Regex;
use std::fmt;

/// Identity of a key group: normalized pattern plus value type.
///
/// Displays as `<pattern>:<type>`, e.g. `user::string` for `user:1001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId {
    pattern: String,
    key_type: String,
}

impl GroupId {
    pub fn new(pattern: impl Into<String>, key_type: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            key_type: key_type.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn key_type(&self) -> &str {
        &self.key_type
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pattern, self.key_type)
    }
}

/// An explicit grouping rule, checked before the prefix heuristic.
#[derive(Debug, Clone)]
pub struct GroupRule {
    regex: Regex,
    label: String,
}

impl GroupRule {
    /// A rule whose group pattern is the regex source itself.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            label: pattern.to_string(),
        })
    }

    /// A rule that files matching keys under `label`.
    pub fn with_label(label: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            label: label.into(),
        })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Minimum share of the candidate pattern a prefix match must cover,
/// expressed as a divisor: 3 means at least a third.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchThreshold {
    divisor: usize,
}

impl MatchThreshold {
    pub const DEFAULT_DIVISOR: usize = 3;

    /// Returns `None` for a zero divisor.
    pub fn new(divisor: usize) -> Option<Self> {
        (divisor > 0).then_some(Self { divisor })
    }

    pub fn divisor(&self) -> usize {
        self.divisor
    }

    /// Shortest acceptable prefix for a candidate of `len` characters.
    pub fn min_match(&self, len: usize) -> usize {
        len.div_ceil(self.divisor)
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self {
            divisor: Self::DEFAULT_DIVISOR,
        }
    }
}

/// Classifier settings.
#[derive(Debug, Clone, Default)]
pub struct ClassifierConfig {
    /// Evaluated in order; first match wins
    pub rules: Vec<GroupRule>,
    pub threshold: MatchThreshold,
}

/// Maps raw keys onto group identifiers.
#[derive(Debug, Clone, Default)]
pub struct KeyClassifier {
    config: ClassifierConfig,
}

impl KeyClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Picks the group for `key` of type `key_type`.
    ///
    /// `existing` must yield the known groups in a stable order; ties on
    /// prefix length go to the earliest group yielded.
    pub fn classify<'a, I>(&self, key: &str, key_type: &str, existing: I) -> GroupId
    where
        I: IntoIterator<Item = &'a GroupId>,
    {
        if let Some(rule) = self.config.rules.iter().find(|rule| rule.is_match(key)) {
            return GroupId::new(rule.label(), key_type);
        }

        let candidate = strip_digits(key);
        let min_match = self.config.threshold.min_match(candidate.chars().count());

        let mut best: Option<(&GroupId, usize)> = None;
        for group in existing {
            let len = common_prefix_len(&candidate, group.pattern());
            // A zero-length prefix never counts as a match
            if len == 0 || len < min_match {
                continue;
            }
            if best.map_or(true, |(_, best_len)| len > best_len) {
                best = Some((group, len));
            }
        }

        match best {
            Some((group, _)) if group.key_type() == key_type => group.clone(),
            _ => GroupId::new(candidate, key_type),
        }
    }
}

/// Removes every ASCII digit from `key`.
pub fn strip_digits(key: &str) -> String {
    key.chars().filter(|c| !c.is_ascii_digit()).collect()
}

/// Number of leading characters `a` and `b` have in common.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_all(classifier: &KeyClassifier, keys: &[(&str, &str)]) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = Vec::new();
        let mut assigned = Vec::new();
        for (key, key_type) in keys {
            let id = classifier.classify(key, key_type, groups.iter());
            if !groups.contains(&id) {
                groups.push(id.clone());
            }
            assigned.push(id);
        }
        assigned
    }

    #[test]
    fn test_strip_digits() {
        assert_eq!(strip_digits("user:1001"), "user:");
        assert_eq!(strip_digits("a1b22c333"), "abc");
        assert_eq!(strip_digits("12345"), "");
        assert_eq!(strip_digits("café:٣"), "café:٣");
    }

    #[test]
    fn test_strip_digits_idempotent() {
        for key in ["user:1001", "s3:bucket:7:obj", "", "42", "no-digits"] {
            let once = strip_digits(key);
            assert_eq!(strip_digits(&once), once);
        }
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("user:", "user:profile:"), 5);
        assert_eq!(common_prefix_len("abc", "xyz"), 0);
        assert_eq!(common_prefix_len("", "abc"), 0);
        assert_eq!(common_prefix_len("same", "same"), 4);
    }

    #[test]
    fn test_min_match_rounds_up() {
        let third = MatchThreshold::default();
        assert_eq!(third.min_match(0), 0);
        assert_eq!(third.min_match(1), 1);
        assert_eq!(third.min_match(9), 3);
        assert_eq!(third.min_match(10), 4);

        let quarter = MatchThreshold::new(4).unwrap();
        assert_eq!(quarter.min_match(10), 3);
        assert!(MatchThreshold::new(0).is_none());
    }

    #[test]
    fn test_ids_share_a_group() {
        let classifier = KeyClassifier::default();
        let ids = classify_all(
            &classifier,
            &[("user:1001", "string"), ("user:2002", "string"), ("user:3003", "string")],
        );
        assert!(ids.iter().all(|id| id.to_string() == "user::string"));
    }

    #[test]
    fn test_first_key_creates_group() {
        let classifier = KeyClassifier::default();
        let id = classifier.classify("session:abc:42", "hash", std::iter::empty());
        assert_eq!(id, GroupId::new("session:abc:", "hash"));
        assert_eq!(id.to_string(), "session:abc::hash");
    }

    #[test]
    fn test_type_mismatch_creates_new_group() {
        let classifier = KeyClassifier::default();
        let existing = vec![GroupId::new("order:", "string")];

        let id = classifier.classify("order:77", "hash", existing.iter());
        assert_eq!(id.to_string(), "order::hash");
    }

    #[test]
    fn test_best_match_of_other_type_blocks_weaker_match() {
        let classifier = KeyClassifier::default();
        // The string group shares 10 chars with "session:abd", the hash group 8.
        // Only the overall best candidate is checked for type
        let existing = vec![
            GroupId::new("session:abc", "string"),
            GroupId::new("session:", "hash"),
        ];

        let id = classifier.classify("session:abd", "hash", existing.iter());
        assert_eq!(id, GroupId::new("session:abd", "hash"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let classifier = KeyClassifier::default();
        let existing = vec![
            GroupId::new("user:", "hash"),
            GroupId::new("user:profile:", "hash"),
        ];

        let id = classifier.classify("user:profile:17", "hash", existing.iter());
        assert_eq!(id, GroupId::new("user:profile:", "hash"));

        // Shares "user:" with both; the earlier group wins the tie
        let id = classifier.classify("user:settings:3", "hash", existing.iter());
        assert_eq!(id, GroupId::new("user:", "hash"));
    }

    #[test]
    fn test_ties_follow_iteration_order() {
        let classifier = KeyClassifier::default();
        let a = GroupId::new("cache:a", "string");
        let b = GroupId::new("cache:b", "string");

        assert_eq!(classifier.classify("cache:c", "string", [&a, &b]), a);
        assert_eq!(classifier.classify("cache:c", "string", [&b, &a]), b);
    }

    #[test]
    fn test_short_prefix_below_threshold() {
        let classifier = KeyClassifier::default();
        let existing = vec![GroupId::new("ab", "string")];

        // Candidate of 12 chars needs 4 shared, only 2 are
        let id = classifier.classify("abcdefghijkl", "string", existing.iter());
        assert_eq!(id, GroupId::new("abcdefghijkl", "string"));

        // With a quarter threshold 3 are needed, still not enough
        let quarter = KeyClassifier::new(ClassifierConfig {
            threshold: MatchThreshold::new(4).unwrap(),
            ..Default::default()
        });
        let id = quarter.classify("abcdefghijkl", "string", existing.iter());
        assert_eq!(id, GroupId::new("abcdefghijkl", "string"));

        // Six chars need two
        let id = classifier.classify("abzzzz", "string", existing.iter());
        assert_eq!(id, GroupId::new("ab", "string"));
    }

    #[test]
    fn test_threshold_divisor_changes_grouping() {
        let existing = vec![GroupId::new("metrics:cpu", "string")];

        // "metrics:disk" (12 chars) shares 8: enough for /3 (4) and /4 (3)
        let third = KeyClassifier::default();
        assert_eq!(
            third.classify("metrics:disk", "string", existing.iter()),
            existing[0]
        );

        // 15 chars sharing "me": an eighth needs 2, a third needs 5
        let eighth = KeyClassifier::new(ClassifierConfig {
            threshold: MatchThreshold::new(8).unwrap(),
            ..Default::default()
        });
        let id = eighth.classify("mexxxxxxxxxxxxx", "string", existing.iter());
        assert_eq!(id, existing[0]);
        let id = third.classify("mexxxxxxxxxxxxx", "string", existing.iter());
        assert_eq!(id, GroupId::new("mexxxxxxxxxxxxx", "string"));
    }

    #[test]
    fn test_all_digit_key() {
        let classifier = KeyClassifier::default();
        let existing = vec![GroupId::new("user:", "string")];

        let id = classifier.classify("123456", "string", existing.iter());
        assert_eq!(id, GroupId::new("", "string"));
        assert_eq!(id.to_string(), ":string");
    }

    #[test]
    fn test_rules_short_circuit() {
        let classifier = KeyClassifier::new(ClassifierConfig {
            rules: vec![
                GroupRule::new("^feed:.*").unwrap(),
                GroupRule::with_label("carts", "^cart:").unwrap(),
            ],
            ..Default::default()
        });
        let existing = vec![GroupId::new("feed:user:", "list")];

        let id = classifier.classify("feed:user:9", "list", existing.iter());
        assert_eq!(id.to_string(), "^feed:.*:list");

        let id = classifier.classify("cart:55", "hash", existing.iter());
        assert_eq!(id, GroupId::new("carts", "hash"));

        // No rule matches: heuristic applies
        let id = classifier.classify("user:1", "string", existing.iter());
        assert_eq!(id, GroupId::new("user:", "string"));
    }

    #[test]
    fn test_invalid_rule() {
        assert!(GroupRule::new("([unclosed").is_err());
    }
}
