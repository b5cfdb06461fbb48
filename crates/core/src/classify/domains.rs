//! Hostname substring sets for the allow-list and blacklist.
//!
//! Matching is a substring test on the hostname, not an exact or suffix
//! match. `ccgstatic.com` therefore covers `cdn1.ccgstatic.com`, and also
//! `notccgstatic.com.evil.test`.

/// A set of hostname fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet {
    entries: Vec<String>,
}

impl DomainSet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        set.extend(entries);
        set
    }

    /// True if any entry occurs inside `host`.
    pub fn matches(&self, host: &str) -> bool {
        !host.is_empty() && self.entries.iter().any(|d| host.contains(d.as_str()))
    }

    /// Append entries. Blank and duplicate entries are skipped.
    ///
    /// Returns how many entries were added.
    pub fn extend<I, S>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.entries.len();
        for entry in entries {
            let entry = entry.into().trim().to_lowercase();
            if !entry.is_empty() && !self.entries.contains(&entry) {
                self.entries.push(entry);
            }
        }
        self.entries.len() - before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Parse the remote domain list: one `hostname[,extra-fields...]` per line.
///
/// The first comma-separated field of each non-blank line is kept.
pub fn parse_domain_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_covers_subdomains() {
        let set = DomainSet::new(["ccgstatic.com"]);
        assert!(set.matches("ccgstatic.com"));
        assert!(set.matches("cdn1.ccgstatic.com"));
        assert!(!set.matches("example.com"));
        assert!(!set.matches(""));
    }

    #[test]
    fn test_substring_match_false_positive() {
        let set = DomainSet::new(["amazonaws.com"]);
        assert!(set.matches("amazonaws.com.attacker.test"));
    }

    #[test]
    fn test_extend_is_append_only_and_deduped() {
        let mut set = DomainSet::new(["a.test"]);
        assert_eq!(set.extend(["b.test", "a.test", "  ", "B.TEST"]), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a.test", "b.test"]);
    }

    #[test]
    fn test_parse_domain_list() {
        let text = "game1.example.net,US East,1\n\n  game2.example.net , EU\ngame3.example.net\r\n,nohost\n";
        assert_eq!(
            parse_domain_list(text),
            vec!["game1.example.net", "game2.example.net", "game3.example.net"]
        );
    }

    #[test]
    fn test_parse_domain_list_empty() {
        assert!(parse_domain_list("").is_empty());
        assert!(parse_domain_list("\n\n").is_empty());
    }
}
