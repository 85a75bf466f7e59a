//! The inclusion decision for a single path.

use std::path::Path;

use crate::pattern::Rule;

/// The ordered rules that apply while evaluating the entries of a single
/// directory: the rules declared by the walk root down to the directory,
/// then the overrides, then the hard excludes.
#[derive(Debug, Clone, Default)]
pub struct RuleChain<'a> {
    rules: Vec<&'a Rule>,
}

impl<'a> RuleChain<'a> {
    /// Builds a chain from the rules declared by a directory and its
    /// ancestors, followed by `overrides` and `hard_excludes`.
    pub fn new(
        declared: impl IntoIterator<Item = &'a Rule>,
        overrides: &'a [Rule],
        hard_excludes: &'a [Rule],
    ) -> Self {
        declared
            .into_iter()
            .chain(overrides)
            .chain(hard_excludes)
            .collect()
    }

    /// Iterates over the rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Rule> + '_ {
        self.rules.iter().copied()
    }

    /// The number of rules in the chain.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if the chain contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// See [`is_included`].
    pub fn is_included(&self, path: &Path, is_directory: bool) -> bool {
        is_included(path, is_directory, self.iter())
    }

    /// See [`decisive_rule`].
    pub fn decisive_rule(&self, path: &Path, is_directory: bool) -> Option<&'a Rule> {
        decisive_rule(path, is_directory, self.iter())
    }
}

impl<'a> FromIterator<&'a Rule> for RuleChain<'a> {
    fn from_iter<T: IntoIterator<Item = &'a Rule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Decides whether `path` is included given `rules` in evaluation order.
///
/// Everything is included by default. A matching rule excludes the path,
/// unless it is a negation which includes it again, so the last matching
/// rule wins. Directory-only rules are skipped for
/// anything that is not a directory.
pub fn is_included<'r>(
    path: &Path,
    is_directory: bool,
    rules: impl IntoIterator<Item = &'r Rule>,
) -> bool {
    let mut included = true;
    for rule in rules {
        if rule.is_directory_only() && !is_directory {
            continue;
        }
        if rule.matches(path) {
            included = rule.is_negation();
        }
    }
    included
}

/// Returns the rule that decides whether `path` is included, which is the
/// last applicable rule that matches it. `None` means no rule matched and the
/// path is included.
pub fn decisive_rule<'r>(
    path: &Path,
    is_directory: bool,
    rules: impl IntoIterator<Item = &'r Rule>,
) -> Option<&'r Rule> {
    rules
        .into_iter()
        .filter(|rule| is_directory || !rule.is_directory_only())
        .filter(|rule| rule.matches(path))
        .last()
}
