//! Reading ignore files and keeping track of the rules every visited
//! directory declares.

use std::{
    collections::HashMap,
    io,
    path::{Component, Path, PathBuf},
};

use fs_err as fs;
use thiserror::Error;

use crate::pattern::{CompileError, Provenance, Rule};

/// The key under which the rules of the walk root are stored.
pub const ROOT_KEY: &str = ".";

/// Errors that can occur when loading the rules of an ignore file.
#[derive(Debug, Error)]
pub enum LoadRulesError {
    /// The ignore file exists but could not be read.
    #[error("failed to read ignore file {}", .0.display())]
    Read(PathBuf, #[source] io::Error),

    /// The directory holding the ignore file is not absolute.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Loads the rules declared by the file `filename` in `directory`.
///
/// A missing file declares no rules. Lines that do not compile to a rule are
/// skipped, the order of the remaining rules is the order of the file.
pub fn load_rules(directory: &Path, filename: &str) -> Result<Vec<Rule>, LoadRulesError> {
    let path = directory.join(filename);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(LoadRulesError::Read(path, err)),
    };

    let rules = parse_rules(&contents, directory, &path)?;
    tracing::debug!("loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

/// Compiles every line of `contents` as if it were the ignore file `source`
/// located in `directory`.
pub fn parse_rules(
    contents: &str,
    directory: &Path,
    source: &Path,
) -> Result<Vec<Rule>, CompileError> {
    let mut rules = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let provenance = Provenance::ignore_file(source, index + 1);
        if let Some(rule) = Rule::compile(line, directory, provenance)? {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// The rules declared by every directory visited so far, keyed by the path
/// of the directory relative to the walk root ([`ROOT_KEY`] for the root).
///
/// Entries are only ever added. A directory must be inserted after all of its
/// ancestors, which a top-down walk guarantees.
#[derive(Debug, Default)]
pub struct WalkState {
    declared: HashMap<PathBuf, Vec<Rule>>,
}

impl WalkState {
    /// Records the rules declared by the directory at `relative_dir`.
    pub fn insert(&mut self, relative_dir: &Path, rules: Vec<Rule>) {
        self.declared.insert(state_key(relative_dir), rules);
    }

    /// The rules declared by the directory at `relative_dir` itself.
    pub fn declared(&self, relative_dir: &Path) -> Option<&[Rule]> {
        self.declared
            .get(&state_key(relative_dir))
            .map(Vec::as_slice)
    }

    /// The rules declared by `relative_dir` and all of its ancestors, ordered
    /// from the walk root down to `relative_dir`.
    pub fn ancestor_rules<'a>(
        &'a self,
        relative_dir: &Path,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        ancestor_keys(relative_dir)
            .into_iter()
            .filter_map(move |key| {
                let rules = self.declared.get(&key);
                debug_assert!(
                    rules.is_some(),
                    "rules of {} requested before they were loaded",
                    key.display()
                );
                rules
            })
            .flatten()
    }

    /// The number of directories recorded.
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// True if no directory has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

fn state_key(relative_dir: &Path) -> PathBuf {
    ancestor_keys(relative_dir)
        .pop()
        .unwrap_or_else(|| PathBuf::from(ROOT_KEY))
}

/// `a/b` becomes `[".", "a", "a/b"]`.
fn ancestor_keys(relative_dir: &Path) -> Vec<PathBuf> {
    let mut keys = vec![PathBuf::from(ROOT_KEY)];
    let mut current = PathBuf::new();
    for component in relative_dir.components() {
        if let Component::Normal(name) = component {
            current.push(name);
            keys.push(current.clone());
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Origin;
    use tempfile::tempdir;

    #[test]
    fn missing_file_declares_nothing() {
        let dir = tempdir().unwrap();
        let rules = load_rules(dir.path(), ".gitignore").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn keeps_order_and_line_numbers() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".gitignore"),
            "# build output\n*.log\n\n!keep.log\r\nbuild/\na/**b\n",
        )
        .unwrap();

        let rules = load_rules(dir.path(), ".gitignore").unwrap();
        let summary: Vec<_> = rules
            .iter()
            .map(|rule| (rule.pattern(), rule.provenance().line))
            .collect();
        assert_eq!(summary, vec![("*.log", 2), ("!keep.log", 4), ("build/", 5)]);

        let provenance = rules[0].provenance();
        assert_eq!(provenance.origin, Origin::IgnoreFile);
        assert_eq!(provenance.path, dir.path().join(".gitignore"));
        assert_eq!(rules[0].base_path(), dir.path());
    }

    #[test]
    fn trailing_whitespace_is_kept() {
        let root = std::env::temp_dir();
        let rules = parse_rules("foo  \n", &root, &root.join(".gitignore")).unwrap();
        assert_eq!(rules[0].pattern(), "foo  ");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempdir().unwrap();
        // A directory where the ignore file is expected cannot be read.
        fs::create_dir(dir.path().join(".gitignore")).unwrap();
        let err = load_rules(dir.path(), ".gitignore").unwrap_err();
        assert!(matches!(err, LoadRulesError::Read(..)));
    }

    #[test]
    fn ancestor_rules_run_from_root_to_leaf() {
        let root = std::env::temp_dir();
        let mut state = WalkState::default();
        let rules_of = |dir: &Path, text: &str| {
            parse_rules(text, &root.join(dir), &root.join(dir).join(".gitignore")).unwrap()
        };

        state.insert(Path::new("."), rules_of(Path::new(""), "root.txt\n"));
        state.insert(Path::new("a"), rules_of(Path::new("a"), "a1\na2\n"));
        state.insert(Path::new("a/b"), rules_of(Path::new("a/b"), "b.txt\n"));
        state.insert(Path::new("c"), rules_of(Path::new("c"), "sibling\n"));

        let patterns: Vec<_> = state
            .ancestor_rules(Path::new("a/b"))
            .map(Rule::pattern)
            .collect();
        assert_eq!(patterns, vec!["root.txt", "a1", "a2", "b.txt"]);

        let patterns: Vec<_> = state.ancestor_rules(Path::new("")).map(Rule::pattern).collect();
        assert_eq!(patterns, vec!["root.txt"]);

        assert_eq!(state.len(), 4);
        assert_eq!(state.declared(Path::new("")).map(<[Rule]>::len), Some(1));
    }
}
