//! Top-down directory traversal that honours ignore files.
//!
//! [`Walk`] visits one directory per call to [`Iterator::next`]. Before the
//! entries of a directory are evaluated its ignore file is read, so the rules
//! of every ancestor are always known when a directory is filtered. Excluded
//! subdirectories are never entered.

use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Component, Path, PathBuf},
};

use fs_err as fs;
use thiserror::Error;

use crate::{
    matcher::RuleChain,
    pattern::{CompileError, Origin, Provenance, Rule},
    rule_store::{load_rules, LoadRulesError, WalkState},
};

/// The name of the ignore file read by default.
pub const DEFAULT_IGNORE_FILENAME: &str = ".gitignore";

/// The patterns excluded by default, regardless of any ignore file.
pub const DEFAULT_HARD_EXCLUDES: &[&str] = &[".git"];

type ErrorHandler = Box<dyn FnMut(WalkError)>;

/// Errors that can occur while setting up or performing a walk.
#[derive(Debug, Error)]
pub enum WalkError {
    /// An override or hard exclude could not be compiled.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Hard excludes must be unconditional.
    #[error("hard exclude '{0}' must not be negated")]
    NegatedHardExclude(String),

    /// The root of the walk could not be resolved to an absolute path.
    #[error("failed to resolve walk root {}", .0.display())]
    Root(PathBuf, #[source] io::Error),

    /// The entries of a directory could not be listed.
    #[error("failed to read directory {}", .0.display())]
    ReadDir(PathBuf, #[source] io::Error),

    /// The ignore file of a directory could not be read.
    #[error(transparent)]
    LoadRules(#[from] LoadRulesError),
}

/// The result of visiting a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// The absolute path of the directory.
    pub path: PathBuf,

    /// Names of the subdirectories that survived the rules. Only these are
    /// visited next.
    pub dirs: Vec<OsString>,

    /// Names of the files that survived the rules.
    pub files: Vec<OsString>,
}

impl WalkEntry {
    /// Iterates over the full paths of the included files.
    pub fn file_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|name| self.path.join(name))
    }

    /// Iterates over the full paths of the included subdirectories.
    pub fn dir_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.dirs.iter().map(|name| self.path.join(name))
    }
}

/// Configures a [`Walk`].
pub struct WalkBuilder {
    root: PathBuf,
    ignore_filename: String,
    overrides: Vec<String>,
    hard_excludes: Vec<String>,
    on_error: Option<ErrorHandler>,
    sort_by_file_name: bool,
}

impl WalkBuilder {
    /// Starts configuring a walk of `root` with the defaults: `.gitignore`
    /// files, no overrides and `.git` as the only hard exclude.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_filename: DEFAULT_IGNORE_FILENAME.to_owned(),
            overrides: Vec::new(),
            hard_excludes: DEFAULT_HARD_EXCLUDES
                .iter()
                .map(|&pattern| pattern.to_owned())
                .collect(),
            on_error: None,
            sort_by_file_name: false,
        }
    }

    /// The name of the ignore file read from every directory.
    pub fn ignore_filename(mut self, filename: impl Into<String>) -> Self {
        self.ignore_filename = filename.into();
        self
    }

    /// Patterns applied in every directory after the ignore files. These may
    /// be negated.
    pub fn overrides<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Patterns that are always excluded, evaluated after everything else.
    /// These must not be negated. Replaces the default `.git`.
    pub fn hard_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hard_excludes = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Handles errors encountered while reading a directory instead of
    /// ending the walk. The directory that failed is skipped.
    pub fn on_error(mut self, handler: impl FnMut(WalkError) + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Report and visit the entries of each directory sorted by name instead
    /// of in the order the filesystem lists them.
    pub fn sort_by_file_name(mut self, yes: bool) -> Self {
        self.sort_by_file_name = yes;
        self
    }

    /// Compiles the overrides and hard excludes and creates the walk. Nothing
    /// is read from disk until the walk is iterated.
    ///
    /// # Errors
    /// Fails if a hard exclude is negated or the root cannot be made
    /// absolute.
    pub fn build(self) -> Result<Walk, WalkError> {
        let root =
            std::path::absolute(&self.root).map_err(|err| WalkError::Root(self.root, err))?;

        let overrides = compile_all(&self.overrides, &root, Origin::ManualOverride)?;
        let hard_excludes = compile_all(&self.hard_excludes, &root, Origin::ApplicationOverride)?;
        if let Some(rule) = hard_excludes.iter().find(|rule| rule.is_negation()) {
            return Err(WalkError::NegatedHardExclude(rule.pattern().to_owned()));
        }

        Ok(Walk {
            pending: vec![root.clone()],
            root,
            ignore_filename: self.ignore_filename,
            overrides,
            hard_excludes,
            on_error: self.on_error,
            sort_by_file_name: self.sort_by_file_name,
            state: WalkState::default(),
        })
    }
}

/// Compiles patterns declared at the walk root, skipping those that do not
/// form a rule.
fn compile_all(
    patterns: &[String],
    root: &Path,
    origin: Origin,
) -> Result<Vec<Rule>, CompileError> {
    let mut rules = Vec::with_capacity(patterns.len());
    for (index, pattern) in patterns.iter().enumerate() {
        let provenance = Provenance {
            origin,
            path: root.to_path_buf(),
            line: index + 1,
        };
        if let Some(rule) = Rule::compile(pattern, root, provenance)? {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Walks `root` with the default configuration, see [`WalkBuilder`].
pub fn walk(root: impl Into<PathBuf>) -> Result<Walk, WalkError> {
    WalkBuilder::new(root).build()
}

/// An iterator over the directories of a tree, depth-first and top-down,
/// with the entries excluded by ignore rules removed. Symbolic links are
/// never followed.
pub struct Walk {
    root: PathBuf,
    ignore_filename: String,
    overrides: Vec<Rule>,
    hard_excludes: Vec<Rule>,
    on_error: Option<ErrorHandler>,
    sort_by_file_name: bool,
    state: WalkState,
    /// Directories still to visit, the next one last.
    pending: Vec<PathBuf>,
}

impl Walk {
    /// The absolute root of the walk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The rules loaded so far.
    pub fn state(&self) -> &WalkState {
        &self.state
    }

    /// Returns the rule that decides whether `path` is part of this walk, or
    /// `None` if no rule matches and it is included. `path` may be relative to
    /// the root. `.` and `..` are resolved lexically, a path outside of the
    /// root has no deciding rule. A rule that excludes one of the ancestors
    /// of `path` decides for everything below it.
    ///
    /// This reads the ignore files on the way to `path` and does not advance
    /// the walk.
    pub fn explain(&self, path: &Path) -> Result<Option<Rule>, WalkError> {
        let joined = self.root.join(path);
        let Some(relative) = joined
            .strip_prefix(&self.root)
            .ok()
            .and_then(normalize_relative)
        else {
            return Ok(None);
        };
        let path = self.root.join(&relative);
        let is_directory = fs::symlink_metadata(&path).is_ok_and(|metadata| metadata.is_dir());

        let mut state = WalkState::default();
        let mut dir = self.root.clone();
        let mut relative_dir = PathBuf::new();
        state.insert(&relative_dir, load_rules(&dir, &self.ignore_filename)?);

        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            let candidate = dir.join(component);
            let last = components.peek().is_none();
            let chain = RuleChain::new(
                state.ancestor_rules(&relative_dir),
                &self.overrides,
                &self.hard_excludes,
            );
            let decisive = chain.decisive_rule(&candidate, !last || is_directory);
            if last || decisive.is_some_and(|rule| !rule.is_negation()) {
                return Ok(decisive.cloned());
            }

            dir = candidate;
            relative_dir.push(component);
            state.insert(&relative_dir, load_rules(&dir, &self.ignore_filename)?);
        }
        Ok(None)
    }

    fn visit(&mut self, dir: &Path) -> Result<(WalkEntry, Vec<PathBuf>), WalkError> {
        let listing = list_directory(dir, self.sort_by_file_name)
            .map_err(|err| WalkError::ReadDir(dir.to_path_buf(), err))?;

        let relative = dir.strip_prefix(&self.root).unwrap_or(Path::new(""));
        let ignore_filename = OsStr::new(&self.ignore_filename);
        let has_ignore_file = listing
            .files
            .iter()
            .any(|name| name.as_os_str() == ignore_filename);
        let declared = if has_ignore_file {
            load_rules(dir, &self.ignore_filename)?
        } else {
            Vec::new()
        };
        self.state.insert(relative, declared);

        let chain = RuleChain::new(
            self.state.ancestor_rules(relative),
            &self.overrides,
            &self.hard_excludes,
        );

        let mut dirs = Vec::with_capacity(listing.dirs.len());
        let mut descend = Vec::new();
        for subdir in listing.dirs {
            let path = dir.join(&subdir.name);
            if !chain.is_included(&path, true) {
                tracing::trace!("pruned directory {}", path.display());
                continue;
            }
            if !subdir.is_link {
                descend.push(path);
            }
            dirs.push(subdir.name);
        }

        let files = listing
            .files
            .into_iter()
            .filter(|name| {
                let path = dir.join(name);
                let included = chain.is_included(&path, false);
                if !included {
                    tracing::trace!("excluded file {}", path.display());
                }
                included
            })
            .collect();

        let entry = WalkEntry {
            path: dir.to_path_buf(),
            dirs,
            files,
        };
        Ok((entry, descend))
    }
}

/// Resolves `.` and `..` without touching the filesystem. Returns `None` if
/// the path climbs above its start.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => normalized.push(name),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

impl Iterator for Walk {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dir = self.pending.pop()?;
            match self.visit(&dir) {
                Ok((entry, descend)) => {
                    self.pending.extend(descend.into_iter().rev());
                    return Some(Ok(entry));
                }
                Err(err) => match self.on_error.as_mut() {
                    Some(handler) => handler(err),
                    None => {
                        self.pending.clear();
                        return Some(Err(err));
                    }
                },
            }
        }
    }
}

impl std::iter::FusedIterator for Walk {}

struct Subdirectory {
    name: OsString,
    /// A symbolic link to a directory, reported but never entered.
    is_link: bool,
}

#[derive(Default)]
struct Listing {
    dirs: Vec<Subdirectory>,
    files: Vec<OsString>,
}

fn list_directory(dir: &Path, sort: bool) -> io::Result<Listing> {
    let mut listing = Listing::default();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        if file_type.is_dir() {
            listing.dirs.push(Subdirectory {
                name,
                is_link: false,
            });
        } else if file_type.is_symlink()
            && fs::metadata(entry.path()).is_ok_and(|metadata| metadata.is_dir())
        {
            listing.dirs.push(Subdirectory {
                name,
                is_link: true,
            });
        } else {
            listing.files.push(name);
        }
    }

    if sort {
        listing.dirs.sort_by(|a, b| a.name.cmp(&b.name));
        listing.files.sort();
    }
    Ok(listing)
}
