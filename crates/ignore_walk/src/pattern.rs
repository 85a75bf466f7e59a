//! Compilation of a single gitignore-style pattern line into a [`Rule`].
//!
//! A pattern is compiled relative to the directory that declares it (the
//! directory holding the ignore file, or the walk root for overrides). Lines
//! that cannot match anything, such as comments, blank lines, a lone `/` or
//! misplaced `**`, compile to `None` instead of an error. The only hard error
//! is a relative base path, which is always a mistake of the caller.

use std::{
    fmt,
    iter::Peekable,
    path::{Path, PathBuf},
    str::Chars,
};

use globset::{GlobBuilder, GlobMatcher};
use thiserror::Error;

/// Where a [`Rule`] was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A line of an ignore file found during the walk.
    IgnoreFile,
    /// A pattern passed in by the caller that applies everywhere.
    ManualOverride,
    /// A pattern the application always excludes, e.g. `.git`.
    ApplicationOverride,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::IgnoreFile => write!(f, "ignore file"),
            Origin::ManualOverride => write!(f, "override"),
            Origin::ApplicationOverride => write!(f, "hard exclude"),
        }
    }
}

/// Diagnostic information about the declaration of a [`Rule`]. This never
/// influences matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Provenance {
    /// The kind of declaration.
    pub origin: Origin,

    /// The ignore file for [`Origin::IgnoreFile`], the walk root otherwise.
    pub path: PathBuf,

    /// 1-based line in the ignore file, or 1-based position in the list of
    /// overrides.
    pub line: usize,
}

impl Provenance {
    /// A rule read from `line` of the ignore file at `path`.
    pub fn ignore_file(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            origin: Origin::IgnoreFile,
            path: path.into(),
            line,
        }
    }

    /// The `position`-th caller supplied override of a walk rooted at `root`.
    pub fn manual_override(root: impl Into<PathBuf>, position: usize) -> Self {
        Self {
            origin: Origin::ManualOverride,
            path: root.into(),
            line: position,
        }
    }

    /// The `position`-th hard exclude of a walk rooted at `root`.
    pub fn application_override(root: impl Into<PathBuf>, position: usize) -> Self {
        Self {
            origin: Origin::ApplicationOverride,
            path: root.into(),
            line: position,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Origin::IgnoreFile => write!(f, "{}:{}", self.path.display(), self.line),
            origin => write!(f, "{origin} #{}", self.line),
        }
    }
}

/// Errors that can occur when compiling a pattern.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Rules are always declared by an absolute directory.
    #[error("the base path of a rule must be absolute, got '{}'", .0.display())]
    RelativeBasePath(PathBuf),
}

/// A compiled gitignore-style pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    matcher: GlobMatcher,
    negation: bool,
    directory_only: bool,
    anchored: bool,
    base_path: PathBuf,
    provenance: Provenance,
}

impl Rule {
    /// Compiles `pattern` as declared by the directory `base_path`.
    ///
    /// Returns `Ok(None)` for lines that do not describe a rule: blank lines,
    /// comments, patterns containing `***`, a `**` that is not delimited by
    /// `/` or the ends of the pattern, and patterns that reduce to `/`. A
    /// leading `!` is stripped before `**` is validated.
    ///
    /// # Errors
    /// Returns [`CompileError::RelativeBasePath`] if `base_path` is relative.
    pub fn compile(
        pattern: &str,
        base_path: &Path,
        provenance: Provenance,
    ) -> Result<Option<Rule>, CompileError> {
        if !base_path.is_absolute() {
            return Err(CompileError::RelativeBasePath(base_path.to_path_buf()));
        }

        if pattern.trim().is_empty() || pattern.starts_with('#') {
            return Ok(None);
        }
        if pattern.contains("***") {
            return Ok(None);
        }

        let (negation, body) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        if !double_stars_are_delimited(body) {
            return Ok(None);
        }
        // `/` on its own matches neither files nor directories.
        if body.is_empty() || body.trim() == "/" {
            return Ok(None);
        }

        let directory_only = body.ends_with('/');
        let mut anchored =
            body.starts_with('/') || body.strip_suffix('/').unwrap_or(body).contains('/');

        let mut fragment = body.strip_prefix('/').unwrap_or(body);
        let mut any_depth = false;
        if let Some(rest) = fragment.strip_prefix("**/") {
            fragment = rest;
            anchored = false;
            any_depth = true;
        }
        let fragment = fragment.strip_prefix('/').unwrap_or(fragment);
        let fragment = fragment.strip_suffix('/').unwrap_or(fragment);
        let fragment = match fragment {
            // `**/` on its own matches everything at any depth.
            "" if any_depth => "**",
            "" => return Ok(None),
            fragment => fragment,
        };

        let glob = translate(fragment, anchored);
        let matcher = match GlobBuilder::new(&glob)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
        {
            Ok(glob) => glob.compile_matcher(),
            Err(err) => {
                tracing::debug!("skipping pattern '{pattern}' ({provenance}): {err}");
                return Ok(None);
            }
        };

        Ok(Some(Rule {
            pattern: pattern.to_owned(),
            matcher,
            negation,
            directory_only,
            anchored,
            base_path: base_path.to_path_buf(),
            provenance,
        }))
    }

    /// Returns true if `path` is matched by this rule. The path must be
    /// absolute; paths outside of the declaring directory never match.
    ///
    /// This does not take [`Rule::is_directory_only`] into account, see
    /// [`crate::is_included`] for the full decision.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.base_path) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.matcher.is_match(relative)
    }

    /// The pattern exactly as it was written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True if the pattern started with `!` and re-includes what it matches.
    pub fn is_negation(&self) -> bool {
        self.negation
    }

    /// True if the pattern ended with `/` and only applies to directories.
    pub fn is_directory_only(&self) -> bool {
        self.directory_only
    }

    /// True if the pattern only matches relative to its declaring directory
    /// instead of at any depth below it.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// The directory that declared this rule.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Where this rule was declared.
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Compiles a single pattern, see [`Rule::compile`].
///
/// # Errors
/// Returns [`CompileError::RelativeBasePath`] if `base_path` is relative.
pub fn compile(
    pattern: &str,
    base_path: &Path,
    provenance: Provenance,
) -> Result<Option<Rule>, CompileError> {
    Rule::compile(pattern, base_path, provenance)
}

/// `**` may only appear at the very start, at the very end, or surrounded by
/// slashes.
fn double_stars_are_delimited(text: &str) -> bool {
    let bytes = text.as_bytes();
    text.match_indices("**").all(|(start, _)| {
        start == 0
            || start + 2 == bytes.len()
            || (bytes[start - 1] == b'/' && bytes.get(start + 2) == Some(&b'/'))
    })
}

/// Turns a gitignore fragment into a glob understood by `globset`.
///
/// Braces are literal in gitignore but alternations for `globset`, so they
/// are escaped. A `**` that does not occupy a whole path segment (only
/// possible at the ends, e.g. `**foo`) behaves like a single `*`. Unanchored
/// fragments may match any trailing run of path segments.
fn translate(fragment: &str, anchored: bool) -> String {
    let mut glob = String::with_capacity(fragment.len() + 3);
    let mut chars = fragment.chars().peekable();
    let mut previous: Option<char> = None;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                glob.push(c);
                if let Some(escaped) = chars.next() {
                    glob.push(escaped);
                }
            }
            '[' => {
                let mut lookahead = chars.clone();
                match translate_class(&mut lookahead) {
                    Some(class) => {
                        glob.push_str(&class);
                        chars = lookahead;
                    }
                    // Left unclosed so that `globset` rejects the pattern.
                    None => glob.push(c),
                }
            }
            '{' | '}' => {
                glob.push('\\');
                glob.push(c);
            }
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                let starts_segment = matches!(previous, None | Some('/'));
                let ends_segment = matches!(chars.peek(), None | Some(&'/'));
                if starts_segment && ends_segment {
                    glob.push_str("**");
                } else {
                    glob.push('*');
                }
            }
            _ => glob.push(c),
        }
        previous = Some(c);
    }

    if anchored || glob.starts_with("**") {
        glob
    } else {
        format!("**/{glob}")
    }
}

/// Reads a bracket expression up to and including its closing `]`, the
/// opening `[` already consumed, and renders it for `globset`. Returns `None`
/// if the class is never closed.
///
/// `globset` knows no escapes inside a class, so escaped members are written
/// unescaped in a position where they are literal: `]` first, `-` last and
/// `!` or `^` never first.
fn translate_class(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let negated = matches!(chars.peek(), Some('!' | '^'));
    if negated {
        chars.next();
    }

    let mut members: Vec<(char, char)> = Vec::new();
    loop {
        let start = match chars.next()? {
            ']' if !members.is_empty() => break,
            '\\' => chars.next()?,
            c => c,
        };
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('-') && !matches!(lookahead.peek(), None | Some(']')) {
            let end = match lookahead.next()? {
                '\\' => lookahead.next()?,
                end => end,
            };
            *chars = lookahead;
            members.push((start, end));
        } else {
            members.push((start, start));
        }
    }

    let is_single = |c: char| members.contains(&(c, c));
    let plain: Vec<_> = members
        .iter()
        .filter(|&&member| !matches!(member, (']', ']') | ('-', '-') | ('!', '!') | ('^', '^')))
        .collect();
    if !negated && !is_single(']') && !is_single('-') && plain.is_empty() {
        // Only `!` and `^`, which cannot start a class.
        let literals: Vec<_> = ['!', '^']
            .into_iter()
            .filter(|&c| is_single(c))
            .map(|c| format!("\\{c}"))
            .collect();
        return Some(match literals.as_slice() {
            [single] => single.clone(),
            _ => format!("{{{}}}", literals.join(",")),
        });
    }

    let mut class = String::from("[");
    if negated {
        class.push('!');
    }
    if is_single(']') {
        class.push(']');
    }
    for &&(start, end) in &plain {
        class.push(start);
        if start != end {
            class.push('-');
            class.push(end);
        }
    }
    for c in ['!', '^', '-'] {
        if is_single(c) {
            class.push(c);
        }
    }
    class.push(']');
    Some(class)
}
