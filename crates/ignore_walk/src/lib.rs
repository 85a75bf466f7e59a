#![deny(missing_docs)]
//! Walk a directory tree while honouring `.gitignore`-style rules.
//!
//! This crate provides:
//! - [`Rule::compile`] to turn a single pattern line into a matchable rule
//! - [`load_rules`] to read the rules of an ignore file
//! - [`is_included`] to apply an ordered chain of rules to a path
//! - [`Walk`] to traverse a tree top-down, reading nested ignore files on the
//!   way and pruning excluded directories
//! - [`find_vcs_root`] to locate the repository a path belongs to
//!
//! # Rule Semantics
//!
//! Rules follow the gitignore pattern language:
//!
//! - **Negation**: a leading `!` re-includes what an earlier rule excluded.
//!   The last matching rule decides, so a later exclude beats an earlier
//!   negation.
//! - **Anchoring**: a pattern with a `/` anywhere but at the end only matches
//!   relative to the directory of its ignore file. Other patterns match at any
//!   depth below it. A leading `**/` always matches at any depth.
//! - **Directories**: a trailing `/` restricts a rule to directories. Such a
//!   rule never excludes or re-includes a file.
//! - **Wildcards**: `*`, `?` and `[...]` never match `/`, `**` spans any
//!   number of path segments.
//!
//! While walking, the rules of every ignore file from the root down to the
//! current directory are evaluated in that order, followed by the caller's
//! overrides and finally the hard excludes (`.git` by default), which can not
//! be re-included.
//!
//! ```no_run
//! use ignore_walk::WalkBuilder;
//!
//! let walk = WalkBuilder::new("/my/project")
//!     .overrides(["*.bak"])
//!     .sort_by_file_name(true)
//!     .build()
//!     .unwrap();
//!
//! for entry in walk {
//!     let entry = entry.unwrap();
//!     for file in entry.file_paths() {
//!         println!("{}", file.display());
//!     }
//! }
//! ```

mod matcher;
mod pattern;
mod rule_store;
mod vcs;
mod walk;

pub use matcher::{decisive_rule, is_included, RuleChain};
pub use pattern::{compile, CompileError, Origin, Provenance, Rule};
pub use rule_store::{load_rules, parse_rules, LoadRulesError, WalkState, ROOT_KEY};
pub use vcs::{find_git_root, find_vcs_root, VcsRootError, GIT_DIR};
pub use walk::{
    walk, Walk, WalkBuilder, WalkEntry, WalkError, DEFAULT_HARD_EXCLUDES,
    DEFAULT_IGNORE_FILENAME,
};
