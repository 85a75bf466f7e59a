use std::path::PathBuf;

use anyhow::Context;
use ignore_walk::{find_git_root, WalkBuilder, DEFAULT_IGNORE_FILENAME};

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// The paths to explain
    #[clap(required = true)]
    paths: Vec<PathBuf>,

    /// The root of the walk [default: the enclosing git repository]
    #[clap(long)]
    root: Option<PathBuf>,

    /// The name of the ignore files to read
    #[clap(long, default_value = DEFAULT_IGNORE_FILENAME)]
    ignore_file: String,

    /// An extra pattern applied in every directory, may be negated
    #[clap(long = "override", value_name = "PATTERN")]
    overrides: Vec<String>,

    /// A pattern that is always excluded [default: .git]
    #[clap(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,
}

pub fn explain(opt: Opt) -> anyhow::Result<()> {
    let root = match opt.root {
        Some(root) => root,
        None => {
            let cwd = std::env::current_dir().context("failed to determine working directory")?;
            find_git_root(&cwd)?.unwrap_or(cwd)
        }
    };

    let mut builder = WalkBuilder::new(&root)
        .ignore_filename(opt.ignore_file)
        .overrides(opt.overrides);
    if !opt.excludes.is_empty() {
        builder = builder.hard_excludes(opt.excludes);
    }
    let walk = builder.build().context("invalid walk configuration")?;

    for path in &opt.paths {
        let absolute = std::path::absolute(path)
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        if !absolute.starts_with(walk.root()) {
            tracing::warn!(
                "{} is outside of {}",
                path.display(),
                walk.root().display()
            );
            continue;
        }

        match walk.explain(&absolute)? {
            Some(rule) => println!(
                "{}\t{}\t{}\t{}",
                if rule.is_negation() { "included" } else { "excluded" },
                rule.provenance(),
                rule,
                path.display()
            ),
            None => println!("included\t::\t{}", path.display()),
        }
    }
    Ok(())
}
