use std::path::PathBuf;

use anyhow::Context;
use ignore_walk::{WalkBuilder, DEFAULT_IGNORE_FILENAME};

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// The directory to walk
    #[clap(default_value = ".")]
    root: PathBuf,

    /// The name of the ignore files to read
    #[clap(long, default_value = DEFAULT_IGNORE_FILENAME)]
    ignore_file: String,

    /// An extra pattern applied in every directory, may be negated
    #[clap(long = "override", value_name = "PATTERN")]
    overrides: Vec<String>,

    /// A pattern that is always excluded [default: .git]
    #[clap(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// Also print the included directories
    #[clap(long)]
    dirs: bool,

    /// Log unreadable directories and continue instead of failing
    #[clap(long)]
    keep_going: bool,
}

pub fn walk(opt: Opt) -> anyhow::Result<()> {
    let mut builder = WalkBuilder::new(&opt.root)
        .ignore_filename(opt.ignore_file)
        .overrides(opt.overrides)
        .sort_by_file_name(true);
    if !opt.excludes.is_empty() {
        builder = builder.hard_excludes(opt.excludes);
    }
    if opt.keep_going {
        builder = builder.on_error(|err| {
            tracing::warn!("{:#}", anyhow::Error::from(err));
        });
    }

    let walk = builder.build().context("invalid walk configuration")?;
    let root = walk.root().to_path_buf();

    let mut files = 0usize;
    for entry in walk {
        let entry = entry?;
        if opt.dirs {
            for dir in entry.dir_paths() {
                let relative = dir.strip_prefix(&root).unwrap_or(&dir);
                println!("{}/", relative.display());
            }
        }
        for file in entry.file_paths() {
            let relative = file.strip_prefix(&root).unwrap_or(&file);
            println!("{}", relative.display());
            files += 1;
        }
    }

    tracing::info!("{files} files included below {}", root.display());
    Ok(())
}
