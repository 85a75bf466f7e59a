use std::path::PathBuf;

use anyhow::Context;
use ignore_walk::{Provenance, Rule};

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// The patterns to compile
    #[clap(required = true)]
    patterns: Vec<String>,

    /// The directory that declares the patterns
    #[clap(long, default_value = ".")]
    base: PathBuf,
}

pub fn check(opt: Opt) -> anyhow::Result<()> {
    let base = std::path::absolute(&opt.base)
        .with_context(|| format!("failed to resolve {}", opt.base.display()))?;

    for (index, pattern) in opt.patterns.iter().enumerate() {
        let provenance = Provenance::manual_override(&base, index + 1);
        match Rule::compile(pattern, &base, provenance)? {
            Some(rule) => println!(
                "{rule}\tnegation={} directory_only={} anchored={}",
                rule.is_negation(),
                rule.is_directory_only(),
                rule.is_anchored()
            ),
            None => println!("{pattern}\trejected"),
        }
    }
    Ok(())
}
