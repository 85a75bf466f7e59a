use std::path::PathBuf;

use ignore_walk::{find_vcs_root, GIT_DIR};

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// The path to start searching from
    #[clap(default_value = ".")]
    path: PathBuf,

    /// The name of the metadata directory marking a repository
    #[clap(long, default_value = GIT_DIR)]
    vcs_dir: String,
}

pub fn root(opt: Opt) -> anyhow::Result<()> {
    match find_vcs_root(&opt.path, &opt.vcs_dir)? {
        Some(root) => {
            println!("{}", root.display());
            Ok(())
        }
        None => anyhow::bail!(
            "{} is not inside a directory containing {}",
            opt.path.display(),
            opt.vcs_dir
        ),
    }
}
