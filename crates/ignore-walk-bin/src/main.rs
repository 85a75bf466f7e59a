use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

mod commands;

/// Walk directory trees the way git sees them
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List the files that are not ignored
    Walk(commands::walk::Opt),

    /// Show how patterns are compiled
    Check(commands::check::Opt),

    /// Show which rule decides whether a path is ignored
    Explain(commands::explain::Opt),

    /// Print the root of the repository containing a path
    Root(commands::root::Opt),
}

/// Entry point of the `ignore-walk` cli.
fn main() -> anyhow::Result<()> {
    // Parse the command line arguments
    let cli = Cli::parse();

    // Setup default logging level
    let env_filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env()?;

    // Setup the tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish()
        .try_init()?;

    // Dispatch the selected command
    match cli.command {
        Commands::Walk(opt) => commands::walk::walk(opt),
        Commands::Check(opt) => commands::check::check(opt),
        Commands::Explain(opt) => commands::explain::explain(opt),
        Commands::Root(opt) => commands::root::root(opt),
    }
}
