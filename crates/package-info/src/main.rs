use clap::{Parser, Subcommand};
use package_info::commands::info::QuerySource;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "package-info", version, about = "npm package descriptions and download trends")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root for .package-info/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Extra config file, applied last
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up every package named in the query
    Info {
        /// Text containing package names, e.g. "lodash moment/request"
        query: Vec<String>,

        /// Read the query from stdin instead
        #[arg(long, conflicts_with = "query")]
        stdin: bool,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Reset SIGPIPE to default behavior so piping to `head` etc. doesn't panic.
#[cfg(unix)]
fn reset_sigpipe() {
    // SAFETY: libc::signal is a standard POSIX function; this only changes the
    // disposition of SIGPIPE back to terminate-on-broken-pipe.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let root = cli.root.unwrap_or_else(|| PathBuf::from("."));
    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Info { query, stdin, json } => {
            let source = if stdin {
                QuerySource::Stdin
            } else {
                QuerySource::Args(query)
            };
            package_info::commands::info::cmd_info(source, &root, explicit, json).await
        }
        Commands::Config => package_info::commands::config::cmd_config(&root, explicit),
    }
}

fn main() {
    reset_sigpipe();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
