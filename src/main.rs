use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use webpwatch::notifier::{DesktopNotifier, NoopNotifier, Notifier};
use webpwatch::watch::{run_watcher, ConversionHandler};
use webpwatch::Config;

#[derive(Parser, Debug)]
#[command(name = "webpwatch", version)]
#[command(about = "Watch folders for new WebP images and convert them to PNG")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Config file (defaults to $WEBPWATCH_CONFIG, then ./webpwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable desktop notifications
    #[arg(long, global = true)]
    no_notify: bool,

    /// Watch flags, accepted without the `watch` subcommand too
    #[command(flatten)]
    watch: WatchArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch folders and convert new WebP files (default)
    Watch(WatchArgs),
    /// Convert the given WebP files once and exit
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Debug, Default, PartialEq, Eq)]
struct WatchArgs {
    /// Quiet period in milliseconds before a file is converted
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Convert even a file that keeps changing after this many milliseconds
    #[arg(long)]
    max_wait_ms: Option<u64>,

    /// Directory to watch; repeat for several (overrides config roots)
    #[arg(long = "root")]
    roots: Vec<String>,
}

impl WatchArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ms) = self.settle_ms {
            config.watch.settle_ms = ms;
        }
        if self.max_wait_ms.is_some() {
            config.watch.max_wait_ms = self.max_wait_ms;
        }
        if !self.roots.is_empty() {
            config.watch.roots = self.roots.clone();
        }
    }
}

fn build_notifier(config: &Config, disabled: bool) -> Arc<dyn Notifier> {
    if disabled || !config.notify.enabled {
        log::debug!("desktop notifications disabled");
        return Arc::new(NoopNotifier);
    }
    Arc::new(DesktopNotifier::new(config.notify.icon.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Watch(cli.watch));

    // CLI overrides apply before validation
    let config = match &command {
        Command::Watch(args) => Config::load_with_overrides(cli.config.as_deref(), |c| args.apply(c))?,
        Command::Convert { .. } => Config::load(cli.config.as_deref())?,
    };

    // Initialize logger from environment variable or the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.log_level.as_str()),
    )
    .init();

    match &config.source {
        Some(path) => log::info!("Configuration loaded from {}", path.display()),
        None => log::debug!("no config file; using defaults"),
    }

    let notifier = build_notifier(&config, cli.no_notify);
    let handler = Arc::new(ConversionHandler::new(notifier, config.notify.title.clone()));

    match command {
        Command::Convert { files } => {
            let mut failed = 0;
            for file in &files {
                match handler.process(file) {
                    Some(Ok(_)) => {}
                    Some(Err(_)) => failed += 1,
                    None => {
                        log::warn!("Skipping {} (not a .webp file)", file.display());
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} file(s) not converted", failed, files.len());
            }
        }
        Command::Watch(_) => {
            let roots = config.resolve_roots()?;
            let settings = config.debounce();
            log::info!(
                "Settle window: {:?}, max wait: {:?}",
                settings.settle,
                settings.max_wait
            );
            log::info!("WebP Converter online; press Ctrl+C to exit");

            tokio::select! {
                res = run_watcher(&roots, settings, handler) => res?,
                res = tokio::signal::ctrl_c() => {
                    res?;
                    log::info!("Interrupted, shutting down");
                }
            }
        }
    }

    Ok(())
}
