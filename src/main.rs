use clap::{ArgAction, Parser, Subcommand};
use image_resizer::{ImageResizer, config, output, sweep};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "image-resizer")]
#[command(about = "On-demand image resizer with a fingerprinted disk cache")]
#[command(long_about = "\
On-demand image resizer with a fingerprinted disk cache

Sources are transformed by named templates from image-resizer.toml and
written to <root>/<cache_path>/<fingerprint>_<name>.<format>. The
fingerprint covers every template setting and the source modification
time, so an unchanged (source, template) pair is served from the cache
until its lifetime runs out.

Template steps, in order:
  trim      strip uniform borders
  fit       crop-and-fill to width x height (wins over resize)
  resize    scale to width x height, optionally keeping the ratio
  inCanvas  centre on a transparent width x height canvas
  format    encode (default: keep the source extension)

Run 'image-resizer gen-config' to generate a documented image-resizer.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "image-resizer.toml", global = true)]
    config: PathBuf,

    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize one or more source images
    Resize {
        /// Source image files
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Template name (default: the first template)
        #[arg(long, short)]
        profile: Option<String>,
        /// Skip sources that are not decodable images instead of failing
        #[arg(long)]
        ignore_undecodable: bool,
        /// Print artifact URLs under `public_url` instead of disk paths
        #[arg(long)]
        url: bool,
    },
    /// Delete cached artifacts older than the configured lifetime
    CleanCache {
        /// List expired files without deleting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Resolve and describe every configured template
    Profiles,
    /// Print a stock image-resizer.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let load_config = || config::load_config(&cli.config);

    match cli.command {
        Command::Resize {
            sources,
            profile,
            ignore_undecodable,
            url,
        } => {
            let config = load_config()?;
            init_thread_pool(&config.processing);
            let resizer = ImageResizer::from_config(config);
            let mut items = resizer.resize_batch(&sources, profile.as_deref(), ignore_undecodable);
            if url {
                for item in &mut items {
                    if let Ok(Some(path)) = &mut item.result {
                        *path = PathBuf::from(resizer.public_url(path));
                    }
                }
            }
            output::print_batch_output(&items);

            let failed = items.iter().filter(|item| item.result.is_err()).count();
            if failed > 0 {
                return Err(format!("{failed} of {} sources failed", items.len()).into());
            }
        }
        Command::CleanCache { dry_run } => {
            let report = sweep::clean_expired(&load_config()?, dry_run)?;
            output::print_sweep_report(&report);
        }
        Command::Profiles => {
            output::print_profiles(&load_config()?.templates);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "image_resizer=warn",
        1 => "image_resizer=info",
        _ => "image_resizer=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
