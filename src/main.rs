use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;
use storyhost::core::config::{self, CliOverrides};
use storyhost::{Backend, Profile, tui};

#[derive(Parser)]
#[command(name = "storyhost", about = "Terminal host for interactive fiction stories")]
struct Args {
    /// Story file to load (overrides config and STORYHOST_STORY_PATH)
    #[arg(short, long)]
    story: Option<PathBuf>,

    /// Synchronization backend between interpreter and display
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Display profile (scrollback limits and command echo)
    #[arg(short, long, value_enum)]
    profile: Option<Profile>,

    /// Run without mounting save storage
    #[arg(long)]
    no_storage: bool,

    /// Play the built-in demo story
    #[arg(long, conflicts_with = "story")]
    demo: bool,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to storyhost.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("storyhost.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Failed to load config, using defaults: {}", e);
            config::StoryhostConfig::default()
        }
    };

    let cli = CliOverrides {
        story: args.story,
        backend: args.backend,
        profile: args.profile,
        no_storage: args.no_storage,
        demo: args.demo,
    };
    let resolved = config::resolve(&file_config, &cli);

    log::info!(
        "Storyhost starting: backend={:?}, profile={:?}, story={:?}",
        resolved.backend,
        resolved.profile.name,
        resolved.story
    );

    tui::run(resolved)
}
