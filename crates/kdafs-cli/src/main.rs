mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kdafs-cli")]
#[command(about = "Extract KDA food safety inspection records")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the extraction (the default when no command is given)
    Run(RunArgs),
    /// Print the effective configuration and exit
    Config(RunArgs),
}

/// Overrides for values otherwise read from `KDAFS_*` environment variables.
#[derive(Debug, Default, Args)]
struct RunArgs {
    /// Output JSON file, replaced at the start of every run
    #[arg(long)]
    output: Option<PathBuf>,

    /// Search page to start from
    #[arg(long)]
    search_url: Option<String>,

    /// WebDriver endpoint, e.g. a running chromedriver
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Stop after this many result pages
    #[arg(long)]
    max_pages: Option<usize>,
}

impl RunArgs {
    fn apply(self, config: &mut kdafs_core::AppConfig) {
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(search_url) = self.search_url {
            config.search_url = search_url;
        }
        if let Some(webdriver_url) = self.webdriver_url {
            config.webdriver_url = webdriver_url;
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = kdafs_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Config(args)) => {
            args.apply(&mut config);
            println!("{config:#?}");
            Ok(())
        }
        Some(Commands::Run(args)) => {
            args.apply(&mut config);
            run::run_extraction(&config).await
        }
        None => run::run_extraction(&config).await,
    }
}
