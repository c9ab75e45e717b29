use clap::{Parser, Subcommand};
use script_engine::{
    cmd::{
        self,
        run::{CheckArgs, RunArgs},
        templates::{GenerateArgs, TemplatesArgs},
    },
    config::AppConfig,
    engine::ScriptEngine,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing app.yaml.
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serves the HTTP API.
    Serve,
    /// Runs a script file and prints the result.
    Run(RunArgs),
    /// Screens and parses a script file without running it.
    Check(CheckArgs),
    /// Lists the template catalogue.
    Templates(TemplatesArgs),
    /// Prints the code generated from a template.
    Generate(GenerateArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(cli.config_dir.as_deref())?;
    tracing::debug!(database_url = %config.database_url, "Configuration loaded.");

    match cli.command {
        Commands::Serve => cmd::serve::execute(&config).await?,
        Commands::Run(args) => {
            let (engine, _repo) = cmd::load_engine(&config).await?;
            cmd::run::execute(args, &engine).await?
        }
        Commands::Check(args) => cmd::run::check(args, &ScriptEngine::from_app_config(&config))?,
        Commands::Templates(args) => {
            let (engine, _repo) = cmd::load_engine(&config).await?;
            cmd::templates::list(args, &engine)?
        }
        Commands::Generate(args) => {
            let (engine, _repo) = cmd::load_engine(&config).await?;
            cmd::templates::generate(args, &engine)?
        }
    }

    Ok(())
}
