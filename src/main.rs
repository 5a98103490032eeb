use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lynkr", version, about = "Biolink platform backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => runtime.block_on(lynkr::run()),
        Command::Migrate => runtime.block_on(lynkr::run_migrations()),
    }
}
