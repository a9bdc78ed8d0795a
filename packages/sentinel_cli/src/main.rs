use clap::Parser;

use hr_sentinel::cli::{Cli, Command};
use hr_sentinel::{demo, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let config = args.resolve()?;
            server::serve(config).await
        }
        Command::Demo { server: url } => demo::run(&url).await,
    }
}
