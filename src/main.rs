use clap::Parser;

mod cli;
mod commands;
mod error;
mod local;
mod params;
mod server;
mod store;

#[tokio::main]
async fn main() -> Result<(), error::Error> {
    let opts = cli::Options::parse();

    match opts.command {
        cli::Command::Serve(command) => command.run().await,
        cli::Command::Import(command) => command.run().await,
        cli::Command::Query(command) => command.run().await,
    }
}
