use anyhow::Result;
use log::info;
use structopt::StructOpt;
use userfeed::harness::ModuleRunner;
use userfeed::module::{lookup, responder};

#[derive(Debug, StructOpt)]
#[structopt(about = "Article existence lookups for the user feed over a message broker.")]
struct MainOptions {
    /// Log filter directives, e.g. `warn,userfeed=debug`
    #[structopt(
        long,
        env = "RUST_LOG",
        default_value = "warn,userfeed=info",
        global = true
    )]
    log: String,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Answers lookups from the catalog API
    Responder(responder::Options),
    /// Looks up a single article through a running responder
    Lookup(lookup::Options),
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = MainOptions::from_args();

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&options.log)
        .init();

    info!("userfeed {}", env!("CARGO_PKG_VERSION"));

    let runner = ModuleRunner::default();
    let success = match options.command {
        Command::Responder(options) => {
            runner
                .run(responder::CatalogResponder::new(options))
                .await
        }
        Command::Lookup(options) => runner.run(lookup::ArticleLookup::new(options)).await,
    };

    if !success {
        anyhow::bail!("module terminated unsuccessfully");
    }

    Ok(())
}
