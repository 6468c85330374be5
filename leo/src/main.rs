use clap::{Parser, Subcommand};
use leo_observability::{MetricsReader, init_observability};
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ObservabilitySnafu, Result},
    push::PushArgs,
};

mod error;
mod push;

#[derive(Parser)]
#[command(name = "leo")]
#[command(about = "Leo CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push newline-delimited JSON events through a combiner
    Push {
        #[clap(flatten)]
        inner: PushArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let metrics_reader = MetricsReader::default();
    let _meter_provider = init_observability(env!("CARGO_PKG_NAME"), metrics_reader.clone())
        .context(ObservabilitySnafu {})?;

    let ct = CancellationToken::new();

    let ct_clone = ct.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ct_clone.cancel();
    });

    match cli.command {
        Commands::Push { inner } => inner.run(ct, metrics_reader).await,
    }
}
