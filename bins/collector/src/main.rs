mod cmd;

use clap::Parser;
use cmd::config::{CollectArgs, Effective};

#[derive(Parser)]
#[command(name = "feed-collector", about = "Сбор отфильтрованного потока событий в две SQLite-партиции")]
struct Cli {
    #[command(flatten)]
    args: CollectArgs,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(cmd::collect::run(eff));
    // Поток ингеста может висеть на чтении сокета, не ждём его.
    runtime.shutdown_background();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
