mod app;
mod cli;
mod fetch;
mod gemini;
mod markdown;
mod search;
mod serp;
mod site;
mod store;

pub const USER_AGENT: &str = concat!("career-scout/", env!("CARGO_PKG_VERSION"));

use app::App;
use clap::Parser;
use cli::Args;
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("career_scout=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut app = App::new(&args)
        .inspect_err(|e| tracing::error!("failed to start: {e}"))?;

    info!(collection = app.collection(), "career-scout ready");

    match args.query.as_deref() {
        Some(query) => println!("{}", app.run(query).await?),
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            app.interactive(stdin, &mut std::io::stdout()).await?
        }
    }

    info!("done");
    Ok(())
}
