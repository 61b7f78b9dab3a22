use floodgate::{Config, FileResponder, Server, ServerError};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = Config::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(config) {
        eprintln!("server startup failed: {err}");
        process::exit(1);
    }
}

fn run(config: Config) -> Result<(), ServerError> {
    let listener = Server::bind(config.port)?;
    info!(
        port = config.port,
        workers = config.threads.get(),
        capacity = config.queue_size.get(),
        policy = ?config.policy(),
        "listening"
    );

    Server::builder()
        .listener(listener)
        .responder(FileResponder::default())
        .workers(config.threads.get())
        .capacity(config.queue_size.get())
        .policy(config.policy())
        .build()?
        .launch()
}
