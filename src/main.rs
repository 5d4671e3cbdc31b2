// src/main.rs

use topostream::{RunStatus, cli, logging, run};

/// Exit status when records were left unresolved under the `fail` policy.
const EXIT_UNRESOLVED: i32 = 2;

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(RunStatus::Completed) => {}
        Ok(RunStatus::Unresolved) => std::process::exit(EXIT_UNRESOLVED),
        Err(err) => {
            eprintln!("topostream error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<RunStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    Ok(run(args).await?)
}
