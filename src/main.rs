use clap::Parser;

use funnelboard::cli::{Cli, Commands};
use funnelboard::config::init_config_from;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        command => run_command(command).await,
    }
}

#[cfg(feature = "server")]
async fn serve() -> anyhow::Result<()> {
    let config = funnelboard::config::get_config();
    // guard 必须存活到进程结束，否则缓冲中的日志会丢失
    let _log_guard = funnelboard::system::init_logging(&config.logging)?;
    funnelboard::runtime::modes::run_server().await
}

#[cfg(not(feature = "server"))]
async fn serve() -> anyhow::Result<()> {
    anyhow::bail!("server mode requires the 'server' feature")
}

#[cfg(feature = "cli")]
async fn run_command(command: Commands) -> anyhow::Result<()> {
    if let Err(e) = funnelboard::runtime::modes::run_cli(command).await {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
async fn run_command(_command: Commands) -> anyhow::Result<()> {
    anyhow::bail!("this command requires the 'cli' feature")
}
