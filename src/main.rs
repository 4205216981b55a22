use std::sync::Arc;
use trohm::app::*;
use trohm::logger::*;
use trohm::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let app = App::try_new(
        &project_settings,
        Arc::new(ConsoleNavigator::new()),
        Arc::new(StdinConfirm {
            assume_yes: cli.yes,
        }),
    )
    .await?;

    let outcome = run_command(&app, cli.command).await;

    let shutdown_timeout = std::time::Duration::from_secs(5);
    if tokio::time::timeout(shutdown_timeout, app.shutdown())
        .await
        .is_err()
    {
        error!("client shutdown timed out");
    }

    outcome
}
