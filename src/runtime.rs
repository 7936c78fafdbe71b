use anyhow::Context;
use tracing::debug;

use crate::cli::Cli;

mod settings;
mod tasks;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = settings::load_settings();
    cli.apply(&mut settings);
    settings.validate()?;
    debug!(?settings, "effective settings");

    if cli.print_config {
        let text = toml::to_string(&settings).context("failed to render settings")?;
        print!("{text}");
        return Ok(());
    }

    let task = cli.task.context("no task given")?;
    let destination = cli.destination.as_deref().context("no destination given")?;

    match task.mode() {
        Some(mode) => tasks::copy(mode, destination, &cli.playlists, &settings, cli.dry_run, cli.verbosity()),
        None => tasks::stats(destination, &settings),
    }
}
