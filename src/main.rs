//! Binary entry point: resolve paths, start logging, open the database and
//! run the menus until the user exits.
use anyhow::Context;
use library_manager::logging::init_tracing;
use library_manager::{run_app, App, Config, Store};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_path)?;
    tracing::info!(db = %config.db_path.display(), "starting library manager");

    let store = Store::open(&config.db_path)
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;

    let mut app = App::new(store);
    run_app(&mut app)?;

    tracing::info!("library manager exited");
    Ok(())
}
