//! Settings command implementations

use anyhow::Result;

use crate::cli::SettingsCommand;
use crate::config::RuntimeContext;
use crate::output::print_output;
use crate::settings::SettingsStore;

pub fn run(ctx: &RuntimeContext, command: SettingsCommand) -> Result<()> {
    let store = SettingsStore::new(ctx.settings_path()?);

    match command {
        SettingsCommand::Show => print_output(ctx, &store.load()),
        SettingsCommand::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
        SettingsCommand::Reset => {
            store.reset()?;
            println!("Settings reset to defaults at: {}", store.path().display());
            Ok(())
        }
    }
}
