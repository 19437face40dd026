use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

use crate::i18n::{Locale, Translator};
use crate::settings::Settings;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "winmaint",
    version,
    about = "Windows maintenance toolkit with console and TUI front ends"
)]
pub struct Cli {
    /// Run the blocking console session instead of the TUI
    #[arg(long)]
    pub console: bool,

    /// Interface language (en or zh); persisted for later runs
    #[arg(long)]
    pub lang: Option<Locale>,

    /// Settings file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the interactive input timeout, e.g. "90s"
    #[arg(long)]
    pub input_timeout: Option<humantime::Duration>,

    /// Multiply every command timeout by this factor
    #[arg(long, default_value_t = 1.0)]
    pub timeout_scale: f64,
}

pub async fn run(args: Cli) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref());

    if let Some(lang) = args.lang {
        if lang != settings.locale {
            settings.locale = lang;
            if let Err(err) = settings.save() {
                warn!(%err, "could not persist the language change");
            }
        }
    }
    if let Some(limit) = args.input_timeout {
        settings.timeouts.user_input = limit.into();
    }
    if args.timeout_scale != 1.0 {
        settings.timeouts = settings.timeouts.scaled(args.timeout_scale)?;
    }

    let translator = Translator::new(settings.locale);

    if args.console {
        return crate::console::run(&settings, translator).await;
    }

    #[cfg(feature = "tui")]
    {
        crate::tui::run(&settings, translator).await
    }
    #[cfg(not(feature = "tui"))]
    {
        // Built without the TUI: the console session is the only surface.
        crate::console::run(&settings, translator).await
    }
}
