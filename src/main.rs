use anyhow::Context;
use bulbkit::{console, init_logging, HostShell, BUILD_DATE, VERSION};
use bulbkit_settings::{default_config_path, Config};
use std::path::PathBuf;

fn load_config() -> anyhow::Result<Config> {
    // An explicit path must exist; the default one is optional
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        return Config::load_from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }
    match default_config_path() {
        Ok(path) => Config::load_or_default(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        Err(_) => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialize logging
    init_logging(&config.logging)?;
    tracing::info!("Bulbkit {} (built {})", VERSION, BUILD_DATE);

    let mut shell = HostShell::from_config(&config)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    console::run(&mut shell, stdin.lock(), stdout.lock())?;

    shell.shutdown();
    Ok(())
}
