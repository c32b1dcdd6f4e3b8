//! Configuration file commands.

use std::process::ExitCode;

use worktrack::config::{default, xdg, ConfigError, ConfigLoader};

/// Writes the default configuration file, backing up an existing one when
/// `force` is set.
pub(crate) fn run_config_init_command(force: bool) -> ExitCode {
    report(default::create_default_config(force).map(|path| {
        println!("Created configuration at {}", path.display());
    }))
}

/// Prints the configuration file path.
pub(crate) fn run_config_path_command() -> ExitCode {
    println!("{}", xdg::config_path().display());
    ExitCode::SUCCESS
}

/// Loads the configuration file (or defaults) and checks every interval.
pub(crate) fn run_config_validate_command() -> ExitCode {
    let result = ConfigLoader::load_default().and_then(|config| {
        config.validate()?;
        Ok(config)
    });
    report(result.map(|config| {
        println!("Configuration is valid");
        println!("{config:#?}");
    }))
}

fn report(result: Result<(), ConfigError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}
