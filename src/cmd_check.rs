//! `auto-accept check-config`.

use std::path::Path;

use autoaccept_config::{ConfigLoader, ConfigValidator};

pub(crate) fn check_config(config_path: Option<&Path>) -> anyhow::Result<()> {
    let shown = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigLoader::default_path);
    let config = ConfigLoader::load_or_default(config_path)?;
    let result = ConfigValidator::validate(&config);

    for error in &result.errors {
        println!("error:   {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }

    match result.into_error() {
        Some(err) => Err(anyhow::anyhow!("{} is invalid: {}", shown.display(), err)),
        None => {
            println!("{} is valid.", shown.display());
            Ok(())
        }
    }
}
