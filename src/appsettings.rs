use config::{Config, ConfigError, Environment, File};
use dhikra_models::settings::Settings;

/// `appsettings.toml`, then `appsettings.local.toml`, then `APP_SECTION__KEY` variables.
pub fn load() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name("appsettings").required(true))
        .add_source(File::with_name("appsettings.local").required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}
