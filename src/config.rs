use camino::Utf8Path;
use config::{Config, ConfigError};

pub use cleaner_api::config::*;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8470";

pub fn parse(filename: &Utf8Path) -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        .set_default("cleaner.listen", DEFAULT_LISTEN)?
        .set_default("cleaner.issues_file", "issues.yaml")?
        .add_source(config::File::with_name(filename.as_str()))
        .build()?;

    settings.try_deserialize()
}
