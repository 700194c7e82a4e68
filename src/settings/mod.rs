use std::env;
use std::path::PathBuf;

use rocket::figment::providers::{Env, Format, Serialized, Toml};
use rocket::figment::{self, Figment, Profile};
use rocket::serde::{Deserialize, Serialize};

use super::id::DEFAULT_ID_LENGTH;

/// Environment variable pointing at the configuration file
pub static CONFIG_PATH_ENV: &str = "DBIN_CONFIG";
/// Prefix of every environment variable read as configuration, e.g. `DBIN_PORT`
pub static ENV_PREFIX: &str = "DBIN_";
static PROFILE_ENV: &str = "DBIN_PROFILE";
static DEFAULT_CONFIG_PATH: &str = "Dbin.toml";
static DEFAULT_PORT: u16 = 1323;

/// Settings of the pastebin itself; rocket's own keys (`address`, `port`, ...)
/// live in the same figment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde", default)]
pub struct Settings {
    /// Directory holding one file per paste
    pub storage_path: PathBuf,
    /// Directory served as static files (stylesheet, icons, index page)
    pub static_path: PathBuf,
    /// Number of characters of a generated paste id
    pub id_length: usize,
    /// Maximum level of the log events, one of `trace`, `debug`, `info`, `warn`, `error`.
    /// Rocket's own `log_level` key is always `off`, logs go through tracing.
    pub tracing_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            storage_path: PathBuf::from("pastes"),
            static_path: PathBuf::from("web"),
            id_length: DEFAULT_ID_LENGTH,
            tracing_level: "info".to_string(),
        }
    }
}

/// Configuration sources, from lowest to highest priority: rocket defaults,
/// [`Settings::default`], `Dbin.toml` (or the file named by `DBIN_CONFIG`) and
/// `DBIN_` environment variables.
pub fn figment() -> Figment {
    let config_path =
        env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    layered(&config_path, ENV_PREFIX)
}

/// Rocket defaults plus [`Settings::default`], without reading files or the environment
pub fn base_figment() -> Figment {
    defaults().merge(rocket_log_off())
}

/// Check that both rocket and dbin can read their configuration out of `figment`
pub fn load(figment: &Figment) -> Result<Settings, figment::Error> {
    figment.extract::<rocket::Config>()?;
    figment.extract::<Settings>()
}

fn layered(config_path: &str, env_prefix: &str) -> Figment {
    defaults()
        .merge(Toml::file(config_path).nested())
        .merge(Env::prefixed(env_prefix).global())
        .merge(rocket_log_off())
        .select(Profile::from_env_or(PROFILE_ENV, rocket::Config::DEFAULT_PROFILE))
}

fn defaults() -> Figment {
    Figment::from(rocket::Config::default())
        .merge(Serialized::default("port", DEFAULT_PORT))
        .merge(Serialized::defaults(Settings::default()))
}

fn rocket_log_off() -> Serialized<&'static str> {
    Serialized::global("log_level", "off")
}
