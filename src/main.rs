//! # dbin
//!
//! `dbin` is a minimal pastebin wrote with rust programming language. Every
//! paste is stored as a file named after its id, nothing else is kept.
//!
//! # How to use
//!
//! ```text
//! $ curl --data-binary @notes.txt http://localhost:1323/paste
//! {"id":"3f9a1c"}
//! $ curl http://localhost:1323/3f9a1c
//! ```
//!
//! Browsers, which send `Accept: text/html`, get the paste inside a small page
//! styled by `web/css/styles.css`; everyone else gets the bytes as `text/plain`.
//!
//! # Configuration
//!
//! Read from `Dbin.toml` (another file can be set with `DBIN_CONFIG`) and
//! from `DBIN_` environment variables, which take precedence:
//! - DBIN_STORAGE_PATH: Directory to store pastes, `pastes` by default
//! - DBIN_STATIC_PATH: Directory served as static files, `web` by default
//! - DBIN_ID_LENGTH: Number of characters of a paste id, `6` by default
//! - DBIN_TRACING_LEVEL: `trace`, `debug`, `info`, `warn` or `error`, `info` by default
//! - DBIN_ADDRESS / DBIN_PORT: Where to listen, `127.0.0.1:1323` by default

use anyhow::{Context, Result};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::fs::{FileServer, Options};
use rocket::http::Status;
use rocket::response::status;
use rocket::{catch, catchers, routes, Build, Request, Rocket};
use tracing::error;

mod blob;
mod id;
mod logging;
mod paste;
mod settings;

use blob::BlobStore;
use logging::RequestLog;
use settings::Settings;

/// Static files rank after the paste routes, so `/<id>` is tried first
const STATIC_FILES_RANK: isize = 20;

/// Errors are answered with their status only
#[catch(default)]
fn empty_body(status: Status, _: &Request<'_>) -> status::Custom<()> {
    status::Custom(status, ())
}

/// Assemble the pastebin from a configuration figment
pub fn build(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(RequestLog)
        .attach(AdHoc::try_on_ignite("Paste storage", |rocket| async move {
            let settings: Settings = match rocket.figment().extract() {
                Ok(settings) => settings,
                Err(err) => {
                    error!(error = %err, "invalid configuration");
                    return Err(rocket);
                }
            };
            let static_files =
                FileServer::new(&settings.static_path, Options::Index | Options::Missing)
                    .rank(STATIC_FILES_RANK);
            Ok(rocket
                .manage(BlobStore::new(settings.storage_path.clone()))
                .manage(settings)
                .mount("/", static_files))
        }))
        .mount("/", routes![paste::submit_paste, paste::fetch_paste])
        .register("/", catchers![empty_body])
}

#[rocket::main]
async fn main() -> Result<()> {
    let figment = settings::figment();
    let settings = settings::load(&figment).context("couldn't read the configuration")?;
    logging::init(&settings.tracing_level).context("couldn't set up logging")?;

    if let Err(err) = build(figment).launch().await {
        error!(error = %err, "server stopped");
        anyhow::bail!("server stopped: {}", err);
    }
    Ok(())
}
