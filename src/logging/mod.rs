use std::io;
use std::str::FromStr;
use std::time::Instant;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Orbit, Request, Response, Rocket};
use thiserror::Error;
use tracing::{info, Level};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("unknown log level `{0}`")]
    UnknownLevel(String),
    #[error("couldn't install the log subscriber: {0}")]
    Install(String),
}

/// Install the process' tracing subscriber, writing to stderr everything at
/// `level` or above. Rocket's own `log` records are forwarded to it too.
pub fn init(level: &str) -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level)?)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))
}

pub fn parse_level(level: &str) -> Result<Level, LoggingError> {
    Level::from_str(level).map_err(|_| LoggingError::UnknownLevel(level.to_string()))
}

/// Access log: one event per answered request, plus one when the server is up
pub struct RequestLog;

struct RequestStart(Instant);

#[rocket::async_trait]
impl Fairing for RequestLog {
    fn info(&self) -> Info {
        Info {
            name: "Request log",
            kind: Kind::Request | Kind::Response | Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        info!(address = %config.address, port = config.port, "server started");
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let start = request.local_cache(|| RequestStart(Instant::now()));
        let remote_ip = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_default();
        let bytes_in = request
            .headers()
            .get_one("Content-Length")
            .and_then(|length| length.parse::<u64>().ok())
            .unwrap_or(0);
        let bytes_out = response.body().preset_size().unwrap_or(0);
        info!(
            status = response.status().code,
            method = %request.method(),
            uri = %request.uri().path(),
            remote_ip = %remote_ip,
            user_agent = request.headers().get_one("User-Agent").unwrap_or(""),
            latency = ?start.0.elapsed(),
            bytes_in,
            bytes_out,
            "request completed"
        );
    }
}
