use super::blob::{BlobError, BlobStore};
use super::id::PasteId;
use super::settings::Settings;

use std::convert::Infallible;

use rocket::data::{Data, ToByteUnit};
use rocket::http::{ContentType, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{get, post, Responder, State};

use tracing::{error, info, warn};

/// How many freshly generated ids a submission tries before giving up
pub const MAX_ID_ATTEMPTS: usize = 8;

/// Answer to a successful submission, `{"id": "<token>"}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct PasteCreated {
    pub id: String,
}

/// Whether a paste is answered as a web page or as the stored bytes,
/// decided by the request's `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Html,
    Raw,
}

impl Presentation {
    pub fn from_accept(accept: Option<&str>) -> Presentation {
        match accept {
            Some(accept) if accept.to_ascii_lowercase().contains("text/html") => {
                Presentation::Html
            }
            _ => Presentation::Raw,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Presentation {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(Presentation::from_accept(
            request.headers().get_one("Accept"),
        ))
    }
}

#[derive(Responder, Debug)]
pub enum PasteView {
    Html(RawHtml<String>),
    Raw(Vec<u8>, ContentType),
}

/// Store the request body as a new paste and answer with its id.
///
/// The body is read whole, without size limit or content type check.
#[post("/paste", data = "<body>")]
pub async fn submit_paste(
    body: Data<'_>,
    store: &State<BlobStore>,
    settings: &State<Settings>,
) -> Result<Json<PasteCreated>, Status> {
    let content = match body.open(u64::MAX.bytes()).into_bytes().await {
        Ok(content) => content.into_inner(),
        Err(err) => {
            error!(error = %err, "couldn't read paste body");
            return Err(Status::InternalServerError);
        }
    };
    match save(store, settings.id_length, &content).await {
        Ok(id) => {
            info!(%id, bytes = content.len(), "paste saved");
            Ok(Json(PasteCreated { id: id.to_string() }))
        }
        Err(err) => {
            error!(error = %err, storage = %store.root().display(), "couldn't save paste");
            Err(Status::InternalServerError)
        }
    }
}

/// Get a paste by its id, as an HTML page when the client accepts `text/html`
/// and as `text/plain` bytes otherwise.
#[get("/<id>")]
pub async fn fetch_paste(
    id: PasteId,
    presentation: Presentation,
    store: &State<BlobStore>,
) -> Result<PasteView, Status> {
    match store.exists(&id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(%id, "paste not found");
            return Err(Status::NotFound);
        }
        Err(err) => {
            error!(%id, error = %err, "couldn't look up paste");
            return Err(Status::InternalServerError);
        }
    }
    let content = store.get(&id).await.map_err(|err| {
        error!(%id, error = %err, "couldn't read paste");
        Status::InternalServerError
    })?;
    info!(%id, ?presentation, "serving paste");
    Ok(match presentation {
        Presentation::Html => PasteView::Html(RawHtml(render_page(&id, &content))),
        Presentation::Raw => PasteView::Raw(content, ContentType::Plain),
    })
}

async fn save(store: &BlobStore, id_length: usize, content: &[u8]) -> Result<PasteId, BlobError> {
    let mut attempt = 1;
    loop {
        let id = PasteId::generate(id_length);
        match store.put(&id, content).await {
            Ok(()) => return Ok(id),
            Err(BlobError::AlreadyExists(taken)) if attempt < MAX_ID_ATTEMPTS => {
                warn!(id = %taken, attempt, "paste id already taken, generating another");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Wrap a paste into the page served to browsers. Invalid UTF-8 is rendered
/// lossily and markup is escaped.
pub fn render_page(id: &PasteId, content: &[u8]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>dbin - {id}</title>
    <link rel="icon" href="/icons/favicon.ico" type="image/x-icon" />
    <link rel="stylesheet" href="/css/styles.css" />
</head>
<body>
    <pre>{content}</pre>
</body>
</html>
"#,
        id = id,
        content = escape_html(&String::from_utf8_lossy(content))
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
