//! HTTP routes for the grid.
//!
//! The grid sends its JSON document in a `request` parameter, either in the
//! query string (GET) or form-encoded in the body (POST). A POST with an
//! `application/json` body carries the document itself. Every route answers
//! with a JSON envelope, including when the parameter is missing or the body
//! cannot be decoded.

use std::future::Future;

use axum::{
    extract::{rejection::QueryRejection, FromRequest, Query, Request, State},
    http::header::CONTENT_TYPE,
    response::Json,
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::GridService;
use gridlite_core::{Envelope, Error, Result};

/// Parameters sent by the grid
#[derive(Debug, Deserialize)]
pub struct GridParams {
    /// JSON request document
    pub request: Option<String>,
}

/// Create the grid router
///
/// | route | operation |
/// |---|---|
/// | `/get_table_data_all` | search, sort and page a table |
/// | `/get_table_data` | first page of the default table |
/// | `/delete_table_data` | delete selected records |
/// | `/save_table_data` | save edited records |
pub fn router(service: GridService) -> Router {
    Router::new()
        .route("/get_table_data_all", get(list_get).post(list_post))
        .route("/get_table_data", get(list_default).post(list_default))
        .route("/delete_table_data", get(delete_get).post(delete_post))
        .route("/save_table_data", get(save_get).post(save_post))
        .with_state(service)
}

/// Serve the grid routes on `listener` until `shutdown` completes
pub async fn serve<F>(
    listener: TcpListener,
    service: GridService,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("gridlite listening on http://{}", addr);
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_get(
    State(service): State<GridService>,
    params: std::result::Result<Query<GridParams>, QueryRejection>,
) -> Json<Envelope> {
    dispatch(service, from_query(params), GridService::list_raw).await
}

async fn list_post(State(service): State<GridService>, request: Request) -> Json<Envelope> {
    dispatch(service, from_body(request).await, GridService::list_raw).await
}

async fn list_default(State(service): State<GridService>) -> Json<Envelope> {
    dispatch(service, Ok(String::new()), |service, _| service.list_default()).await
}

async fn delete_get(
    State(service): State<GridService>,
    params: std::result::Result<Query<GridParams>, QueryRejection>,
) -> Json<Envelope> {
    dispatch(service, from_query(params), GridService::delete_raw).await
}

async fn delete_post(State(service): State<GridService>, request: Request) -> Json<Envelope> {
    dispatch(service, from_body(request).await, GridService::delete_raw).await
}

async fn save_get(
    State(service): State<GridService>,
    params: std::result::Result<Query<GridParams>, QueryRejection>,
) -> Json<Envelope> {
    dispatch(service, from_query(params), GridService::save_raw).await
}

async fn save_post(State(service): State<GridService>, request: Request) -> Json<Envelope> {
    dispatch(service, from_body(request).await, GridService::save_raw).await
}

fn from_query(params: std::result::Result<Query<GridParams>, QueryRejection>) -> Result<String> {
    match params {
        Ok(Query(params)) => required(params),
        Err(rejection) => Err(Error::MalformedRequest(rejection.body_text())),
    }
}

/// Reads the request document from a POST body.
///
/// A JSON body is the document itself; anything else must be a form
/// holding the `request` parameter.
async fn from_body(request: Request) -> Result<String> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        match Json::<serde_json::Value>::from_request(request, &()).await {
            Ok(Json(document)) => Ok(document.to_string()),
            Err(rejection) => Err(Error::MalformedRequest(rejection.body_text())),
        }
    } else {
        match Form::<GridParams>::from_request(request, &()).await {
            Ok(Form(params)) => required(params),
            Err(rejection) => Err(Error::MalformedRequest(rejection.body_text())),
        }
    }
}

fn required(params: GridParams) -> Result<String> {
    params
        .request
        .ok_or_else(|| Error::MalformedRequest("missing parameter 'request'".to_string()))
}

/// Runs a blocking service call off the async runtime.
async fn dispatch<F>(service: GridService, raw: Result<String>, operation: F) -> Json<Envelope>
where
    F: FnOnce(&GridService, &str) -> Envelope + Send + 'static,
{
    let raw = match raw {
        Ok(raw) => raw,
        Err(err) => {
            debug!(error = %err, "Rejected grid parameters");
            return Json(Envelope::error(&err));
        }
    };

    let envelope = match tokio::task::spawn_blocking(move || operation(&service, &raw)).await {
        Ok(envelope) => envelope,
        Err(join_error) => {
            error!(error = %join_error, "Grid worker task failed");
            Envelope::error(&Error::Storage(format!(
                "worker task failed: {}",
                join_error
            )))
        }
    };
    Json(envelope)
}
