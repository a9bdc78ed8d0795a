//! HTTP routes
//!
//! Mutations answer with a plain-text confirmation, queries with JSON.
//! Every failure is a `400` carrying the error text.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use heart_rate_sentinel::{Monitor, MonitorError};

/// Largest request body accepted on the JSON routes.
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

/// All API routes, sharing one monitor.
pub fn routes(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let health = warp::get()
        .and(warp::path::end().or(warp::path!("api")).unify())
        .map(|| "Server is on");

    let new_attending = warp::post()
        .and(warp::path!("api" / "new_attending"))
        .and(json_body())
        .and(with_monitor(monitor.clone()))
        .and_then(handle_new_attending);

    let new_patient = warp::post()
        .and(warp::path!("api" / "new_patient"))
        .and(json_body())
        .and(with_monitor(monitor.clone()))
        .and_then(handle_new_patient);

    let heart_rate = warp::post()
        .and(warp::path!("api" / "heart_rate"))
        .and(json_body())
        .and(with_monitor(monitor.clone()))
        .and_then(handle_heart_rate);

    let interval_average = warp::post()
        .and(warp::path!("api" / "heart_rate" / "interval_average"))
        .and(json_body())
        .and(with_monitor(monitor.clone()))
        .and_then(handle_interval_average);

    let status = warp::get()
        .and(warp::path!("api" / "status" / i64))
        .and(with_monitor(monitor.clone()))
        .and_then(handle_status);

    let history = warp::get()
        .and(warp::path!("api" / "heart_rate" / i64))
        .and(with_monitor(monitor.clone()))
        .and_then(handle_history);

    let average = warp::get()
        .and(warp::path!("api" / "heart_rate" / "average" / i64))
        .and(with_monitor(monitor.clone()))
        .and_then(handle_average);

    let patients = warp::get()
        .and(warp::path!("api" / "patients" / String))
        .and(with_monitor(monitor.clone()))
        .and_then(handle_patients);

    let patients_query = warp::post()
        .and(warp::path!("api" / "patients"))
        .and(json_body())
        .and(with_monitor(monitor))
        .and_then(handle_patients_query);

    health
        .or(new_attending)
        .or(new_patient)
        .or(heart_rate)
        .or(interval_average)
        .or(status)
        .or(history)
        .or(average)
        .or(patients)
        .or(patients_query)
        .with(warp::log("hr_sentinel::http"))
}

fn with_monitor(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = (Arc<Monitor>,), Error = Infallible> + Clone {
    warp::any().map(move || monitor.clone())
}

/// Raw request body, refused with `413` past [`MAX_BODY_BYTES`].
fn json_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}

/// Bodies that are not JSON are treated like any other non-object input.
fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn text(status: StatusCode, body: impl Into<String>) -> Response {
    warp::reply::with_status(body.into(), status).into_response()
}

fn rejected(error: MonitorError) -> Response {
    log::debug!("Request rejected: {}", error);
    text(StatusCode::BAD_REQUEST, error.to_string())
}

async fn handle_new_attending(body: Bytes, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.register_physician(&parse_body(&body)).await {
        Ok(physician) => text(
            StatusCode::OK,
            format!(
                "Added new attending physician {} | {}",
                physician.username, physician.phone
            ),
        ),
        Err(e) => rejected(e),
    })
}

async fn handle_new_patient(body: Bytes, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.admit_patient(&parse_body(&body)).await {
        Ok(patient) => {
            let rendered = serde_json::to_string(&patient).unwrap_or_default();
            text(StatusCode::OK, format!("Added patient {}", rendered))
        }
        Err(e) => rejected(e),
    })
}

async fn handle_heart_rate(body: Bytes, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.ingest_reading(&parse_body(&body)).await {
        Ok((submission, _)) => text(
            StatusCode::OK,
            format!("Added test to patient id {}", submission.patient_id),
        ),
        Err(e) => rejected(e),
    })
}

async fn handle_interval_average(body: Bytes, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.interval_average(&parse_body(&body)).await {
        Ok((request, average)) => text(
            StatusCode::OK,
            format!(
                "Average heart rate since {} is {}",
                request.heart_rate_average_since, average as i64
            ),
        ),
        Err(e) => rejected(e),
    })
}

/// A tachycardic status also checks that an alert could reach a physician.
async fn handle_status(patient_id: i64, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    let report = match monitor.latest_status(patient_id).await {
        Ok(report) => report,
        Err(e) => return Ok(rejected(e)),
    };
    if report.status.is_tachycardic() {
        if let Err(e) = monitor.physician_contact(patient_id).await {
            log::warn!("{}", e);
            return Ok(text(StatusCode::BAD_REQUEST, "No such doctor's email"));
        }
    }
    Ok(warp::reply::json(&report).into_response())
}

async fn handle_history(patient_id: i64, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.heart_rate_history(patient_id).await {
        Ok(history) => warp::reply::json(&history).into_response(),
        Err(e) => rejected(e),
    })
}

async fn handle_average(patient_id: i64, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.average(patient_id).await {
        Ok(average) => warp::reply::json(&average).into_response(),
        Err(e) => rejected(e),
    })
}

async fn handle_patients(username: String, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.physician_patients(&username).await {
        Ok(listing) => warp::reply::json(&listing).into_response(),
        Err(e) => rejected(e),
    })
}

async fn handle_patients_query(body: Bytes, monitor: Arc<Monitor>) -> Result<Response, Infallible> {
    Ok(match monitor.physician_patients_query(&parse_body(&body)).await {
        Ok(listing) => warp::reply::json(&listing).into_response(),
        Err(e) => rejected(e),
    })
}
