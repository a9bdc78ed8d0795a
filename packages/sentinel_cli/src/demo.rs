//! Scripted demo client
//!
//! Replays a fixed scenario against a running server: physicians and
//! patients (valid and malformed), a few readings, then every query route.
//! Each response is printed as `status body`.

use serde_json::{json, Value};

enum Call {
    Post(&'static str, Value),
    Get(String),
}

fn scenario() -> Vec<Call> {
    use Call::{Get, Post};
    vec![
        // physicians
        Post("api/new_attending", json!({
            "attending_username": "Smith.J",
            "attending_email": "dr_user_id@ourdomain.com",
            "attending_phone": "919-867-5309",
        })),
        Post("api/new_attending", json!({
            "attending_username": "Ann.A",
            "attending_email": "dr_user_id@ourdomain.com",
            "attending_phone": "919-867-5309",
        })),
        Post("api/new_attending", json!({
            "attending_username": "Smith.J",
            "attending_email": "dr_user_id@ourdomain.com",
        })),
        Post("api/new_attending", json!({
            "attending_username": 3,
            "attending_email": "dr_user_id@ourdomain.com",
            "attending_phone": "919-867-5309",
        })),
        // patients
        Post("api/new_patient", json!({"patient_id": 1, "attending_username": "Smith.J", "patient_age": 50})),
        Post("api/new_patient", json!({"patient_id": 2, "attending_username": "Ann.A", "patient_age": 40})),
        Post("api/new_patient", json!({"patient_id": 3, "attending_username": "Ann.A"})),
        Post("api/new_patient", json!({"patient_id": "4", "attending_username": "Ann.A", "patient_age": 40})),
        Post("api/new_patient", json!({"patient_id": "5a", "attending_username": "Ann.A", "patient_age": "a40"})),
        // readings
        Post("api/heart_rate", json!({"patient_id": "1", "heart_rate": "100"})),
        Post("api/heart_rate", json!({"patient_id": "1", "heart_rate": "120"})),
        Post("api/heart_rate", json!({"patient_id": 2, "heart_rate": 80})),
        Post("api/heart_rate", json!({"patient_id": 9, "heart_rate": 80})),
        Post("api/heart_rate", json!({"patient_id": 1, "heart_rate": "fast"})),
        // queries
        Get("api/status/1".into()),
        Get("api/status/4".into()),
        Get("api/heart_rate/1".into()),
        Get("api/heart_rate/average/1".into()),
        Post("api/heart_rate/interval_average", json!({
            "patient_id": 1,
            "heart_rate_average_since": "2018-03-09 11:00:36",
        })),
        Post("api/heart_rate/interval_average", json!({
            "patient_id": 1,
            "heart_rate_average_since": "2999-01-01 00:00:00",
        })),
        Get("api/patients/Smith.J".into()),
        Get("api/patients/Ann.A".into()),
        Get("api/patients/Nobody.N".into()),
    ]
}

/// Run the scenario against `server` (e.g. `http://127.0.0.1:5000`).
pub async fn run(server: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let base = server.trim_end_matches('/');

    for call in scenario() {
        let (label, request) = match call {
            Call::Post(path, body) => (
                format!("POST /{} {}", path, body),
                client.post(format!("{}/{}", base, path)).json(&body),
            ),
            Call::Get(path) => (
                format!("GET /{}", path),
                client.get(format!("{}/{}", base, path)),
            ),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        println!("{}\n  -> {} {}", label, status.as_u16(), body);
    }
    Ok(())
}
