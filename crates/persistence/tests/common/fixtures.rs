//! Resource fixtures shared by the integration tests.

use serde_json::{Value, json};

use super::TestBackend;

pub fn patient(id: &str, family: &str, given: &str, birth_date: &str, gender: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "id": id,
        "name": [{"family": family, "given": [given]}],
        "birthDate": birth_date,
        "gender": gender
    })
}

pub fn observation(id: &str, subject: &str, code: &str, value: f64) -> Value {
    json!({
        "resourceType": "Observation",
        "id": id,
        "status": "final",
        "code": {"coding": [{"system": "http://loinc.org", "code": code}]},
        "subject": {"reference": subject},
        "valueQuantity": {"value": value, "unit": "bpm"}
    })
}

/// Seeds three patients and two observations of the first one.
pub async fn seed(backend: &TestBackend) {
    backend
        .create(
            "Patient",
            patient("p1", "Chalmers", "Peter", "1974-12-25", "male"),
        )
        .await;
    backend
        .create(
            "Patient",
            patient("p2", "Windsor", "Anne", "1950-08-15", "female"),
        )
        .await;
    backend
        .create(
            "Patient",
            patient("p3", "Chalk", "Jim", "1990-03-01", "male"),
        )
        .await;
    backend
        .create("Observation", observation("o1", "Patient/p1", "8867-4", 72.0))
        .await;
    backend
        .create("Observation", observation("o2", "Patient/p1", "8310-5", 36.6))
        .await;
}
