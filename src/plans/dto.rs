use serde::{Deserialize, Serialize};

/// Request body as sent by the frontend; every field is checked in
/// `services::validate` so absent values produce a 400, not a decode error.
#[derive(Debug, Default, Deserialize)]
pub struct MealPlanRequest {
    pub calories: Option<f64>,
    pub foods: Option<Vec<String>>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlanRequest {
    pub calories: f64,
    pub foods: Vec<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealPlanResponse {
    pub plan: String,
}
