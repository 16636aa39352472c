use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{MealPlanRequest, ValidatedPlanRequest};
use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate(req: MealPlanRequest) -> Result<ValidatedPlanRequest, AppError> {
    let calories = req
        .calories
        .filter(|c| c.is_finite() && *c > 0.0)
        .ok_or(AppError::MissingInput)?;

    let foods: Vec<String> = req
        .foods
        .unwrap_or_default()
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    if foods.is_empty() {
        return Err(AppError::MissingInput);
    }

    let email = match req.email.map(|e| e.trim().to_lowercase()) {
        Some(e) if e.is_empty() => None,
        Some(e) if !is_valid_email(&e) => return Err(AppError::InvalidEmail),
        other => other,
    };

    Ok(ValidatedPlanRequest {
        calories,
        foods,
        email,
    })
}

/// Renders the user prompt. Pure formatting; the reply is never parsed.
pub fn build_prompt(calories: f64, foods: &[String]) -> String {
    format!(
        "Create a 1-day high-protein fat loss meal plan for around {calories} calories \
using only these foods: {foods}.\n\
Ensure at least 30% of calories come from protein and do not exceed {calories} calories in total.\n\
Structure the plan as Breakfast, Lunch, Dinner and Snacks. \
For each meal list the foods with portions, its calories and its grams of protein.\n\
Finish with the daily total calories and total protein.",
        foods = foods.join(", "),
    )
}
