use super::error::{AppError, AppResult};

/// Required text fields are trimmed and must not end up empty.
pub fn require_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Optional text fields are trimmed; blank values are dropped.
pub fn trim_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn require_amount(amount: f64) -> AppResult<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::BadRequest(
            "Amount must be a non-negative number".to_string(),
        ));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(require_text("title", "  Lisbon  ").unwrap(), "Lisbon");
        assert!(require_text("title", "   ").is_err());
    }

    #[test]
    fn blank_optional_text_is_dropped() {
        assert_eq!(trim_optional(Some("  ")), None);
        assert_eq!(trim_optional(Some(" beach ")), Some("beach".to_string()));
        assert_eq!(trim_optional(None), None);
    }

    #[test]
    fn amounts_must_be_finite_and_non_negative() {
        assert_eq!(require_amount(0.0).unwrap(), 0.0);
        assert!(require_amount(-1.0).is_err());
        assert!(require_amount(f64::NAN).is_err());
        assert!(require_amount(f64::INFINITY).is_err());
    }
}
