//! Client-side field checks run on blur. Failures only flag the field.

use regex::Regex;
use std::sync::OnceLock;

use crate::forms::settings::{NumberSettings, PasswordSettings};

const STEP_TOLERANCE: f64 = 1e-9;

static EMAIL: OnceLock<Regex> = OnceLock::new();
static SYMBOL: OnceLock<Regex> = OnceLock::new();
static DIGIT: OnceLock<Regex> = OnceLock::new();

fn email_pattern() -> &'static Regex {
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn symbol_pattern() -> &'static Regex {
    SYMBOL.get_or_init(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("valid symbol regex"))
}

fn digit_pattern() -> &'static Regex {
    DIGIT.get_or_init(|| Regex::new(r"[0-9]").expect("valid digit regex"))
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value)
}

/// Check a password against the element's policy. Length counts characters.
pub fn meets_password_policy(value: &str, policy: &PasswordSettings) -> bool {
    if let Some(min) = policy.min_length {
        if value.chars().count() < min as usize {
            return false;
        }
    }
    if policy.require_symbols && !symbol_pattern().is_match(value) {
        return false;
    }
    if policy.require_numbers && !digit_pattern().is_match(value) {
        return false;
    }
    true
}

/// A finite number within `min`/`max` that lands on a `step` boundary
/// counted from `min` (or zero when there is no minimum).
pub fn is_valid_number(value: &str, settings: &NumberSettings) -> bool {
    let n = match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => return false,
    };
    if settings.min.is_some_and(|min| n < min) || settings.max.is_some_and(|max| n > max) {
        return false;
    }
    match settings.step.filter(|step| *step > 0.0) {
        Some(step) => {
            let steps = (n - settings.min.unwrap_or(0.0)) / step;
            (steps - steps.round()).abs() <= STEP_TOLERANCE * steps.abs().max(1.0)
        }
        None => true,
    }
}

/// Human-readable policy lines shown under a password field.
pub fn password_requirements(policy: &PasswordSettings) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(min) = policy.min_length.filter(|n| *n > 0) {
        lines.push(format!("Requires Minimum Length: {}", min));
    }
    if policy.require_symbols {
        lines.push("Requires Symbols: Yes".to_string());
    }
    if policy.require_numbers {
        lines.push("Requires Numbers: Yes".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(min: Option<u32>, symbols: bool, numbers: bool) -> PasswordSettings {
        PasswordSettings {
            placeholder: String::new(),
            show_password_option: false,
            min_length: min,
            require_symbols: symbols,
            require_numbers: numbers,
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("analyst@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("analyst@example"));
        assert!(!is_valid_email("ana lyst@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn password_rules() {
        let p = policy(Some(8), true, true);
        assert!(meets_password_policy("s3cret!pw", &p));
        assert!(!meets_password_policy("s3cret!", &p));
        assert!(!meets_password_policy("secretpw!", &p));
        assert!(!meets_password_policy("s3cretpwd", &p));
        assert!(meets_password_policy("", &policy(None, false, false)));
    }

    #[test]
    fn number_bounds_and_step() {
        let settings = NumberSettings {
            min: Some(1.0),
            max: Some(10.0),
            step: Some(0.5),
            default_value: None,
        };
        assert!(is_valid_number("1", &settings));
        assert!(is_valid_number(" 2.5 ", &settings));
        assert!(is_valid_number("10", &settings));
        assert!(!is_valid_number("2.25", &settings));
        assert!(!is_valid_number("0.5", &settings));
        assert!(!is_valid_number("10.5", &settings));
        assert!(!is_valid_number("abc", &settings));
        assert!(!is_valid_number("NaN", &settings));
        assert!(is_valid_number("-3.7", &NumberSettings::default()));
        let tenths = NumberSettings {
            step: Some(0.1),
            ..NumberSettings::default()
        };
        assert!(is_valid_number("0.3", &tenths));
    }

    #[test]
    fn requirement_lines() {
        assert_eq!(
            password_requirements(&policy(Some(12), false, true)),
            vec!["Requires Minimum Length: 12", "Requires Numbers: Yes"]
        );
        assert!(password_requirements(&policy(Some(0), false, false)).is_empty());
    }
}
