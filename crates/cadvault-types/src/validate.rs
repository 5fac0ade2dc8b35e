//! Custom field validators used by the `validator` derives in this crate.

use std::borrow::Cow;

use validator::ValidationError;

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::Borrowed("must not be empty"));
        return Err(err);
    }
    Ok(())
}

/// Accepts `#rrggbb` (case-insensitive).
pub fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    let ok = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("hex_color");
        err.message = Some(Cow::Borrowed("must be a #rrggbb hex colour"));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert!(validate_hex_color("#DC2626").is_ok());
        assert!(validate_hex_color("#6b7280").is_ok());
        assert!(validate_hex_color("DC2626").is_err());
        assert!(validate_hex_color("#DC26").is_err());
        assert!(validate_hex_color("#GG0000").is_err());
    }

    #[test]
    fn blank_strings() {
        assert!(validate_not_blank("x").is_ok());
        assert!(validate_not_blank(" \t").is_err());
    }
}
