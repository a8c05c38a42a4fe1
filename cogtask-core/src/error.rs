#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field}: range {min}..={max} is inverted")]
    InvertedRange {
        field: &'static str,
        min: u64,
        max: u64,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn ensure_range(field: &'static str, (min, max): (u64, u64)) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange { field, min, max });
    }
    Ok(())
}

pub fn ensure_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    Ok(())
}

pub fn ensure_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfUnitRange { field, value });
    }
    Ok(())
}

pub fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value >= 0.0) {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}
