use crate::errors::{DomainResult, DomainError, ValidationError};

/// A trait that entities should implement for validation.
pub trait Validate {
    /// Validates the entity and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

/// Struct for configuring validations in a fluent style
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self
    where
        T: Default + PartialEq,
    {
        if self.value.is_none() || self.value == Some(T::default()) {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    pub fn validate_with<F>(mut self, validator: F) -> Self
    where
        F: FnOnce(&T) -> Result<(), ValidationError>,
    {
        if let Some(value) = &self.value {
            if let Err(err) = validator(value) {
                self.errors.push(err);
            }
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            // Return the first error for simplicity
            Err(DomainError::Validation(self.errors[0].clone()))
        }
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where
    T: PartialOrd + Clone + std::fmt::Display,
{
    pub fn range(mut self, min: T, max: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min || value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    max.to_string(),
                ));
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_missing_and_default() {
        assert!(ValidationBuilder::<String>::new("name", None).required().validate().is_err());
        assert!(ValidationBuilder::new("name", Some(String::new())).required().validate().is_err());
        assert!(ValidationBuilder::new("name", Some("Home".to_string())).required().validate().is_ok());
    }

    #[test]
    fn test_range_bounds() {
        assert!(ValidationBuilder::new("latitude", Some(45.0)).range(-90.0, 90.0).validate().is_ok());
        assert!(ValidationBuilder::new("latitude", Some(90.5)).range(-90.0, 90.0).validate().is_err());
        assert!(ValidationBuilder::new("longitude", Some(-181.0)).range(-180.0, 180.0).validate().is_err());
    }
}
