//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The scroll depth percentage was out of range.
    #[error("scroll depth must be between 0 and 100, got {value}")]
    ScrollDepthOutOfRange { value: f64 },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated module name.
    ///
    /// Module names must be non-empty strings. They are unique per page
    /// instance and never change after the module is mounted.
    ModuleName, "module name"
);

define_string_id!(
    /// A validated visitor identifier.
    ///
    /// Visitor IDs must be non-empty strings. They are supplied by the
    /// host page (e.g. resolved from an enquiry record) and identify who
    /// the tracked session belongs to.
    VisitorId, "visitor ID"
);

define_string_id!(
    /// A validated session identifier.
    ///
    /// Session IDs must be non-empty strings. They are assigned by the
    /// backend when a session is started.
    SessionId, "session ID"
);

/// A scroll depth percentage in the range \[0, 100\].
///
/// Tracks how much of a module's content has been exposed in the viewport.
/// Values are clamped during deserialization to ensure they stay within
/// bounds, and [`ScrollDepth::observe`] only ever moves the value upward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScrollDepth(u8);

impl ScrollDepth {
    /// The maximum depth (fully exposed at some instant).
    pub const MAX: Self = Self(100);

    /// Creates a new depth after validation.
    ///
    /// Returns an error if the value is outside \[0, 100\] or is NaN.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value.is_nan() || !(0.0..=100.0).contains(&value) {
            return Err(ValidationError::ScrollDepthOutOfRange { value });
        }
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "value verified to be in [0, 100] above"
        )]
        let rounded = value.round() as u8;
        Ok(Self(rounded))
    }

    /// Creates a depth from a fraction in \[0.0, 1.0\], clamping out-of-range
    /// input. NaN becomes 0.
    #[must_use]
    pub fn from_fraction(fraction: f64) -> Self {
        let percent = fraction * 100.0;
        if percent.is_nan() || percent < 0.0 {
            return Self(0);
        }
        if percent > 100.0 {
            return Self(100);
        }
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "percent verified to be in [0, 100] above"
        )]
        let rounded = percent.round() as u8;
        Self(rounded)
    }

    /// Records a new sample, keeping the running maximum.
    pub fn observe(&mut self, sample: Self) {
        if sample.0 > self.0 {
            self.0 = sample.0;
        }
    }

    /// Returns the depth as a whole percentage.
    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ScrollDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Serialize for ScrollDepth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScrollDepth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        // Clamp on deserialization to be lenient with external data
        Ok(Self::from_fraction(value / 100.0))
    }
}
