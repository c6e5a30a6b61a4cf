//! Field-level validation issues reported back to callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One rejected field. `path` uses `field` or `[index].field` notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Collects issues while converting a loosely-typed request into domain input.
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue { path: path.into(), message: message.into() });
    }

    /// Required, non-empty string.
    pub fn required(&mut self, path: &str, value: Option<String>) -> Option<String> {
        match value {
            Some(v) if !v.is_empty() => Some(v),
            Some(_) => {
                self.push(path, "must not be empty");
                None
            },
            None => {
                self.push(path, "is required");
                None
            },
        }
    }

    /// Required value parsed from its string form.
    pub fn parse<T>(&mut self, path: &str, value: Option<String>) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.required(path, value)?;
        self.parse_present(path, &raw)
    }

    /// Optional value parsed from its string form; absent stays `None`.
    pub fn parse_optional<T>(&mut self, path: &str, value: Option<String>) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = value?;
        self.parse_present(path, &raw)
    }

    fn parse_present<T>(&mut self, path: &str, raw: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match raw.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                self.push(path, e.to_string());
                None
            },
        }
    }

    /// Required integer no smaller than `min`.
    pub fn at_least(&mut self, path: &str, value: Option<i64>, min: i64) -> Option<i64> {
        match value {
            Some(v) if v >= min => Some(v),
            Some(_) => {
                self.push(path, format!("must be >= {min}"));
                None
            },
            None => {
                self.push(path, "is required");
                None
            },
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// # Errors
    /// Returns every collected issue when any field was rejected.
    pub fn finish(self) -> Result<(), Vec<ValidationIssue>> {
        if self.issues.is_empty() { Ok(()) } else { Err(self.issues) }
    }

    /// Finish and hand back `value` when clean.
    ///
    /// # Errors
    /// Returns every collected issue when any field was rejected.
    pub fn finish_with<T>(
        self,
        value: impl FnOnce() -> Option<T>,
    ) -> Result<T, Vec<ValidationIssue>> {
        self.finish()?;
        value().ok_or_else(|| {
            vec![ValidationIssue { path: String::new(), message: "incomplete input".to_owned() }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Session;

    #[test]
    fn collects_every_issue() {
        let mut v = Validator::new();
        assert_eq!(v.required("id", Some(String::new())), None);
        assert_eq!(v.parse::<Session>("session", Some("s9".to_owned())), None);
        assert_eq!(v.at_least("taskIndex", Some(-1), 0), None);
        let issues = v.finish().unwrap_err();
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].path, "id");
        assert_eq!(issues[1].path, "session");
        assert!(issues[1].message.contains("s9"));
        assert_eq!(issues[2].message, "must be >= 0");
    }

    #[test]
    fn optional_absent_is_clean() {
        let mut v = Validator::new();
        assert_eq!(v.parse_optional::<Session>("session", None), None);
        assert!(v.is_clean());
        assert_eq!(v.finish_with(|| Some(7)), Ok(7));
    }
}
