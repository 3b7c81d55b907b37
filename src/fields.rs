//! Positional row access shared by the RAW and MATPOWER decoders.
//!
//! A [`Row`] owns the trimmed, unquoted fields of one record. Typed getters
//! return a [`RowError`] instead of panicking, so a decoder can bail out of a
//! malformed row with `?` and let the section loop skip it.

use thiserror::Error;

/// Why a row was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("field {index} ({column}) has unusable value '{value}'")]
    BadField {
        column: &'static str,
        index: usize,
        value: String,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Strip whitespace and surrounding quote characters.
pub fn clean(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '\'' || c == '"').trim()
}

/// Whether the field parses as a number. Used for layout probing.
pub fn is_numeric(s: &str) -> bool {
    clean(s).parse::<f64>().is_ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    /// Comma-separated record (PSS/E RAW).
    pub fn from_csv(line: &str) -> Self {
        Self {
            fields: line.split(',').map(|f| clean(f).to_string()).collect(),
        }
    }

    /// Pre-tokenized record (MATPOWER).
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self {
            fields: tokens.iter().map(|t| clean(t.as_ref()).to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Fails unless the row carries at least `expected` fields.
    pub fn require(&self, expected: usize) -> Result<(), RowError> {
        if self.fields.len() < expected {
            return Err(RowError::TooFewFields {
                expected,
                found: self.fields.len(),
            });
        }
        Ok(())
    }

    fn required(&self, index: usize) -> Result<&str, RowError> {
        self.get(index).ok_or(RowError::TooFewFields {
            expected: index + 1,
            found: self.fields.len(),
        })
    }

    pub fn float(&self, index: usize, column: &'static str) -> Result<f64, RowError> {
        let value = self.required(index)?;
        parse_float(value).ok_or_else(|| bad(column, index, value))
    }

    /// Absent or empty columns take `default`; a present but garbled one is an error.
    pub fn float_or(&self, index: usize, column: &'static str, default: f64) -> Result<f64, RowError> {
        match self.get(index) {
            None | Some("") => Ok(default),
            Some(value) => parse_float(value).ok_or_else(|| bad(column, index, value)),
        }
    }

    /// Integer column. Integral float spellings such as `1.0` are accepted.
    pub fn int(&self, index: usize, column: &'static str) -> Result<i64, RowError> {
        let value = self.required(index)?;
        parse_int(value).ok_or_else(|| bad(column, index, value))
    }

    pub fn int_or(&self, index: usize, column: &'static str, default: i64) -> Result<i64, RowError> {
        match self.get(index) {
            None | Some("") => Ok(default),
            Some(value) => parse_int(value).ok_or_else(|| bad(column, index, value)),
        }
    }

    /// Bus number column: a positive integer.
    pub fn bus(&self, index: usize, column: &'static str) -> Result<usize, RowError> {
        let value = self.required(index)?;
        match parse_int(value) {
            Some(id) if id > 0 => Ok(id as usize),
            _ => Err(bad(column, index, value)),
        }
    }

    /// Text column, `None` when absent or blank.
    pub fn text(&self, index: usize) -> Option<String> {
        self.get(index)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn text_or(&self, index: usize, default: &str) -> String {
        self.text(index).unwrap_or_else(|| default.to_string())
    }
}

fn bad(column: &'static str, index: usize, value: &str) -> RowError {
    RowError::BadField {
        column,
        index,
        value: value.to_string(),
    }
}

fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_int(value: &str) -> Option<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    let v = parse_float(value)?;
    if v.fract() != 0.0 || v < i64::MIN as f64 || v > i64::MAX as f64 {
        return None;
    }
    Some(v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_quotes() {
        assert_eq!(clean("  'BUS 1   '  "), "BUS 1");
        assert_eq!(clean("\"1 \""), "1");
        assert_eq!(clean("  42 "), "42");
    }

    #[test]
    fn test_csv_row_access() {
        let row = Row::from_csv("1,'HV BUS', 138.0, 3");
        assert_eq!(row.len(), 4);
        assert_eq!(row.bus(0, "I").unwrap(), 1);
        assert_eq!(row.text(1).as_deref(), Some("HV BUS"));
        assert_eq!(row.float(2, "BASKV").unwrap(), 138.0);
        assert_eq!(row.int(3, "IDE").unwrap(), 3);
    }

    #[test]
    fn test_integral_float_accepted_as_int() {
        let row = Row::from_tokens(&["1.0", "2.5", "-3"]);
        assert_eq!(row.int(0, "a").unwrap(), 1);
        assert!(matches!(row.int(1, "b"), Err(RowError::BadField { index: 1, .. })));
        assert_eq!(row.int(2, "c").unwrap(), -3);
    }

    #[test]
    fn test_missing_field_reports_count() {
        let row = Row::from_csv("1,2");
        assert_eq!(
            row.float(4, "X"),
            Err(RowError::TooFewFields {
                expected: 5,
                found: 2
            })
        );
        assert_eq!(
            row.require(3),
            Err(RowError::TooFewFields {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_defaults_only_cover_absent_fields() {
        let row = Row::from_csv("1,,abc");
        assert_eq!(row.float_or(1, "B", 0.5).unwrap(), 0.5);
        assert_eq!(row.float_or(7, "B", 0.5).unwrap(), 0.5);
        assert!(row.float_or(2, "B", 0.5).is_err());
        assert_eq!(row.int_or(9, "ST", 1).unwrap(), 1);
    }

    #[test]
    fn test_bus_must_be_positive() {
        let row = Row::from_csv("0,-4,x");
        assert!(row.bus(0, "I").is_err());
        assert!(row.bus(1, "I").is_err());
        assert!(row.bus(2, "I").is_err());
    }

    #[test]
    fn test_is_numeric_probe() {
        assert!(is_numeric(" 250.0"));
        assert!(is_numeric("1.2E-3"));
        assert!(!is_numeric("'LINE 1-2'"));
        assert!(!is_numeric(""));
    }
}
