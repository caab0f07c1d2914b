//! Daily count observations and their text loader
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::misc::vec_to_string;
use std::fmt;

/// An ordered series of non-negative daily counts, one per day.
///
/// The series is immutable once built. Validity for inference (non-empty, at
/// least two days, nonzero mean) is checked when a
/// [`ChangepointModel`](crate::model::ChangepointModel) is built from it.
///
/// # Example
///
/// ```
/// use switchpoint::data::ObservationSeries;
///
/// let series = ObservationSeries::new(vec![13, 24, 8, 24]);
/// assert_eq!(series.len(), 4);
/// assert_eq!(series.total(), 69);
/// assert_eq!(series.mean(), Some(17.25));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct ObservationSeries {
    counts: Vec<u32>,
}

impl ObservationSeries {
    pub fn new(counts: Vec<u32>) -> Self {
        ObservationSeries { counts }
    }

    /// Parse a series from text, one or more counts per line.
    ///
    /// Records may be separated by newlines, commas, or whitespace. Blank
    /// lines and anything after a `#` are ignored. Malformed records are
    /// validated out and reported in [`LoadReport::rejected`]; they never
    /// reach the series.
    ///
    /// # Example
    ///
    /// ```
    /// use switchpoint::data::ObservationSeries;
    ///
    /// let text = "1.300000000000000000e+01\n24\n# header\nfoo\n-3\n8, 2\n";
    /// let report = ObservationSeries::from_text(text);
    ///
    /// assert_eq!(report.series.counts(), &[13, 24, 8, 2]);
    /// assert_eq!(report.rejected.len(), 2);
    /// assert_eq!(report.rejected[0].line, 4);
    /// ```
    pub fn from_text(text: &str) -> LoadReport {
        let mut counts = Vec::new();
        let mut rejected = Vec::new();

        for (ix, line) in text.lines().enumerate() {
            let content = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            content
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|field| !field.is_empty())
                .for_each(|field| match parse_record(field) {
                    Ok(x) => counts.push(x),
                    Err(error) => {
                        tracing::warn!(line = ix + 1, %error, "skipping record");
                        rejected.push(RejectedRecord {
                            line: ix + 1,
                            error,
                        });
                    }
                });
        }

        LoadReport {
            series: ObservationSeries::new(counts),
            rejected,
        }
    }

    /// Number of days, N
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The counts in day order
    #[inline]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&x| u64::from(x)).sum()
    }

    /// Mean daily count, `None` for an empty series
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.total() as f64 / self.len() as f64)
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, u32> {
        self.counts.iter()
    }
}

impl From<Vec<u32>> for ObservationSeries {
    fn from(counts: Vec<u32>) -> Self {
        ObservationSeries::new(counts)
    }
}

impl FromIterator<u32> for ObservationSeries {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        ObservationSeries::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ObservationSeries {
    type Item = &'a u32;
    type IntoIter = std::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ObservationSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObservationSeries(n: {}, counts: {})",
            self.len(),
            vec_to_string(&self.counts, 10)
        )
    }
}

/// The outcome of loading a series from text
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// The well-formed counts, in order
    pub series: ObservationSeries,
    /// Records that failed validation
    pub rejected: Vec<RejectedRecord>,
}

/// A record that failed validation, with its 1-based line number
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub line: usize,
    pub error: RecordError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The record is not a number
    NotANumber { text: String },
    /// The record is infinite or NaN
    NotFinite { text: String },
    /// The record is less than zero
    Negative { value: f64 },
    /// The record has a fractional part
    NotIntegral { value: f64 },
    /// The record does not fit in a `u32`
    TooLarge { value: f64 },
}

/// Validate a single count record.
///
/// Integral floating-point text (`"1.3e+01"`, `"7.0"`) is accepted because
/// count files are often written by numeric tools in float format.
///
/// # Example
///
/// ```
/// use switchpoint::data::{parse_record, RecordError};
///
/// assert_eq!(parse_record("42"), Ok(42));
/// assert_eq!(parse_record(" 7.0 "), Ok(7));
/// assert_eq!(parse_record("2.5"), Err(RecordError::NotIntegral { value: 2.5 }));
/// assert!(parse_record("abc").is_err());
/// ```
pub fn parse_record(text: &str) -> Result<u32, RecordError> {
    let text = text.trim();
    if let Ok(x) = text.parse::<u32>() {
        return Ok(x);
    }

    let value = text.parse::<f64>().map_err(|_| RecordError::NotANumber {
        text: text.to_owned(),
    })?;

    if !value.is_finite() {
        Err(RecordError::NotFinite {
            text: text.to_owned(),
        })
    } else if value < 0.0 {
        Err(RecordError::Negative { value })
    } else if value.fract() != 0.0 {
        Err(RecordError::NotIntegral { value })
    } else if value > f64::from(u32::MAX) {
        Err(RecordError::TooLarge { value })
    } else {
        Ok(value as u32)
    }
}

impl std::error::Error for RecordError {}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber { text } => {
                write!(f, "'{}' is not a number", text)
            }
            Self::NotFinite { text } => {
                write!(f, "'{}' is not a finite number", text)
            }
            Self::Negative { value } => {
                write!(f, "count ({}) is negative", value)
            }
            Self::NotIntegral { value } => {
                write!(f, "count ({}) is not a whole number", value)
            }
            Self::TooLarge { value } => {
                write!(f, "count ({}) is too large", value)
            }
        }
    }
}
