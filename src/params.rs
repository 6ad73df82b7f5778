use std::fmt;

use crate::store::{Limit, RangeQuery};

pub(crate) const ALKU: &str = "alku";
pub(crate) const LOPPU: &str = "loppu";
pub(crate) const LIMITTI: &str = "limitti";

/// How request fields that are not well-formed integers are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ParamPolicy {
    /// Missing or non-numeric fields silently become `0`, and the range and limit
    /// are passed to the store unchecked.
    #[default]
    Permissive,
    /// Every field must be present and an integer, the range must not be
    /// inverted, and the limit must not be negative.
    Strict,
}

/// The three integers a range query is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct QueryParameters {
    /// Inclusive lower bound on `timestamp` (`alku`).
    pub(crate) start: i64,
    /// Inclusive upper bound on `timestamp` (`loppu`).
    pub(crate) end: i64,
    /// Maximum number of records (`limitti`); `0` means unlimited.
    pub(crate) limit: i64,
}

impl QueryParameters {
    /// Extracts the parameters from decoded form fields.
    ///
    /// When a field is given more than once, the last occurrence wins.
    pub(crate) fn from_fields(
        fields: &[(String, String)],
        policy: ParamPolicy,
    ) -> Result<Self, ParamError> {
        let field = |name: &str| {
            fields
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        match policy {
            ParamPolicy::Permissive => Ok(Self {
                start: field(ALKU).map(intval).unwrap_or(0),
                end: field(LOPPU).map(intval).unwrap_or(0),
                limit: field(LIMITTI).map(intval).unwrap_or(0),
            }),
            ParamPolicy::Strict => {
                let strict = |name: &'static str| -> Result<i64, ParamError> {
                    let value = field(name).ok_or(ParamError::Missing(name))?;
                    value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| ParamError::NotAnInteger {
                            field: name,
                            value: value.into(),
                        })
                };

                let params = Self {
                    start: strict(ALKU)?,
                    end: strict(LOPPU)?,
                    limit: strict(LIMITTI)?,
                };

                if params.start > params.end {
                    Err(ParamError::InvertedRange {
                        start: params.start,
                        end: params.end,
                    })
                } else if params.limit < 0 {
                    Err(ParamError::NegativeLimit(params.limit))
                } else {
                    Ok(params)
                }
            }
        }
    }

    pub(crate) fn range_query(&self) -> RangeQuery {
        RangeQuery {
            start: self.start,
            end: self.end,
            limit: Limit::from_request(self.limit),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ParamError {
    Missing(&'static str),
    NotAnInteger { field: &'static str, value: String },
    InvertedRange { start: i64, end: i64 },
    NegativeLimit(i64),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Missing(field) => write!(f, "Missing field `{field}`"),
            ParamError::NotAnInteger { field, value } => {
                write!(f, "Field `{field}` is not an integer: {value:?}")
            }
            ParamError::InvertedRange { start, end } => {
                write!(f, "Range start {start} is after range end {end}")
            }
            ParamError::NegativeLimit(limit) => write!(f, "Limit {limit} is negative"),
        }
    }
}

/// Casts arbitrary text to an integer the way loosely-typed web runtimes do.
///
/// Leading whitespace is skipped and the longest numeric prefix is read; anything
/// after it is ignored. A prefix with a fraction or exponent is read as a float and
/// truncated toward zero. Values outside the `i64` range saturate, except that a
/// float prefix overflowing to infinity is `0`. Text with no numeric prefix is `0`.
pub(crate) fn intval(input: &str) -> i64 {
    let s = input.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_start = end;
    end = digits_from(end);
    let mut has_digits = end > int_start;
    let mut is_float = false;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            is_float = true;
            end = frac_end;
        }
    }

    if !has_digits {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let exp_digits = end + 1 + usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(exp_digits);
        if exp_end > exp_digits {
            is_float = true;
            end = exp_end;
        }
    }

    let number = &s[..end];
    if is_float {
        // `as` saturates at the integer bounds; a prefix too large to be finite is 0.
        number
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map_or(0, |f| f as i64)
    } else {
        number.parse::<i64>().unwrap_or(if number.starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        })
    }
}
