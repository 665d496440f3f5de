//! Five-field cron grammar shared by the UI preview and the config write path.
//!
//! Grammar per field: comma-separated atoms, each `base` or `base/step`, where
//! `base` is `*`, an integer, a month/weekday alias, or an inclusive `lo-hi`
//! range of those. The expression is accepted verbatim; nothing here rewrites
//! what the operator typed.

mod describe;
mod field;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

pub use self::describe::describe;
pub use self::field::CronField;

/// First violation found in a cron expression, scanning fields left to right
/// and atoms left to right within a field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CronError {
    #[error("Cron must have exactly 5 fields (minute hour day-of-month month day-of-week), got {0}")]
    FieldCount(usize),

    #[error("Cron contains control character {0:?}; separate fields with spaces or tabs")]
    ControlCharacter(char),

    #[error("Empty entry in {field} field")]
    EmptyAtom { field: CronField },

    #[error("Invalid {field} value '{value}'")]
    InvalidValue { field: CronField, value: String },

    #[error("{field} value {value} out of range {min}-{max}")]
    OutOfRange {
        field: CronField,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("Invalid {field} range '{range}': start is after end")]
    InvertedRange { field: CronField, range: String },

    #[error("Invalid {field} step '{step}': must be an integer from 1 to {max}")]
    InvalidStep {
        field: CronField,
        step: String,
        max: u32,
    },
}

impl CronError {
    /// The field the violation was found in, if it concerns a single field.
    pub fn field(&self) -> Option<CronField> {
        match self {
            Self::FieldCount(_) | Self::ControlCharacter(_) => None,
            Self::EmptyAtom { field }
            | Self::InvalidValue { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::InvertedRange { field, .. }
            | Self::InvalidStep { field, .. } => Some(*field),
        }
    }
}

/// Accept or reject a 5-field cron expression.
pub fn validate_cron(expr: &str) -> Result<(), CronError> {
    CronExpression::parse(expr).map(|_| ())
}

/// Left-hand side of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Base {
    Any,
    Value(u32),
    Range(u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Atom {
    pub base: Base,
    pub step: Option<u32>,
}

/// One parsed field, keeping the operator's original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    field: CronField,
    raw: String,
    atoms: Vec<Atom>,
}

impl FieldSpec {
    fn parse(field: CronField, raw: &str) -> Result<Self, CronError> {
        let atoms = raw
            .split(',')
            .map(|text| parse_atom(field, text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            field,
            raw: raw.to_string(),
            atoms,
        })
    }

    pub fn field(&self) -> CronField {
        self.field
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `*` with no step.
    pub fn is_wildcard(&self) -> bool {
        matches!(
            self.atoms.as_slice(),
            [Atom {
                base: Base::Any,
                step: None
            }]
        )
    }

    /// `N` for a lone `*/N` atom.
    pub fn every_step(&self) -> Option<u32> {
        match self.atoms.as_slice() {
            [Atom {
                base: Base::Any,
                step: Some(n),
            }] => Some(*n),
            _ => None,
        }
    }

    /// The value of a lone plain integer/alias atom.
    pub fn single_value(&self) -> Option<u32> {
        match self.atoms.as_slice() {
            [Atom {
                base: Base::Value(v),
                step: None,
            }] => Some(*v),
            _ => None,
        }
    }

    /// Every value this field matches. Day-of-week 7 folds into 0 (Sunday).
    pub fn values(&self) -> BTreeSet<u32> {
        let (_, max) = self.field.bounds();
        let mut out = BTreeSet::new();
        for atom in &self.atoms {
            let (lo, hi) = match (atom.base, atom.step) {
                (Base::Any, _) => self.field.bounds(),
                (Base::Value(v), None) => (v, v),
                // `5/15` means "from 5 to the end of the field, every 15"
                (Base::Value(v), Some(_)) => (v, max),
                (Base::Range(lo, hi), _) => (lo, hi),
            };
            let step = atom.step.unwrap_or(1) as usize;
            for v in (lo..=hi).step_by(step) {
                out.insert(self.field.normalize(v));
            }
        }
        out
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A validated cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    raw: String,
    fields: [FieldSpec; 5],
}

impl CronExpression {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        // The expression is written verbatim into a single job-table line.
        if let Some(c) = expr.chars().find(|c| c.is_control() && *c != '\t') {
            return Err(CronError::ControlCharacter(c));
        }
        let parts: Vec<&str> = expr
            .split([' ', '\t'])
            .filter(|part| !part.is_empty())
            .collect();
        if parts.len() != 5 {
            return Err(CronError::FieldCount(parts.len()));
        }
        let fields = [
            FieldSpec::parse(CronField::Minute, parts[0])?,
            FieldSpec::parse(CronField::Hour, parts[1])?,
            FieldSpec::parse(CronField::DayOfMonth, parts[2])?,
            FieldSpec::parse(CronField::Month, parts[3])?,
            FieldSpec::parse(CronField::DayOfWeek, parts[4])?,
        ];
        Ok(Self {
            raw: expr.to_string(),
            fields,
        })
    }

    /// The expression exactly as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn field(&self, field: CronField) -> &FieldSpec {
        &self.fields[field.index()]
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for CronExpression {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_atom(field: CronField, text: &str) -> Result<Atom, CronError> {
    if text.is_empty() {
        return Err(CronError::EmptyAtom { field });
    }

    let (base_text, step_text) = match text.split_once('/') {
        Some((b, s)) => (b, Some(s)),
        None => (text, None),
    };

    let base = parse_base(field, base_text)?;

    let step = match step_text {
        None => None,
        Some(s) => {
            let span = field.span();
            match s.parse::<u32>() {
                Ok(n) if (1..=span).contains(&n) => Some(n),
                _ => {
                    return Err(CronError::InvalidStep {
                        field,
                        step: s.to_string(),
                        max: span,
                    })
                }
            }
        }
    };

    Ok(Atom { base, step })
}

fn parse_base(field: CronField, text: &str) -> Result<Base, CronError> {
    if text == "*" {
        return Ok(Base::Any);
    }
    match text.split_once('-') {
        Some((lo_text, hi_text)) => {
            let lo = resolve_value(field, lo_text)?;
            let hi = resolve_value(field, hi_text)?;
            if lo > hi {
                return Err(CronError::InvertedRange {
                    field,
                    range: text.to_string(),
                });
            }
            Ok(Base::Range(lo, hi))
        }
        None => resolve_value(field, text).map(Base::Value),
    }
}

fn resolve_value(field: CronField, text: &str) -> Result<u32, CronError> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let value: u32 = text.parse().map_err(|_| CronError::InvalidValue {
            field,
            value: text.to_string(),
        })?;
        let (min, max) = field.bounds();
        if value < min || value > max {
            return Err(CronError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
        return Ok(value);
    }
    field.alias(text).ok_or_else(|| CronError::InvalidValue {
        field,
        value: text.to_string(),
    })
}
