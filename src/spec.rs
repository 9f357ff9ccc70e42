use crate::{parse_instant, Instant, RepeatMode, Result, ValidationError};
use serde::{Deserialize, Serialize};

/// A validated recurrence: repeat every `units` `mode` from `start` until
/// `end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecurrenceSpec {
    start: Instant,
    end: Instant,
    units: u32,
    mode: RepeatMode,
}

impl RecurrenceSpec {
    /// An `end` before `start` is allowed and simply expands to nothing.
    pub fn new(
        start: Instant,
        end: Instant,
        units: u32,
        mode: RepeatMode,
    ) -> std::result::Result<Self, ValidationError> {
        if units == 0 {
            return Err(ValidationError::ZeroUnits);
        }

        Ok(RecurrenceSpec {
            start,
            end,
            units,
            mode,
        })
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    pub fn mode(&self) -> RepeatMode {
        self.mode
    }
}

/// Raw values posted from the publish form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldInput {
    pub start: Option<String>,
    pub end: Option<String>,
    pub units: Option<i64>,
    pub mode: Option<String>,
}

impl FieldInput {
    pub fn new(start: &str, end: &str, units: i64, mode: RepeatMode) -> Self {
        FieldInput {
            start: Some(start.to_owned()),
            end: Some(end.to_owned()),
            units: Some(units),
            mode: Some(mode.to_string()),
        }
    }

    /// Checks the dates and the repeat count, reporting the first problem
    /// found against the field's `label`.
    pub fn check(&self, label: &str) -> std::result::Result<(), ValidationError> {
        self.validated(label).map(|_| ())
    }

    /// Validates the input and resolves the repeat mode.
    ///
    /// Validation problems are reported before an unknown mode.
    pub fn into_spec(self, label: &str) -> Result<RecurrenceSpec> {
        let (start, end, units) = self.validated(label)?;
        let mode = match self.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => RepeatMode::default(),
        };

        Ok(RecurrenceSpec {
            start,
            end,
            units,
            mode,
        })
    }

    fn validated(&self, label: &str) -> std::result::Result<(Instant, Instant, u32), ValidationError> {
        let start = self
            .start
            .as_deref()
            .and_then(parse_instant)
            .ok_or_else(|| ValidationError::InvalidStart {
                label: label.to_owned(),
            })?;
        let end = self
            .end
            .as_deref()
            .and_then(parse_instant)
            .ok_or_else(|| ValidationError::InvalidEnd {
                label: label.to_owned(),
            })?;

        let raw_units = self.units.unwrap_or(1);
        let units = u32::try_from(raw_units)
            .ok()
            .filter(|units| *units >= 1)
            .ok_or_else(|| ValidationError::InvalidUnits {
                label: label.to_owned(),
                units: raw_units,
            })?;

        Ok((start, end, units))
    }
}
