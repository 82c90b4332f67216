//! Input normalization: raw JSON input to a rectangular feature matrix.
//!
//! Two shapes are accepted: a flat array of numbers (one instance) or an
//! array of arrays of numbers (a batch). Numeric strings are coerced. Every
//! other shape is rejected with `MalformedInput`.

use crate::error::PipelineError;
use ndarray::Array2;
use serde_json::Value;

/// Rectangular numeric table, one row per instance
pub type FeatureMatrix = Array2<f64>;

/// Convert a single instance or a batch of instances into a feature matrix.
pub fn normalize(input: &Value) -> Result<FeatureMatrix, PipelineError> {
    let items = match input {
        Value::Array(items) => items,
        other => {
            return Err(PipelineError::malformed(format!(
                "input must be a list of numbers or a list of lists of numbers, got {}",
                type_name(other)
            )))
        }
    };

    if items.is_empty() {
        return Err(PipelineError::malformed("input contains no values"));
    }

    if !items.iter().any(Value::is_array) {
        let row = coerce_row(items, None)?;
        let width = row.len();
        return to_matrix(1, width, row);
    }

    let mut width = None;
    let mut data = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let Value::Array(row) = item else {
            return Err(PipelineError::malformed(
                "input mixes numbers and lists; expected one instance or a batch of instances",
            ));
        };
        if row.is_empty() {
            return Err(PipelineError::malformed(format!("row {} is empty", i)));
        }
        if row.iter().any(Value::is_array) {
            return Err(PipelineError::malformed(
                "input must be one or two dimensional",
            ));
        }
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(PipelineError::malformed(format!(
                    "rows have different lengths: row 0 has {} values, row {} has {}",
                    w,
                    i,
                    row.len()
                )))
            }
            Some(_) => {}
        }
        data.extend(coerce_row(row, Some(i))?);
    }

    to_matrix(items.len(), width.unwrap_or(0), data)
}

fn to_matrix(rows: usize, cols: usize, data: Vec<f64>) -> Result<FeatureMatrix, PipelineError> {
    Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| PipelineError::malformed(format!("input is not rectangular: {}", e)))
}

fn coerce_row(values: &[Value], row: Option<usize>) -> Result<Vec<f64>, PipelineError> {
    values
        .iter()
        .enumerate()
        .map(|(col, value)| {
            coerce_number(value).ok_or_else(|| {
                let position = match row {
                    Some(r) => format!("row {}, column {}", r, col),
                    None => format!("position {}", col),
                };
                PipelineError::malformed(format!(
                    "value at {} is not a finite number: {}",
                    position, value
                ))
            })
        })
        .collect()
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
