// =====================================================================================
// DERIVED STATS
// =====================================================================================

use crate::error::ModemError;
use crate::models::{DerivedStat, FieldValue, MergedStatRecord};

/// Writes each formula's integer sum into the record. All or nothing: if any
/// input is absent or not an integer, no derived field is written.
pub fn derive(record: &mut MergedStatRecord, formulas: &[DerivedStat]) -> Result<(), ModemError> {
    let computed = formulas
        .iter()
        .map(|formula| {
            let left = integer_input(record, formula.left)?;
            let right = integer_input(record, formula.right)?;
            let sum = left.checked_add(right).ok_or_else(|| {
                ModemError::Parse(format!("{} overflows: {} + {}", formula.name, left, right))
            })?;
            Ok((formula.name, sum))
        })
        .collect::<Result<Vec<_>, ModemError>>()?;

    for (name, value) in computed {
        record.insert(name, FieldValue::Integer(value));
    }

    Ok(())
}

fn integer_input(record: &MergedStatRecord, field: &str) -> Result<i64, ModemError> {
    match record.get(field) {
        None | Some(FieldValue::Text(None)) => Err(ModemError::MissingField(field.to_string())),
        Some(value) => value.as_integer().ok_or_else(|| {
            ModemError::Parse(format!(
                "{} is not an integer: {:?}",
                field,
                value.as_text().unwrap_or_default()
            ))
        }),
    }
}
