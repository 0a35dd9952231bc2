//! GeoJSON properties can't usefully carry lists, and a street merged from
//! several ways may have several names or classifications. Keep the first.

use crate::table::StreetTable;
use serde_json::Value;

/// First element of a list, null for an empty list, anything else unchanged.
pub fn flatten_value(value: Value) -> Value {
    match value {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}

/// Flatten every property cell. Geometry is stored separately and never touched.
pub fn flatten_lists(table: &mut StreetTable) {
    for row in table.rows.iter_mut() {
        for value in row.properties.values_mut() {
            if value.is_array() {
                *value = flatten_value(value.take());
            }
        }
    }
}
