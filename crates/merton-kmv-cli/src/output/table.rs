use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten_fields, format_scalar, result_of};

/// Columns of the improvement log, in display order.
const EVENT_COLUMNS: [&str; 6] = [
    "iterations_to_convergence",
    "asset_value",
    "asset_vol",
    "distance_to_default",
    "kmv_distance_to_default",
    "tolerance",
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let result = result_of(value);
    println!("{}", field_table(result));

    if let Some(Value::Array(events)) = result.get("improvements") {
        if !events.is_empty() {
            println!("\nImprovements:");
            println!("{}", event_table(events));
        }
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn field_table(result: &Value) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten_fields(result) {
        builder.push_record([key, val]);
    }
    builder.build()
}

fn event_table(events: &[Value]) -> Table {
    let mut builder = Builder::default();
    builder.push_record(EVENT_COLUMNS);
    for event in events {
        let row: Vec<String> = EVENT_COLUMNS
            .iter()
            .map(|c| event.get(*c).map(format_scalar).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    builder.build()
}
