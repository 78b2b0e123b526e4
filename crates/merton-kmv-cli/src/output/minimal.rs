use serde_json::Value;

use super::{format_scalar, result_of};

/// Key answer fields, printed space-separated in this order when present.
const KEY_FIELDS: [&str; 6] = [
    "status",
    "asset_value",
    "asset_vol",
    "d1",
    "kmv_distance_to_default",
    "tolerance",
];

/// Print just the key answer values from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result = result_of(value);
    // Solver output nests the answer under "best"
    let best = result.get("best").filter(|b| b.is_object());

    KEY_FIELDS
        .iter()
        .filter_map(|key| {
            result
                .get(*key)
                .or_else(|| best.and_then(|b| b.get(*key)))
                .map(format_scalar)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
