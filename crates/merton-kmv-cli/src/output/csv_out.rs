use serde_json::Value;
use std::io;

use super::{flatten_fields, result_of};

/// Write the result as two-column CSV (field, value) to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    if let Err(e) = write_csv(&mut wtr, value) {
        tracing::error!(error = %e, "failed to write CSV output");
    }
}

fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in flatten_fields(result_of(value)) {
        wtr.write_record([key.as_str(), val.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}
