use serde_json::{Map, Value};
use std::io;

type StdoutCsv<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Per-ticker tables are preferred when the result carries one: risk
/// contributions, then rebalancing deltas, then a bare weight vector. Any
/// other result becomes a two-column `field,value` listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            if let Some(rows) = per_ticker_rows(map) {
                write_rows(&mut wtr, rows);
            } else if let Some(weights) = map.get("weights").and_then(Value::as_object) {
                write_weights(&mut wtr, weights);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([&format_csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn per_ticker_rows(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    let optimization = map.get("optimization").unwrap_or(&Value::Null);
    map.get("risk_contributions")
        .or_else(|| optimization.get("risk_contributions"))
        .or_else(|| map.get("rebalancing").and_then(|r| r.get("deltas")))
        .or_else(|| map.get("deltas"))
        .and_then(Value::as_array)
}

fn write_weights(wtr: &mut StdoutCsv<'_>, weights: &Map<String, Value>) {
    let (Some(Value::Array(tickers)), Some(Value::Array(values))) =
        (weights.get("tickers"), weights.get("weights"))
    else {
        return;
    };
    let _ = wtr.write_record(["ticker", "weight"]);
    for (t, w) in tickers.iter().zip(values) {
        let _ = wtr.write_record([format_csv_value(t), format_csv_value(w)]);
    }
}

fn write_rows(wtr: &mut StdoutCsv<'_>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);
    for item in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| item.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
