use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scalar fields of the result go into one `Field | Value` table. Weight
/// vectors, correlation matrices and risk contributions get tables of their
/// own, followed by warnings and the methodology line of the envelope.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(envelope) => match envelope.get("result") {
            Some(Value::Object(result)) => {
                print_sections(result);
                print_envelope_footer(envelope);
            }
            _ => print_fields(envelope),
        },
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", other),
    }
}

fn print_sections(result: &Map<String, Value>) {
    print_fields(result);

    for (key, val) in result {
        let Value::Object(section) = val else {
            continue;
        };
        if is_weight_vector(section) {
            println!("\n{}:", title(key));
            print_weights(section);
        } else if is_correlation_matrix(section) {
            println!("\nCorrelation:");
            print_correlation(section);
        } else if key == "rebalancing" {
            if let Some(Value::Array(deltas)) = section.get("deltas") {
                println!("\nRebalancing:");
                print_rows(deltas);
            }
        } else if matches!(key.as_str(), "risk" | "optimization" | "monte_carlo") {
            // Workflow results nest full envelopes
            let inner = section
                .get("result")
                .and_then(Value::as_object)
                .unwrap_or(section);
            println!("\n{}:", title(key));
            print_sections(inner);
        }
    }

    if let Some(Value::Array(contributions)) = result.get("risk_contributions") {
        println!("\nRisk contributions:");
        print_rows(contributions);
    }
}

fn print_envelope_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars only; nested objects and arrays are rendered separately.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if matches!(val, Value::Object(_) | Value::Array(_)) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn is_weight_vector(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key("tickers") && map.contains_key("weights")
}

fn is_correlation_matrix(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key("tickers") && map.contains_key("values")
}

fn print_weights(map: &Map<String, Value>) {
    let (Some(Value::Array(tickers)), Some(Value::Array(weights))) =
        (map.get("tickers"), map.get("weights"))
    else {
        return;
    };
    let mut builder = Builder::default();
    builder.push_record(["Ticker", "Weight"]);
    for (t, w) in tickers.iter().zip(weights) {
        let pct = w
            .as_f64()
            .map(|x| format!("{:.2}%", x * 100.0))
            .unwrap_or_else(|| format_value(w));
        builder.push_record([format_value(t), pct]);
    }
    println!("{}", Table::from(builder));
}

fn print_correlation(map: &Map<String, Value>) {
    let (Some(Value::Array(tickers)), Some(Value::Array(rows))) =
        (map.get("tickers"), map.get("values"))
    else {
        return;
    };
    let mut builder = Builder::default();
    let header: Vec<String> = std::iter::once(String::new())
        .chain(tickers.iter().map(format_value))
        .collect();
    builder.push_record(header);
    for (t, row) in tickers.iter().zip(rows) {
        let cells = row.as_array().map(Vec::as_slice).unwrap_or_default();
        let record: Vec<String> = std::iter::once(format_value(t))
            .chain(cells.iter().map(|c| {
                c.as_f64()
                    .map(|x| format!("{:.3}", x))
                    .unwrap_or_else(|| format_value(c))
            }))
            .collect();
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| item.get(h.as_str()).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn title(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
