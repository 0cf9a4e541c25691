use serde_json::Value;

/// Sections of workflow results searched after the top level.
const NESTED_SECTIONS: [&str; 3] = ["risk", "optimization", "monte_carlo"];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, first at the top
/// of the result and then inside workflow sections, then falls back to the
/// first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "sharpe_ratio",
        "var",
        "mean_return",
        "expected_return",
        "volatility",
        "method",
    ];

    if let Value::Object(map) = result_obj {
        let sections = std::iter::once(map).chain(
            NESTED_SECTIONS
                .iter()
                .filter_map(|s| map.get(*s).and_then(Value::as_object)),
        );
        for section in sections {
            for key in &priority_keys {
                if let Some(val) = section.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
