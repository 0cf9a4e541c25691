pub mod config;
pub mod file;

use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialize the command input from `--input <file>` or piped stdin.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_json(path);
    }
    let missing = || -> Box<dyn std::error::Error> {
        format!("--input <file.json> or stdin required for {command}").into()
    };
    if atty::is(atty::Stream::Stdin) {
        return Err(missing());
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer).ok_or_else(missing)?
}

/// Blank input counts as absent.
fn parse_piped<T: DeserializeOwned>(
    buffer: &str,
) -> Option<Result<T, Box<dyn std::error::Error>>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed).map_err(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_blank_piped_input_is_absent() {
        assert!(parse_piped::<Value>("  \n\t").is_none());
    }

    #[test]
    fn test_piped_json_parsed() {
        let v: Value = parse_piped(" {\"strategy\": \"max_sharpe\"}\n").unwrap().unwrap();
        assert_eq!(v["strategy"], "max_sharpe");
    }

    #[test]
    fn test_malformed_piped_input_errors() {
        assert!(parse_piped::<Value>("{not json").unwrap().is_err());
    }
}
