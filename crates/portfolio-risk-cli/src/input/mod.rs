use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Where a JSON document is read from.
enum Source {
    File(PathBuf),
    Stdin,
}

impl Source {
    fn describe(&self) -> String {
        match self {
            Source::File(path) => format!("'{}'", path.display()),
            Source::Stdin => "stdin".to_string(),
        }
    }
}

/// Read `what` (a portfolio or custom scenario) from `path` when given,
/// else from piped stdin.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let (source, text) = match path {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(format!("{what} file not found: {}", path.display()).into());
            }
            let text = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {what} from '{}': {e}", path.display()))?;
            (Source::File(path), text)
        }
        None => match piped_stdin()? {
            Some(text) => (Source::Stdin, text),
            None => return Err(format!("--input <file.json> or piped stdin required for {what}").into()),
        },
    };
    parse(&source, &text, what)
}

fn parse<T: DeserializeOwned>(
    source: &Source,
    text: &str,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    serde_json::from_str(text)
        .map_err(|e| format!("Failed to parse {what} from {}: {e}", source.describe()).into())
}

/// Piped stdin contents; `None` for a terminal or blank input.
fn piped_stdin() -> io::Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(Some(buffer).filter(|b| !b.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portfolio_risk_core::stress::CustomScenario;

    #[test]
    fn test_reads_scenario_file() {
        let dir = std::env::temp_dir().join(format!("prisk-input-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenario.json");
        fs::write(&path, r#"{"name": "Rates up", "market_factors": {"rates": -0.05}}"#).unwrap();

        let s: CustomScenario = read_input(path.to_str(), "custom scenario").unwrap();
        assert_eq!(s.name, "Rates up");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_names_what_was_wanted() {
        let err = read_input::<CustomScenario>(Some("/definitely/not/here.json"), "custom scenario")
            .unwrap_err();
        assert!(err.to_string().starts_with("custom scenario file not found"), "{err}");
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = parse::<CustomScenario>(&Source::Stdin, "{oops", "custom scenario").unwrap_err();
        assert!(err.to_string().contains("from stdin"), "{err}");
    }
}
