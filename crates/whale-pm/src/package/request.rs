use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::RequestError;

lazy_static! {
    static ref PACKAGE_ID: Regex = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").unwrap();
}

/// A package the user asked for, optionally pinned to a version.
///
/// Parsed from `Id` or `Id@Version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRequest {
    pub id: String,
    pub version: Option<String>,
}

impl PackageRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), version: None }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Case-insensitive key used for deduplication (NuGet ids are case-insensitive)
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }
}

impl FromStr for PackageRequest {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (id, version) = match s.split_once('@') {
            Some((id, version)) => {
                let version = version.trim();
                if version.is_empty() {
                    return Err(RequestError::EmptyVersion { input: s.to_string() });
                }
                (id.trim(), Some(version.to_string()))
            }
            None => (s, None),
        };

        if !PACKAGE_ID.is_match(id) {
            return Err(RequestError::InvalidId { id: id.to_string() });
        }

        Ok(Self { id: id.to_string(), version })
    }
}

impl fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.id, version),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Whether the raw prompt input asks to cancel.
pub fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("exit")
}

/// Parse a comma and/or whitespace delimited package list.
///
/// Empty items are dropped and duplicate ids are collapsed (first one wins).
pub fn parse_package_list(input: &str) -> Result<Vec<PackageRequest>, RequestError> {
    let mut seen = HashSet::new();
    let mut requests = Vec::new();

    for item in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if item.trim().is_empty() {
            continue;
        }
        let request: PackageRequest = item.parse()?;
        if seen.insert(request.key()) {
            requests.push(request);
        } else {
            log::debug!("Ignoring duplicate package {}", request);
        }
    }

    if requests.is_empty() {
        return Err(RequestError::Empty);
    }

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_id() {
        let request: PackageRequest = "Newtonsoft.Json".parse().unwrap();
        assert_eq!(request.id, "Newtonsoft.Json");
        assert_eq!(request.version, None);
        assert_eq!(request.to_string(), "Newtonsoft.Json");
    }

    #[test]
    fn test_parse_with_version() {
        let request: PackageRequest = "Serilog@3.1.1".parse().unwrap();
        assert_eq!(request.id, "Serilog");
        assert_eq!(request.version.as_deref(), Some("3.1.1"));
        assert_eq!(request.to_string(), "Serilog@3.1.1");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "Serilog@".parse::<PackageRequest>(),
            Err(RequestError::EmptyVersion { input: "Serilog@".to_string() })
        );
        assert!(matches!(
            "../etc/passwd".parse::<PackageRequest>(),
            Err(RequestError::InvalidId { .. })
        ));
        assert!(matches!(
            ".hidden".parse::<PackageRequest>(),
            Err(RequestError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_parse_package_list() {
        let list = parse_package_list("Newtonsoft.Json, Microsoft.Extensions.Logging").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "Newtonsoft.Json");
        assert_eq!(list[1].id, "Microsoft.Extensions.Logging");
    }

    #[test]
    fn test_parse_package_list_dedupes_case_insensitively() {
        let list = parse_package_list("Serilog,,serilog  Dapper ,SERILOG@2.0").unwrap();
        let ids: Vec<_> = list.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["Serilog", "Dapper"]);
    }

    #[test]
    fn test_parse_package_list_empty() {
        assert_eq!(parse_package_list(" , ,, "), Err(RequestError::Empty));
        assert_eq!(parse_package_list(""), Err(RequestError::Empty));
    }

    #[test]
    fn test_exit_command() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("  EXIT \n"));
        assert!(!is_exit_command("exit,Serilog"));
    }
}
