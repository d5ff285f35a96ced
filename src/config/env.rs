//! Per-service environment resolution.
//!
//! Precedence, lowest to highest: env-file variables, inherited
//! parent-process variables, the service's literal `env` map.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

/// Parse one env file in dotenv format. Blank lines and `#` comments are
/// skipped, a leading `export ` is tolerated, and matching single or double
/// quotes around the value are stripped.
pub fn parse_env_file(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Load and merge the project's env files, in declaration order. A missing
/// or unreadable file is skipped with a warning rather than failing the
/// reconcile.
pub fn load_env_files(paths: &[impl AsRef<Path>]) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => merged.extend(parse_env_file(&content)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable env file"),
        }
    }
    merged
}

/// Resolve one service's environment from the already-merged file vars, its
/// inherit whitelist, and its literal `env` map.
pub fn resolve_env(
    file_vars: &BTreeMap<String, String>,
    inherit: &[String],
    literal: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut resolved = file_vars.clone();
    for name in inherit {
        if let Ok(value) = std::env::var(name) {
            resolved.insert(name.clone(), value);
        }
    }
    for (key, value) in literal {
        resolved.insert(key.clone(), value.clone());
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_pairs() {
        let vars = parse_env_file("A=1\nB=two\n");
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "two");
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        let vars = parse_env_file("# comment\n\nA=1\n   # indented comment\n");
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn parse_strips_export_prefix() {
        let vars = parse_env_file("export DATABASE_URL=postgres://localhost\n");
        assert_eq!(vars["DATABASE_URL"], "postgres://localhost");
    }

    #[test]
    fn parse_strips_matching_quotes() {
        let vars = parse_env_file("A=\"quoted value\"\nB='single'\nC=\"unbalanced'\n");
        assert_eq!(vars["A"], "quoted value");
        assert_eq!(vars["B"], "single");
        assert_eq!(vars["C"], "\"unbalanced'");
    }

    #[test]
    fn parse_keeps_equals_in_value() {
        let vars = parse_env_file("QUERY=a=b=c\n");
        assert_eq!(vars["QUERY"], "a=b=c");
    }

    #[test]
    fn later_files_override_earlier() {
        let tmp = tempfile::TempDir::new().unwrap();
        let first = tmp.path().join(".env");
        let second = tmp.path().join(".env.local");
        std::fs::write(&first, "A=base\nB=base\n").unwrap();
        std::fs::write(&second, "B=local\n").unwrap();

        let merged = load_env_files(&[first, second]);
        assert_eq!(merged["A"], "base");
        assert_eq!(merged["B"], "local");
    }

    #[test]
    fn missing_file_is_skipped() {
        let merged = load_env_files(&["/definitely/not/here/.env"]);
        assert!(merged.is_empty());
    }

    #[test]
    fn literal_env_wins_over_files_and_inherit() {
        std::env::set_var("ZAP_TEST_INHERIT", "from-parent");
        let file_vars = BTreeMap::from([
            ("A".to_string(), "file".to_string()),
            ("ZAP_TEST_INHERIT".to_string(), "file".to_string()),
        ]);
        let literal = BTreeMap::from([("A".to_string(), "literal".to_string())]);

        let resolved = resolve_env(&file_vars, &["ZAP_TEST_INHERIT".to_string()], &literal);
        assert_eq!(resolved["A"], "literal");
        assert_eq!(resolved["ZAP_TEST_INHERIT"], "from-parent");
    }

    #[test]
    fn inherit_of_unset_var_is_skipped() {
        let resolved = resolve_env(
            &BTreeMap::new(),
            &["ZAP_TEST_DEFINITELY_UNSET".to_string()],
            &BTreeMap::new(),
        );
        assert!(resolved.is_empty());
    }
}
