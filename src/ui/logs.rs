use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use regex::Regex;
use std::sync::LazyLock;

/// pm2's follow output prefixes every line with `<name> | `; the port
/// strips it so followed logs read the same as the raw log file.
static SUPERVISOR_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^|\s][^|]*\|\s?").unwrap());

pub fn strip_supervisor_prefix(line: &str) -> String {
    SUPERVISOR_PREFIX_RE.replace(line, "").into_owned()
}

/// Color helper gated on stdout being a terminal.
pub fn emphasize(text: &str) -> String {
    if std::io::stdout().is_terminal() {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}
