//! Small utility helpers used across modules.

use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t ]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values, in order.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Normalize pasted study notes: unify line endings, collapse runs of spaces/tabs,
/// squeeze long blank sections to one empty line, trim.
pub fn clean_study_text(raw: &str) -> String {
  let text = raw.replace("\r\n", "\n").replace('\r', "\n");
  let text = INLINE_WS_RE.replace_all(&text, " ");
  let text = text
    .lines()
    .map(str::trim_end)
    .collect::<Vec<_>>()
    .join("\n");
  BLANK_LINES_RE.replace_all(&text, "\n\n").trim().to_string()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_placeholders() {
    assert_eq!(fill_template("{a} and {b}", &[("a", "x"), ("b", "y")]), "x and y");
    assert_eq!(fill_template("{missing}", &[("a", "x")]), "{missing}");
  }

  #[test]
  fn cleans_pasted_notes() {
    let raw = "  Title\r\n\r\n\r\n\r\nFirst\t\tline   here.  \r\nSecond line.\n\n\n";
    assert_eq!(clean_study_text(raw), "Title\n\nFirst line here.\nSecond line.");
  }

  #[test]
  fn truncates_on_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    assert_eq!(trunc_for_log("héllo wörld", 5), "héllo… (13 bytes total)");
  }
}
