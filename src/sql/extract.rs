use regex::Regex;
use std::sync::OnceLock;

static SELECT_SPAN: OnceLock<Regex> = OnceLock::new();

const COMMENT_MARKERS: [&str; 3] = ["###", "#", "--"];

fn select_span() -> &'static Regex {
    SELECT_SPAN.get_or_init(|| {
        Regex::new(r"(?i)\b(SELECT\b[\s\S]+?)(?:;|\n\s*(?:###|#|--)|\z)").unwrap()
    })
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    COMMENT_MARKERS.iter().any(|m| trimmed.starts_with(m))
}

/// Pull the first SELECT statement out of raw model output
///
/// Returns `None` when the text has no SELECT-shaped span. The result always
/// ends with a single `;`.
pub fn extract(raw_output: &str) -> Option<String> {
    let cleaned = raw_output
        .replace("```sql", "")
        .replace("```", "")
        .replace("---", "");

    let captures = select_span().captures(&cleaned)?;
    let body = captures.get(1)?.as_str().trim();

    let kept: Vec<&str> = body.lines().take_while(|l| !is_comment_line(l)).collect();
    let sql = kept.join("\n");
    let sql = sql.trim();
    if sql.is_empty() {
        return None;
    }

    Some(format!("{};", sql))
}
