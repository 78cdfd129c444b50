use std::sync::OnceLock;

use regex::Regex;

use crate::types::FieldKind;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_any_whitespace, r"\s+");
re!(re_many_newlines, r"\n{3,}");
re!(re_blank_run, r"\n{2,}");
re!(re_inline_spaces, r"[ \t]+");

/// Clean raw OCR output for `field`.
pub fn clean_extracted_text(text: &str, field: &str, kind: FieldKind) -> String {
    let text = text.replace("\r\n", "\n");
    let text = strip_label(text.trim_start(), field);

    match kind {
        FieldKind::Text | FieldKind::Numeric => re_any_whitespace().replace_all(text, " ").trim().to_string(),
        FieldKind::Narrative => tidy_paragraphs(text),
    }
}

/// Drop a leading `Field name:` label. Underscores in the field name also
/// match spaces, so `blood_sugar` strips "Blood Sugar:". The colon and the
/// spaces after the label are optional, but a letter straight after it means
/// the text only starts with the label ("Named" is not "Name").
fn strip_label<'a>(text: &'a str, field: &str) -> &'a str {
    let words: Vec<String> = field
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if words.is_empty() {
        return text;
    }

    let pattern = format!(r"(?i)\A(?:{})(\s*:?\s*)", words.join(r"[\s_]+"));
    let Ok(label) = Regex::new(&pattern) else {
        return text;
    };
    let Some(caps) = label.captures(text) else {
        return text;
    };
    let (Some(whole), Some(separator)) = (caps.get(0), caps.get(1)) else {
        return text;
    };
    let joined_to_word = separator.is_empty()
        && text[whole.end()..].chars().next().is_some_and(char::is_alphabetic);
    if joined_to_word {
        text
    } else {
        &text[whole.end()..]
    }
}

fn tidy_paragraphs(text: &str) -> String {
    let text = re_many_newlines().replace_all(text, "\n\n");
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| re_inline_spaces().replace_all(line, " ").trim().to_string())
        .collect();
    // Lines that were only spaces are now empty and can form new runs.
    let joined = lines.join("\n");
    re_blank_run().replace_all(&joined, "\n\n").trim().to_string()
}
