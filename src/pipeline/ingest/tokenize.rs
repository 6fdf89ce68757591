//! CSV line tokenizer.
//!
//! Lines without a quote take the fast path: a plain split on commas.
//! Quoted lines go through a small quote-aware scanner that keeps commas
//! inside quotes and strips the surrounding quote pair from each field.
//! Doubled quotes inside a quoted field are not unescaped; the exports
//! this reads never contain them.

/// Split one CSV line into fields.
pub fn tokenize_line(line: &str) -> Vec<String> {
    if !line.contains('"') {
        return line.split(',').map(str::to_string).collect();
    }
    tokenize_quoted(line)
}

fn tokenize_quoted(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                fields.push(strip_quotes(&current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(strip_quotes(&current));
    fields
}

fn strip_quotes(field: &str) -> String {
    let trimmed = field.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        field.to_string()
    }
}
