//! Properties file parsing for `create --load`.
//!
//! One `name=value` pair per line. Blank lines and lines starting with `#`
//! are ignored; surrounding whitespace is trimmed from both halves. Later
//! lines override earlier ones.

/// Parse a whole properties file, reporting the first bad line.
pub fn parse_property_file(contents: &str) -> Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {}: expected name=value", index + 1))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("line {}: empty property name", index + 1));
        }
        pairs.push((name.to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}
