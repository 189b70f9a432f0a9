use crate::mapping::is_string_type;

/// Converts a ROS field name to a Cap'n Proto field name.
///
/// `snake_case` becomes `camelCase`: every underscore is removed and a letter
/// that follows one is uppercased. A name that ends up one character long is
/// lowercased so it cannot read as a type token. Applying this twice gives
/// the same result as applying it once.
pub fn normalize_field_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c == '_' {
            // a leading underscore does not start a new word
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper_next = false;
    }

    if out.chars().count() == 1 {
        out = out.to_lowercase();
    }
    out
}

/// Strings are modelled as an object-like type name, so a string type token
/// gets its first letter uppercased (`string` → `String`). Leading
/// non-alphabetic characters are skipped. Other tokens are returned as-is.
pub fn capitalize_if_string(token: &str) -> String {
    if !is_string_type(token) {
        return token.to_string();
    }
    match token.char_indices().find(|(_, c)| c.is_alphabetic()) {
        Some((idx, c)) => {
            let mut out = String::with_capacity(token.len());
            out.push_str(&token[..idx]);
            out.extend(c.to_uppercase());
            out.push_str(&token[idx + c.len_utf8()..]);
            out
        }
        None => token.to_string(),
    }
}
