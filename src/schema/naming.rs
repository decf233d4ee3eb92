//! CRD schemas use camelCase keys, while host attributes are snake_case. Every field carries
//! both names, so the candidate tree can be keyed by one and the rendered yaml by the other.

/// Converts a camelCase (or PascalCase) CRD key into a snake_case attribute name. Runs of
/// capitals are treated as a single word, so `accessKeyID` becomes `access_key_id`.
pub fn to_attribute_name(crd_name: &str) -> String {
    let chars: Vec<char> = crd_name.chars().collect();
    let mut out = String::with_capacity(crd_name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '.' || c == '/' {
            out.push('_');
            continue;
        }
        if c.is_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1);
            let starts_word = match prev {
                None => false,
                Some(p) if p == '_' || p == '-' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // the last capital in a run starts a new word when followed by lowercase: "IDToken"
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                Some(_) => false,
            };
            if starts_word && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
