//! Field name normalization.
//!
//! Callers address engagement fields in snake_case (query parameters,
//! projection lists); internally every attribute is camelCase. The
//! conversion is a pure, total function over the snake_case convention.

/// Convert a snake_case field name to its camelCase attribute name.
///
/// The input is lowercased first, then split on underscores: the first
/// token is kept as-is, each later token gets its first letter
/// capitalized, and single-character tokens are upper-cased entirely.
/// Empty tokens (doubled or trailing underscores) contribute nothing.
///
/// # Examples
///
/// ```
/// use caravel_core::fields::snake_to_camel;
///
/// assert_eq!(snake_to_camel("customer_name"), "customerName");
/// assert_eq!(snake_to_camel("another_value"), "anotherValue");
/// assert_eq!(snake_to_camel("ocp_sub_domain"), "ocpSubDomain");
/// assert_eq!(snake_to_camel("uuid"), "uuid");
/// assert_eq!(snake_to_camel(""), "");
/// ```
pub fn snake_to_camel(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut tokens = lowered.split('_').filter(|t| !t.is_empty());

    let mut result = match tokens.next() {
        Some(first) => String::from(first),
        None => return String::new(),
    };

    for token in tokens {
        if token.len() == 1 {
            result.push_str(&token.to_uppercase());
        } else {
            let mut chars = token.chars();
            if let Some(first) = chars.next() {
                result.extend(first.to_uppercase());
                result.push_str(chars.as_str());
            }
        }
    }

    result
}
