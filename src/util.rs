//! Shared utility functions
//!
//! Identifier and literal helpers used by the emitters and the manifest host.

/// Replace every character that cannot appear in a C# identifier with `_`
///
/// A leading digit gets an `_` prefix and an empty input becomes `_`.
///
/// # Examples
/// ```
/// use obsweave::util::sanitize_identifier;
/// assert_eq!(sanitize_identifier("MyApp.Orders"), "MyApp_Orders");
/// assert_eq!(sanitize_identifier("9lives"), "_9lives");
/// ```
pub fn sanitize_identifier(s: &str) -> String {
    let mut result: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match result.chars().next() {
        None => result.push('_'),
        Some(c) if c.is_ascii_digit() => result.insert(0, '_'),
        _ => {}
    }
    result
}

/// Convert PascalCase to camelCase
///
/// # Examples
/// ```
/// use obsweave::util::to_camel_case;
/// assert_eq!(to_camel_case("OrdersPlaced"), "ordersPlaced");
/// assert_eq!(to_camel_case("foo"), "foo");
/// ```
pub fn to_camel_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render a regular C# string literal, escaping quotes, backslashes and control characters
///
/// # Examples
/// ```
/// use obsweave::util::csharp_string;
/// assert_eq!(csharp_string("a\"b"), "\"a\\\"b\"");
/// ```
pub fn csharp_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a verbatim C# string literal (`@"..."`), doubling embedded quotes
pub fn csharp_verbatim_string(s: &str) -> String {
    format!("@\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("MyApp.Orders"), "MyApp_Orders");
        assert_eq!(sanitize_identifier("MyApp_Orders"), "MyApp_Orders");
        assert_eq!(sanitize_identifier("orders-service v2"), "orders_service_v2");
        assert_eq!(sanitize_identifier("1st"), "_1st");
        assert_eq!(sanitize_identifier(""), "_");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("RecordLatency"), "recordLatency");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_csharp_string() {
        assert_eq!(csharp_string("plain"), "\"plain\"");
        assert_eq!(csharp_string("C:\\tmp"), "\"C:\\\\tmp\"");
        assert_eq!(csharp_string("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn test_csharp_verbatim_string() {
        assert_eq!(csharp_verbatim_string("src/A.cs"), "@\"src/A.cs\"");
        assert_eq!(csharp_verbatim_string("a\"b"), "@\"a\"\"b\"");
    }
}
