//! Name derivations used when rendering entities.

use crate::domain::ModelType;

/// Fully-qualified name of a model type: `module.Qualname`.
pub fn fqualname_of(model: &ModelType) -> String {
    format!("{}.{}", model.module(), model.qualname())
}

/// Module-qualified short name: `module.Name`.
///
/// Does not communicate nesting; use [`fqualname_of`] for that.
pub fn fname_of(model: &ModelType) -> String {
    format!("{}.{}", model.module(), model.name())
}

/// Quotes a name for chain rendering: `'Leaf'`.
///
/// Falls back to double quotes when the name holds a single quote but no double quote.
pub fn quote_name(name: &str) -> String {
    let quote = if name.contains('\'') && !name.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelTypeBuilder;
    use rstest::rstest;

    #[rstest]
    #[case("Leaf", "'Leaf'")]
    #[case("Sub by foo-inst", "'Sub by foo-inst'")]
    #[case("it's", "\"it's\"")]
    #[case("both ' and \"", "'both \\' and \"'")]
    #[case("a\\b", "'a\\\\b'")]
    #[case("bell\u{7}", "'bell\\x07'")]
    #[case("\u{1b}[0m", "'\\x1b[0m'")]
    #[case("del\u{7f}", "'del\\x7f'")]
    #[case("tab\t", "'tab\\t'")]
    fn test_quote_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(quote_name(name), expected);
    }

    #[test]
    fn test_qualified_names() {
        let model = ModelTypeBuilder::new("Model")
            .module("tests.pages")
            .qualname("Outer.Model")
            .build()
            .unwrap();
        assert_eq!(fqualname_of(&model), "tests.pages.Outer.Model");
        assert_eq!(fname_of(&model), "tests.pages.Model");
    }
}
