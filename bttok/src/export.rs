use std::fmt::Write;

use crate::index::{FeatureIndex, FeatureKey};

/// Renders `index` as a C++ `std::unordered_map<std::u32string, int>`
/// definition named `name`, with entries in id order.
pub fn to_cpp<K: FeatureKey>(index: &FeatureIndex<K>, name: &str) -> String {
    let mut out = String::new();
    out.push_str("#include <string>\n#include <unordered_map>\n\n");
    let _ = writeln!(out, "const std::unordered_map<std::u32string, int> {} = {{", name);
    for (key, id) in index.entries() {
        let _ = writeln!(out, "  {{U\"{}\", {}}},", escape(&key.encode()), id);
    }
    out.push_str("};\n");
    out
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(escaped, "\\U{:08X}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::index::CharKey;

    #[test]
    fn test_to_cpp() {
        let index = FeatureIndex::from_keys(vec![CharKey::new(1, '"'), CharKey::new(0, 'あ')]);
        let cpp = to_cpp(&index, "idf_index");
        assert_eq!(
            cpp,
            "#include <string>\n#include <unordered_map>\n\n\
             const std::unordered_map<std::u32string, int> idf_index = {\n\
             \x20 {U\"0あ\", 0},\n\
             \x20 {U\"1\\\"\", 1},\n\
             };\n"
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("0\\"), "0\\\\");
        assert_eq!(escape("3\u{1}"), "3\\U00000001");
    }
}
