//! Property checks for the descriptor scan.

use std::io::Cursor;

use mux_topology::descriptor;
use proptest::prelude::*;

fn entry_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,12}"
}

/// Balanced nested body, possibly spanning several lines, that contains
/// `name = value` text at depth > 0.
fn nested_body() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(("[A-Z]{1,6}", 1usize..4), 0..5).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(inner, depth)| {
                format!(
                    "{}{}{} = (x){}",
                    " ".repeat(depth * 2),
                    "(".repeat(depth),
                    inner,
                    ")".repeat(depth)
                )
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn recorded_line_is_first_line_of_declaration(
        entries in prop::collection::btree_map(entry_name(), nested_body(), 1..8)
    ) {
        let mut text = String::new();
        let mut expected = Vec::new();
        let mut line = 1usize;

        for (name, body) in &entries {
            text.push_str(&format!("{} =\n", name));
            expected.push((name.clone(), line));
            line += 1;

            text.push_str("  (DESCRIPTION =\n");
            line += 1;
            for nested in body {
                text.push_str(nested);
                text.push('\n');
                line += 1;
            }
            text.push_str("  )\n");
            line += 1;
        }

        let index = descriptor::parse(Cursor::new(text)).unwrap();
        prop_assert_eq!(index.len(), entries.len());
        for (name, line) in expected {
            prop_assert_eq!(index.line_of(&name), Some(line));
        }
    }
}
