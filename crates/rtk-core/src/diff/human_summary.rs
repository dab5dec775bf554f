//! Human-readable rendering of diff results.

use serde_json::Value;

use crate::diff::model::DiffResult;

/// One `[op] <path> old => new` line per result
///
/// Absent sides render as `undefined`; strings render unquoted.
pub fn render_human_summary(results: &[DiffResult]) -> String {
    if results.is_empty() {
        return "No differences.\n".to_string();
    }
    let mut out = String::new();
    for r in results {
        out.push_str(&format!(
            "[{}] <{}> {} => {}\n",
            r.op,
            r.path,
            show(r.old_value.as_ref()),
            show(r.new_value.as_ref())
        ));
    }
    out
}

fn show(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_lines() {
        let text = render_human_summary(&[
            DiffResult::replace("header.cwd", json!("/a"), json!("/b")),
            DiffResult::add("sharedObjects.2", json!("/lib/c.so")),
            DiffResult::remove("libuv.0", json!({"fd": 3})),
        ]);
        assert_eq!(
            text,
            "[replace] <header.cwd> /a => /b\n\
             [add] <sharedObjects.2> undefined => /lib/c.so\n\
             [remove] <libuv.0> {\"fd\":3} => undefined\n"
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(render_human_summary(&[]), "No differences.\n");
    }
}
