//! Dotted paths into the model, like `person.name.first`.

use serde_json::Value;

fn step<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    let next = match value {
        Value::Object(map) => map.get(segment)?,
        Value::Array(items) => {
            if segment.is_empty() || ! segment.bytes().all(|b| b.is_ascii_digit()) {
                return None
            }
            items.get(segment.parse::<usize>().ok()?)?
        }
        _ => return None
    };
    if next.is_null() {
        None
    } else {
        Some(next)
    }
}

/// Walks `root` along the `.`-separated segments of `path`. Gives
/// `None` if a segment is missing or leads to `null`, so to a binding
/// an explicit null and a missing value look the same. Sequences are
/// indexed with decimal segments (`songs.0.title`).
pub fn resolve<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(root, step)
}


#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn t_resolve() {
        let scope = json!({
            "obj": {
                "one": "text_one",
                "zero": 0,
                "three": { "four": { "five": null } },
                "1": { "2": { "3": "text_3" } },
                "songs": [ { "title": "Black" }, null ],
            }
        });
        assert_eq!(resolve(&scope, "obj.one"), Some(&json!("text_one")));
        assert_eq!(resolve(&scope, "obj.zero"), Some(&json!(0)));
        assert_eq!(resolve(&scope, "obj.1.2.3"), Some(&json!("text_3")));
        assert_eq!(resolve(&scope, "obj.three.four"), Some(&json!({ "five": null })));
        assert_eq!(resolve(&scope, "obj.three.four.five"), None);
        assert_eq!(resolve(&scope, "obj.three.four.five.six"), None);
        assert_eq!(resolve(&scope, "obj.two"), None);
        assert_eq!(resolve(&scope, "other.one"), None);
        assert_eq!(resolve(&scope, "obj.one.length"), None);
        assert_eq!(resolve(&scope, "obj.songs.0.title"), Some(&json!("Black")));
        assert_eq!(resolve(&scope, "obj.songs.1"), None);
        assert_eq!(resolve(&scope, "obj.songs.+0"), None);
        assert_eq!(resolve(&scope, ""), None);
        assert_eq!(resolve(&scope, "obj"), scope.get("obj"));
    }
}
