use crate::path::{JsonPath, PathSegment};
use crate::position::{Position, Range};
use serde_json::Value;
use tree_sitter::{Node, Parser, Tree};

/// Tightest source range of the value addressed by `path`.
///
/// String values are trimmed to their content, so the range covers the
/// semantic token without the surrounding quotes. Returns `None` when the
/// path does not resolve (missing key, index out of range, value not yet
/// typed).
#[must_use]
pub fn locate(text: &str, path: &JsonPath) -> Option<Range> {
    let tree = parse(text)?;
    let node = node_at_path(text, root_value(&tree)?, path)?;
    Some(trimmed_range(node))
}

/// Parsed JSON value at `path`, or `None` on any addressing or parse miss.
#[must_use]
pub fn value_at(text: &str, path: &JsonPath) -> Option<Value> {
    let tree = parse(text)?;
    let node = node_at_path(text, root_value(&tree)?, path)?;
    serde_json::from_str(&text[node.byte_range()]).ok()
}

/// Structural path containing `position`, including the key currently being
/// typed on a not-yet-valid document.
///
/// Always returns a path; on a document too broken to address, the result
/// degrades to the deepest prefix that could still be established (possibly
/// the root).
#[must_use]
pub fn path_at_position(text: &str, position: Position) -> JsonPath {
    let mut path = JsonPath::root();
    let Some(offset) = position.to_offset(text) else {
        return path;
    };
    let Some(tree) = parse(text) else {
        return path;
    };
    let Some(mut node) = root_value(&tree) else {
        return path;
    };

    loop {
        match node.kind() {
            "object" => {
                let Some(next) = descend_object(text, node, offset, &mut path) else {
                    return path;
                };
                node = next;
            }
            "array" => {
                let mut found = None;
                for (index, element) in value_children(node).into_iter().enumerate() {
                    if contains(element, offset) {
                        found = Some((index, element));
                        break;
                    }
                }
                let Some((index, element)) = found else {
                    return path;
                };
                path.push(PathSegment::Index(index));
                node = element;
            }
            _ => return path,
        }
    }
}

fn parse(text: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_json::LANGUAGE.into())
        .ok()?;
    parser.parse(text, None)
}

/// The document's top-level value node, skipping comments.
fn root_value(tree: &Tree) -> Option<Node<'_>> {
    let document = tree.root_node();
    let mut cursor = document.walk();
    let result = document
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    result
}

fn node_at_path<'tree>(
    text: &str,
    root: Node<'tree>,
    path: &JsonPath,
) -> Option<Node<'tree>> {
    let mut node = root;
    for segment in path.segments() {
        node = match segment {
            PathSegment::Key(key) => {
                if node.kind() != "object" {
                    return None;
                }
                let pair = object_pairs(node)
                    .into_iter()
                    .find(|pair| pair_key(text, *pair).as_deref() == Some(key))?;
                pair.child_by_field_name("value")?
            }
            PathSegment::Index(index) => {
                if node.kind() != "array" {
                    return None;
                }
                *value_children(node).get(*index)?
            }
        };
    }
    Some(node)
}

fn object_pairs(object: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = object.walk();
    object
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "pair")
        .collect()
}

/// Array element nodes, skipping comments and error recovery artifacts so
/// indices match the logical element positions.
fn value_children(array: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = array.walk();
    array
        .named_children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "comment" | "ERROR"))
        .collect()
}

/// Decoded key of a pair node.
fn pair_key(text: &str, pair: Node<'_>) -> Option<String> {
    let key = pair.child_by_field_name("key")?;
    Some(string_content(text, key))
}

/// Content of a string node without the quotes, unescaped when possible.
fn string_content(text: &str, string: Node<'_>) -> String {
    let raw = &text[string.byte_range()];
    if let Ok(decoded) = serde_json::from_str::<String>(raw) {
        return decoded;
    }
    raw.trim_matches('"').to_string()
}

fn contains(node: Node<'_>, offset: usize) -> bool {
    node.start_byte() <= offset && offset <= node.end_byte()
}

/// One descent step through an object: records the key under the cursor and
/// yields the value node to continue from. Handles the mid-edit case where
/// the key exists but the value does not yet.
fn descend_object<'tree>(
    text: &str,
    object: Node<'tree>,
    offset: usize,
    path: &mut JsonPath,
) -> Option<Node<'tree>> {
    for pair in object_pairs(object) {
        if !contains(pair, offset) {
            continue;
        }
        let key = pair_key(text, pair)?;
        path.push(PathSegment::Key(key));
        let value = pair.child_by_field_name("value")?;
        if contains(value, offset) {
            return Some(value);
        }
        return None;
    }

    // Error recovery: a lone string inside an ERROR child is a key that is
    // still being typed.
    let mut cursor = object.walk();
    let children: Vec<_> = object.children(&mut cursor).collect();
    for child in children {
        if child.kind() != "ERROR" || !contains(child, offset) {
            continue;
        }
        if let Some(partial) = find_string_at(child, offset) {
            path.push(PathSegment::Key(string_content(text, partial)));
        }
        return None;
    }
    None
}

fn find_string_at<'tree>(node: Node<'tree>, offset: usize) -> Option<Node<'tree>> {
    if node.kind() == "string" && contains(node, offset) {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| find_string_at(child, offset))
}

/// Node range, trimmed to the string content for string nodes.
fn trimmed_range(node: Node<'_>) -> Range {
    if node.kind() == "string" {
        let mut cursor = node.walk();
        if let Some(content) = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "string_content")
        {
            return node_range(content);
        }
        // Empty string: collapse to the point between the quotes.
        let start = node.start_position();
        let inner = Position::new(start.row, start.column + 1);
        return Range::new(inner, inner);
    }
    node_range(node)
}

fn node_range(node: Node<'_>) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    Range::new(
        Position::new(start.row, start.column),
        Position::new(end.row, end.column),
    )
}
