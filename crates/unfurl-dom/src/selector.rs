//! CSS selector subset: parsing and matching.

use crate::document::NodeId;
use crate::error::DomError;

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;

/// Read access to element data needed for matching.
pub(crate) trait ElementView {
    /// Lowercase tag name, `None` for non-element nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn attr(&self, node: NodeId, key: &str) -> Option<&str>;
    /// Parent if it is an element. Stops at shadow roots and the document.
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    Contains { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Step {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    step: Step,
    // Relation to the previous (left) part.
    combinator: Option<Combinator>,
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList {
    groups: Vec<Vec<Part>>,
}

impl SelectorList {
    pub(crate) fn parse(selector: &str) -> Result<Self, DomError> {
        let groups = split_outside(selector, |ch| ch == ',', false)?
            .into_iter()
            .map(|group| parse_chain(&group, selector))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    pub(crate) fn matches<V: ElementView>(&self, view: &V, node: NodeId) -> bool {
        if view.tag_name(node).is_none() {
            return false;
        }
        self.groups.iter().any(|parts| {
            let last = parts.len() - 1;
            matches_step(view, node, &parts[last].step) && matches_from(view, node, parts, last)
        })
    }
}

/// `parts[idx]` matched at `node`; check the parts to its left.
fn matches_from<V: ElementView>(view: &V, node: NodeId, parts: &[Part], idx: usize) -> bool {
    if idx == 0 {
        return true;
    }
    let prev = &parts[idx - 1].step;
    match parts[idx].combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => view
            .parent_element(node)
            .filter(|parent| matches_step(view, *parent, prev))
            .is_some_and(|parent| matches_from(view, parent, parts, idx - 1)),
        Combinator::Descendant => {
            let mut cursor = view.parent_element(node);
            while let Some(ancestor) = cursor {
                if matches_step(view, ancestor, prev) && matches_from(view, ancestor, parts, idx - 1)
                {
                    return true;
                }
                cursor = view.parent_element(ancestor);
            }
            false
        }
    }
}

fn matches_step<V: ElementView>(view: &V, node: NodeId, step: &Step) -> bool {
    let Some(tag) = view.tag_name(node) else {
        return false;
    };

    if let Some(expected) = &step.tag {
        if !tag.eq_ignore_ascii_case(expected) {
            return false;
        }
    }

    if let Some(id) = &step.id {
        if view.attr(node, "id") != Some(id.as_str()) {
            return false;
        }
    }

    if !step.classes.is_empty() {
        let class_attr = view.attr(node, "class").unwrap_or("");
        if step
            .classes
            .iter()
            .any(|class| !class_attr.split_whitespace().any(|c| c == class))
        {
            return false;
        }
    }

    step.attrs.iter().all(|cond| match cond {
        AttrCondition::Exists { key } => view.attr(node, key).is_some(),
        AttrCondition::Eq { key, value } => view.attr(node, key) == Some(value.as_str()),
        AttrCondition::Contains { key, value } => {
            view.attr(node, key).is_some_and(|v| v.contains(value.as_str()))
        }
        AttrCondition::StartsWith { key, value } => {
            view.attr(node, key).is_some_and(|v| v.starts_with(value.as_str()))
        }
        AttrCondition::EndsWith { key, value } => {
            view.attr(node, key).is_some_and(|v| v.ends_with(value.as_str()))
        }
    })
}

fn unsupported(selector: &str) -> DomError {
    DomError::UnsupportedSelector(selector.to_string())
}

/// Split on `is_sep` outside brackets and quotes. With `keep_sep`, separators
/// are emitted as their own tokens.
fn split_outside(
    input: &str,
    is_sep: impl Fn(char) -> bool,
    keep_sep: bool,
) -> Result<Vec<String>, DomError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if bracket_depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                bracket_depth = bracket_depth.checked_sub(1).ok_or_else(|| unsupported(input))?;
                current.push(ch);
            }
            ch if bracket_depth == 0 && is_sep(ch) => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                } else if !keep_sep {
                    return Err(unsupported(input));
                }
                current.clear();
                if keep_sep && !ch.is_whitespace() {
                    parts.push(ch.to_string());
                }
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 || quote.is_some() {
        return Err(unsupported(input));
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    } else if !keep_sep {
        return Err(unsupported(input));
    }
    Ok(parts)
}

fn parse_chain(group: &str, full: &str) -> Result<Vec<Part>, DomError> {
    let tokens = split_outside(group, |ch| ch.is_ascii_whitespace() || ch == '>', true)?;
    let mut parts: Vec<Part> = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokens {
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return Err(unsupported(full));
            }
            pending = Some(Combinator::Child);
            continue;
        }
        let step = parse_step(&token).map_err(|_| unsupported(full))?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part { step, combinator });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(unsupported(full));
    }
    Ok(parts)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn read_ident(chars: &[char], mut i: usize) -> Option<(String, usize)> {
    let start = i;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    (i > start).then(|| (chars[start..i].iter().collect(), i))
}

fn parse_step(part: &str) -> Result<Step, DomError> {
    let chars: Vec<char> = part.chars().collect();
    let mut step = Step::default();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                if step.universal || step.tag.is_some() {
                    return Err(unsupported(part));
                }
                step.universal = true;
                i += 1;
            }
            '#' => {
                let (id, next) = read_ident(&chars, i + 1).ok_or_else(|| unsupported(part))?;
                if step.id.replace(id).is_some() {
                    return Err(unsupported(part));
                }
                i = next;
            }
            '.' => {
                let (class, next) = read_ident(&chars, i + 1).ok_or_else(|| unsupported(part))?;
                step.classes.push(class);
                i = next;
            }
            '[' => {
                let (cond, next) = parse_attr(&chars, i).ok_or_else(|| unsupported(part))?;
                step.attrs.push(cond);
                i = next;
            }
            _ => {
                if i != 0 {
                    return Err(unsupported(part));
                }
                let (tag, next) = read_ident(&chars, i).ok_or_else(|| unsupported(part))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    Ok(step)
}

/// Parse `[key]` or `[key op value]` starting at the opening bracket.
fn parse_attr(chars: &[char], open: usize) -> Option<(AttrCondition, usize)> {
    let mut i = open + 1;
    let start = i;
    while i < chars.len() && (is_ident_char(chars[i]) || chars[i] == ':') {
        i += 1;
    }
    if i == start {
        return None;
    }
    let key: String = chars[start..i].iter().collect();

    if chars.get(i) == Some(&']') {
        return Some((AttrCondition::Exists { key }, i + 1));
    }

    let op = match chars.get(i)? {
        '=' => {
            i += 1;
            '='
        }
        c @ ('*' | '^' | '$') if chars.get(i + 1) == Some(&'=') => {
            i += 2;
            *c
        }
        _ => return None,
    };

    let value: String = match chars.get(i)? {
        q @ ('"' | '\'') => {
            let end = chars[i + 1..].iter().position(|c| c == q)? + i + 1;
            let v = chars[i + 1..end].iter().collect();
            i = end + 1;
            v
        }
        _ => {
            let (v, next) = read_ident(chars, i)?;
            i = next;
            v
        }
    };

    if chars.get(i) != Some(&']') {
        return None;
    }

    let cond = match op {
        '=' => AttrCondition::Eq { key, value },
        '*' => AttrCondition::Contains { key, value },
        '^' => AttrCondition::StartsWith { key, value },
        _ => AttrCondition::EndsWith { key, value },
    };
    Some((cond, i + 1))
}
