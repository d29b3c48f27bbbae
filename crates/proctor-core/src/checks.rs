//! Built-in structural checks used by rubric tables.
//!
//! Each variant is a parameterized presence/shape test over a parsed
//! [`Document`]. Checks are pure and independent of each other, so a rubric
//! can be evaluated in any order with identical results.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::markup::{collapse_whitespace, Document, Element};
use crate::traits::RulePredicate;

/// Which list containers a [`Check::ListItems`] rule accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ul,
    Ol,
    #[default]
    Any,
}

impl ListKind {
    fn accepts(self, element: &Element) -> bool {
        match self {
            ListKind::Ul => element.is("ul"),
            ListKind::Ol => element.is("ol"),
            ListKind::Any => is_list(element),
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Ul => write!(f, "<ul>"),
            ListKind::Ol => write!(f, "<ol>"),
            ListKind::Any => write!(f, "list"),
        }
    }
}

/// A structural requirement, as written in a rubric table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// The document starts with an HTML doctype declaration.
    Doctype,

    /// At least `min_count` elements named `tag`.
    Element {
        tag: String,
        #[serde(default = "default_one")]
        min_count: usize,
    },

    /// Some list container holds at least `min_items` of its own `<li>` items.
    ListItems {
        #[serde(default)]
        list: ListKind,
        min_items: usize,
    },

    /// An anchor whose target and visible label match the required values.
    /// Omitted fields match anything non-empty.
    Link {
        #[serde(default)]
        href: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },

    /// A form carrying fields of every listed input kind and, optionally, a
    /// submission control.
    Form {
        #[serde(default)]
        input_types: Vec<String>,
        #[serde(default = "default_true")]
        require_submit: bool,
    },

    /// Some element `tag` (or any element for `*`) carries attribute `name`,
    /// optionally with an exact value.
    Attribute {
        tag: String,
        name: String,
        #[serde(default)]
        value: Option<String>,
    },

    /// At least one `tag` element exists and every one carries `name`.
    AllHaveAttribute { tag: String, name: String },

    /// A `child` element appears somewhere inside a `parent` element.
    Nested { parent: String, child: String },

    /// A table with at least `min_rows` rows, one of which has at least
    /// `min_columns` cells.
    Table {
        #[serde(default = "default_one")]
        min_rows: usize,
        #[serde(default = "default_one")]
        min_columns: usize,
    },

    /// At least `min_distinct` different tags from `tags` are present.
    Semantic {
        tags: Vec<String>,
        min_distinct: usize,
    },

    /// At least `min_count` markup comments.
    Comments {
        #[serde(default = "default_one")]
        min_count: usize,
    },

    /// The visible text contains `value` (case-insensitive).
    TextContains { value: String },
}

fn default_one() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn is_list(element: &Element) -> bool {
    element.is("ul") || element.is("ol") || element.is("menu")
}

/// Normalize an href for comparison: trimmed, without one trailing slash.
fn normalize_href(href: &str) -> &str {
    let href = href.trim();
    href.strip_suffix('/').unwrap_or(href)
}

impl Check {
    fn doctype(doc: &Document<'_>) -> bool {
        doc.doctype()
            .is_some_and(|d| d.split_whitespace().next() == Some("html"))
    }

    fn element(doc: &Document<'_>, tag: &str, min_count: usize) -> bool {
        doc.elements_named(tag).count() >= min_count
    }

    fn list_items(doc: &Document<'_>, list: ListKind, min_items: usize) -> bool {
        doc.elements()
            .iter()
            .enumerate()
            .filter(|(_, e)| list.accepts(e))
            .any(|(list_id, _)| {
                let own_items = doc
                    .descendants(list_id)
                    .filter(|(_, e)| e.is("li"))
                    .filter(|(li, _)| doc.nearest_ancestor(*li, is_list) == Some(list_id))
                    .count();
                own_items >= min_items
            })
    }

    fn link(doc: &Document<'_>, href: Option<&str>, text: Option<&str>) -> bool {
        doc.elements_named("a").any(|(_, a)| {
            let Some(target) = a.attr("href").filter(|h| !h.trim().is_empty()) else {
                return false;
            };
            let label = doc.text_of(a);
            let href_ok = href.map_or(true, |want| normalize_href(target) == normalize_href(want));
            let text_ok = match text {
                Some(want) => label == collapse_whitespace(want),
                None => !label.is_empty(),
            };
            href_ok && text_ok
        })
    }

    fn form(doc: &Document<'_>, input_types: &[String], require_submit: bool) -> bool {
        doc.elements_named("form").any(|(form_id, _)| {
            let mut kinds = BTreeSet::new();
            let mut has_submit = false;

            for (_, field) in doc.descendants(form_id) {
                match field.name.as_str() {
                    "input" => {
                        let kind = field.attr("type").unwrap_or("text").trim().to_lowercase();
                        let kind = if kind.is_empty() { "text".to_string() } else { kind };
                        if kind == "submit" || kind == "image" {
                            has_submit = true;
                        }
                        kinds.insert(kind);
                    }
                    "textarea" | "select" => {
                        kinds.insert(field.name.clone());
                    }
                    "button" => {
                        let kind = field.attr("type").unwrap_or("submit").trim();
                        if kind.is_empty() || kind.eq_ignore_ascii_case("submit") {
                            has_submit = true;
                        }
                    }
                    _ => {}
                }
            }

            let fields_ok = input_types
                .iter()
                .all(|t| kinds.contains(&t.trim().to_lowercase()));
            fields_ok && (has_submit || !require_submit)
        })
    }

    fn attribute(doc: &Document<'_>, tag: &str, name: &str, value: Option<&str>) -> bool {
        doc.elements()
            .iter()
            .filter(|e| tag == "*" || e.is(tag))
            .any(|e| match (e.attr(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(want)) => actual.trim() == want.trim(),
                (None, _) => false,
            })
    }

    fn all_have_attribute(doc: &Document<'_>, tag: &str, name: &str) -> bool {
        let mut seen = false;
        for (_, e) in doc.elements_named(tag) {
            if !e.has_attr(name) {
                return false;
            }
            seen = true;
        }
        seen
    }

    fn nested(doc: &Document<'_>, parent: &str, child: &str) -> bool {
        doc.elements_named(child)
            .any(|(id, _)| doc.ancestors(id).any(|(_, a)| a.is(parent)))
    }

    fn table(doc: &Document<'_>, min_rows: usize, min_columns: usize) -> bool {
        doc.elements_named("table").any(|(table_id, _)| {
            let rows: Vec<usize> = doc
                .descendants(table_id)
                .filter(|(_, e)| e.is("tr"))
                .filter(|(tr, _)| doc.nearest_ancestor(*tr, |a| a.is("table")) == Some(table_id))
                .map(|(tr, _)| tr)
                .collect();

            let widest = rows
                .iter()
                .map(|&tr| {
                    doc.descendants(tr)
                        .filter(|(_, c)| c.is("td") || c.is("th"))
                        .filter(|(cell, _)| doc.nearest_ancestor(*cell, |a| a.is("tr")) == Some(tr))
                        .count()
                })
                .max()
                .unwrap_or(0);

            rows.len() >= min_rows && widest >= min_columns
        })
    }

    fn semantic(doc: &Document<'_>, tags: &[String], min_distinct: usize) -> bool {
        let present = tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|t| doc.elements_named(t).next().is_some())
            .count();
        present >= min_distinct
    }

    fn text_contains(doc: &Document<'_>, value: &str) -> bool {
        let needle = collapse_whitespace(value).to_lowercase();
        !needle.is_empty() && doc.text().to_lowercase().contains(&needle)
    }
}

impl RulePredicate for Check {
    fn matches(&self, doc: &Document<'_>) -> bool {
        match self {
            Check::Doctype => Check::doctype(doc),
            Check::Element { tag, min_count } => Check::element(doc, tag, *min_count),
            Check::ListItems { list, min_items } => Check::list_items(doc, *list, *min_items),
            Check::Link { href, text } => Check::link(doc, href.as_deref(), text.as_deref()),
            Check::Form {
                input_types,
                require_submit,
            } => Check::form(doc, input_types, *require_submit),
            Check::Attribute { tag, name, value } => {
                Check::attribute(doc, tag, name, value.as_deref())
            }
            Check::AllHaveAttribute { tag, name } => Check::all_have_attribute(doc, tag, name),
            Check::Nested { parent, child } => Check::nested(doc, parent, child),
            Check::Table {
                min_rows,
                min_columns,
            } => Check::table(doc, *min_rows, *min_columns),
            Check::Semantic { tags, min_distinct } => Check::semantic(doc, tags, *min_distinct),
            Check::Comments { min_count } => doc.comment_count() >= *min_count,
            Check::TextContains { value } => Check::text_contains(doc, value),
        }
    }

    fn describe(&self) -> String {
        match self {
            Check::Doctype => "HTML doctype declaration".to_string(),
            Check::Element { tag, min_count } => format!("at least {min_count} <{tag}>"),
            Check::ListItems { list, min_items } => {
                format!("{list} with at least {min_items} items")
            }
            Check::Link { href, text } => match (href, text) {
                (Some(h), Some(t)) => format!("link to {h} labelled \"{t}\""),
                (Some(h), None) => format!("link to {h}"),
                (None, Some(t)) => format!("link labelled \"{t}\""),
                (None, None) => "a hyperlink".to_string(),
            },
            Check::Form {
                input_types,
                require_submit,
            } => {
                let mut s = format!("form with fields: {}", input_types.join(", "));
                if *require_submit {
                    s.push_str(" and a submit control");
                }
                s
            }
            Check::Attribute { tag, name, value } => match value {
                Some(v) => format!("<{tag}> with {name}=\"{v}\""),
                None => format!("<{tag}> with {name}"),
            },
            Check::AllHaveAttribute { tag, name } => format!("every <{tag}> has {name}"),
            Check::Nested { parent, child } => format!("<{child}> inside <{parent}>"),
            Check::Table {
                min_rows,
                min_columns,
            } => format!("table with {min_rows}+ rows and {min_columns}+ columns"),
            Check::Semantic { tags, min_distinct } => {
                format!("{min_distinct} of: {}", tags.join(", "))
            }
            Check::Comments { min_count } => format!("at least {min_count} comment(s)"),
            Check::TextContains { value } => format!("text mentions \"{value}\""),
        }
    }

    fn lint(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let blank = |s: &str| s.trim().is_empty();

        match self {
            Check::Doctype => {}
            Check::Element { tag, min_count } => {
                if blank(tag) {
                    problems.push("element check has an empty tag".to_string());
                }
                if *min_count == 0 {
                    problems.push("min_count = 0 is always satisfied".to_string());
                }
            }
            Check::ListItems { min_items, .. } => {
                if *min_items == 0 {
                    problems.push("min_items = 0 is always satisfied by any list".to_string());
                }
            }
            Check::Link { href, text } => {
                if href.is_none() && text.is_none() {
                    problems.push("link check names neither href nor text".to_string());
                }
            }
            Check::Form {
                input_types,
                require_submit,
            } => {
                if input_types.is_empty() && !require_submit {
                    problems.push("form check accepts any form".to_string());
                }
                if input_types.iter().any(|t| blank(t)) {
                    problems.push("form check lists an empty input type".to_string());
                }
            }
            Check::Attribute { tag, name, .. } | Check::AllHaveAttribute { tag, name } => {
                if blank(tag) || blank(name) {
                    problems.push("attribute check has an empty tag or name".to_string());
                }
            }
            Check::Nested { parent, child } => {
                if blank(parent) || blank(child) {
                    problems.push("nested check has an empty tag".to_string());
                }
            }
            Check::Table {
                min_rows,
                min_columns,
            } => {
                if *min_rows == 0 && *min_columns == 0 {
                    problems.push("table check accepts any table".to_string());
                }
            }
            Check::Semantic { tags, min_distinct } => {
                let distinct = tags
                    .iter()
                    .map(|t| t.trim().to_lowercase())
                    .collect::<BTreeSet<_>>()
                    .len();
                if *min_distinct > distinct {
                    problems.push(format!(
                        "min_distinct = {min_distinct} exceeds the {distinct} listed tags"
                    ));
                }
                if *min_distinct == 0 {
                    problems.push("min_distinct = 0 is always satisfied".to_string());
                }
            }
            Check::Comments { min_count } => {
                if *min_count == 0 {
                    problems.push("min_count = 0 is always satisfied".to_string());
                }
            }
            Check::TextContains { value } => {
                if blank(value) {
                    problems.push("text_contains check has an empty value".to_string());
                }
            }
        }

        problems
    }
}
