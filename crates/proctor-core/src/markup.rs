//! Tolerant markup scanner and element tree.
//!
//! Every rubric check inspects the same parsed view of a submission. Parsing
//! never fails: unterminated constructs run to the end of input, stray end
//! tags are dropped, and elements still open at EOF are closed there.

use std::ops::Range;

/// Elements that never have content and never go on the open stack.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Block-level elements whose start tag closes an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre", "section",
    "table", "ul",
];

/// A single attribute on a start tag. `value` is `None` for bare attributes
/// such as `required`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// An element in the parsed tree.
#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercased tag name.
    pub name: String,
    /// Attributes in source order, names lowercased.
    pub attributes: Vec<Attribute>,
    /// Index of the enclosing element, if any.
    pub parent: Option<usize>,
    /// One past the index of the last descendant.
    end: usize,
    /// Byte range of this element's text within the document text.
    text: Range<usize>,
}

impl Element {
    /// Value of an attribute. Bare attributes yield `Some("")`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A parsed submission.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    source: &'a str,
    doctype: Option<String>,
    elements: Vec<Element>,
    comments: usize,
    text: String,
}

impl<'a> Document<'a> {
    /// Parse a document. Never fails.
    pub fn parse(source: &'a str) -> Self {
        let mut builder = TreeBuilder::default();
        Scanner::new(source).run(&mut builder);
        builder.finish(source)
    }

    /// The original, unmodified text.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The doctype declaration body, e.g. `html` for `<!DOCTYPE html>`.
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn comment_count(&self) -> usize {
        self.comments
    }

    /// All elements in document order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: usize) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Text content of an element and its descendants, with runs of
    /// whitespace collapsed to single spaces.
    pub fn text_of(&self, element: &Element) -> String {
        collapse_whitespace(self.text.get(element.text.clone()).unwrap_or(""))
    }

    /// Elements with the given tag name, with their ids.
    pub fn elements_named<'s>(
        &'s self,
        name: &'s str,
    ) -> impl Iterator<Item = (usize, &'s Element)> + 's {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.is(name))
    }

    /// All descendants of an element, in document order.
    pub fn descendants(&self, id: usize) -> impl Iterator<Item = (usize, &Element)> + '_ {
        let (start, end) = match self.elements.get(id) {
            Some(e) => (id + 1, e.end),
            None => (0, 0),
        };
        self.elements[start..end]
            .iter()
            .enumerate()
            .map(move |(offset, e)| (start + offset, e))
    }

    /// Ancestors of an element, nearest first.
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = (usize, &Element)> + '_ {
        let mut next = self.elements.get(id).and_then(|e| e.parent);
        std::iter::from_fn(move || {
            let current = next?;
            let element = &self.elements[current];
            next = element.parent;
            Some((current, element))
        })
    }

    /// The nearest ancestor satisfying `pred`.
    pub fn nearest_ancestor(&self, id: usize, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        self.ancestors(id).find(|(_, e)| pred(e)).map(|(i, _)| i)
    }

    /// All text outside of tags, comments and raw-text elements, collapsed.
    pub fn text(&self) -> String {
        collapse_whitespace(&self.text)
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of character references a learner is likely to type.
/// Unknown references are left as written.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let name = &after[..semi];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => {
                    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = name.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TreeBuilder {
    elements: Vec<Element>,
    open: Vec<usize>,
    doctype: Option<String>,
    comments: usize,
    text: String,
}

impl TreeBuilder {
    fn start_tag(&mut self, name: String, attributes: Vec<Attribute>, self_closing: bool) {
        self.implicit_closes(&name);

        let id = self.elements.len();
        let is_void = VOID_ELEMENTS.contains(&name.as_str());
        self.elements.push(Element {
            name,
            attributes,
            parent: self.open.last().copied(),
            end: id + 1,
            text: self.text.len()..self.text.len(),
        });

        if !is_void && !self_closing {
            self.open.push(id);
        }
    }

    fn end_tag(&mut self, name: &str) {
        // Stray end tags with no matching open element are dropped.
        if let Some(pos) = self.open.iter().rposition(|&id| self.elements[id].is(name)) {
            self.close_to(pos);
        }
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        self.text.push_str(&decode_entities(raw));
    }

    /// Close every element from stack position `pos` upward.
    fn close_to(&mut self, pos: usize) {
        let end = self.elements.len();
        let text_end = self.text.len();
        for id in self.open.drain(pos..) {
            let element = &mut self.elements[id];
            element.end = end;
            element.text.end = text_end;
        }
    }

    /// Close an open `target` element when it sits above the last open
    /// `boundary` element on the stack.
    fn close_within(&mut self, targets: &[&str], boundaries: &[&str]) {
        let target = self
            .open
            .iter()
            .rposition(|&id| targets.contains(&self.elements[id].name.as_str()));
        let boundary = self
            .open
            .iter()
            .rposition(|&id| boundaries.contains(&self.elements[id].name.as_str()));

        if let Some(t) = target {
            if boundary.map_or(true, |b| t > b) {
                self.close_to(t);
            }
        }
    }

    fn implicit_closes(&mut self, name: &str) {
        match name {
            "li" => self.close_within(&["li"], &["ul", "ol", "menu"]),
            "option" => self.close_within(&["option"], &["select", "datalist"]),
            "tr" => self.close_within(&["tr"], &["table", "thead", "tbody", "tfoot"]),
            "td" | "th" => self.close_within(&["td", "th"], &["tr", "table"]),
            "dt" | "dd" => self.close_within(&["dt", "dd"], &["dl"]),
            _ => {}
        }

        if CLOSES_PARAGRAPH.contains(&name) {
            if let Some(&top) = self.open.last() {
                if self.elements[top].is("p") {
                    self.close_to(self.open.len() - 1);
                }
            }
        }
    }

    fn finish(mut self, source: &str) -> Document<'_> {
        self.close_to(0);
        Document {
            source,
            doctype: self.doctype,
            elements: self.elements,
            comments: self.comments,
            text: self.text,
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn run(mut self, builder: &mut TreeBuilder) {
        while self.pos < self.bytes.len() {
            let Some(offset) = self.src[self.pos..].find('<') else {
                builder.text(&self.src[self.pos..]);
                break;
            };
            let lt = self.pos + offset;
            builder.text(&self.src[self.pos..lt]);
            self.pos = lt;

            let rest = &self.src[lt..];
            if rest.starts_with("<!--") {
                self.comment(builder);
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.declaration(builder);
            } else if rest.starts_with("</") && self.is_name_start(lt + 2) {
                self.end_tag(builder);
            } else if self.is_name_start(lt + 1) {
                self.start_tag(builder);
            } else {
                // A lone `<` is just text.
                builder.text("<");
                self.pos = lt + 1;
            }
        }
    }

    fn is_name_start(&self, at: usize) -> bool {
        self.bytes.get(at).is_some_and(u8::is_ascii_alphabetic)
    }

    fn comment(&mut self, builder: &mut TreeBuilder) {
        let body = self.pos + 4;
        builder.comments += 1;
        self.pos = match self.src[body..].find("-->") {
            Some(end) => body + end + 3,
            None => self.bytes.len(),
        };
    }

    fn declaration(&mut self, builder: &mut TreeBuilder) {
        let body = self.pos + 2;
        let end = self.src[body..]
            .find('>')
            .map_or(self.bytes.len(), |e| body + e);
        let inner = self.src[body..end].trim();
        if inner
            .get(..7)
            .is_some_and(|head| head.eq_ignore_ascii_case("doctype"))
        {
            builder.doctype = Some(inner[7..].trim().to_ascii_lowercase());
        }
        self.pos = (end + 1).min(self.bytes.len());
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b':' | b'_' | b'.'))
        {
            self.pos += 1;
        }
        self.src[start..self.pos].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn end_tag(&mut self, builder: &mut TreeBuilder) {
        self.pos += 2;
        let name = self.read_name();
        self.pos = self.src[self.pos..]
            .find('>')
            .map_or(self.bytes.len(), |e| self.pos + e + 1);
        builder.end_tag(&name);
    }

    fn start_tag(&mut self, builder: &mut TreeBuilder) {
        self.pos += 1;
        let name = self.read_name();
        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                None => break,
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'>') {
                        self_closing = true;
                        self.pos += 1;
                        break;
                    }
                }
                Some(_) => {
                    if let Some(attr) = self.attribute() {
                        if !attributes.iter().any(|a: &Attribute| a.name == attr.name) {
                            attributes.push(attr);
                        }
                    }
                }
            }
        }

        let raw_text = RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing;
        builder.start_tag(name.clone(), attributes, self_closing);

        if raw_text {
            self.skip_raw_text(&name);
            builder.end_tag(&name);
        }
    }

    fn attribute(&mut self) -> Option<Attribute> {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            // Unexpected byte such as a stray `=`; step over it.
            self.pos += 1;
            return None;
        }
        let name = self.src[start..self.pos].to_ascii_lowercase();

        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'=') {
            return Some(Attribute { name, value: None });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.bytes.get(self.pos) {
            Some(&q @ (b'"' | b'\'')) => {
                let body = self.pos + 1;
                let quote = q as char;
                let end = self.src[body..]
                    .find(quote)
                    .map_or(self.bytes.len(), |e| body + e);
                self.pos = (end + 1).min(self.bytes.len());
                &self.src[body..end]
            }
            _ => {
                let body = self.pos;
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
                {
                    self.pos += 1;
                }
                &self.src[body..self.pos]
            }
        };

        Some(Attribute {
            name,
            value: Some(decode_entities(value)),
        })
    }

    /// Skip to just past `</name ...>`, or to EOF.
    fn skip_raw_text(&mut self, name: &str) {
        let needle = format!("</{name}");
        let haystack = self.src[self.pos..].to_ascii_lowercase();
        match haystack.find(&needle) {
            Some(offset) => {
                let close = self.pos + offset;
                self.pos = self.src[close..]
                    .find('>')
                    .map_or(self.bytes.len(), |e| close + e + 1);
            }
            None => self.pos = self.bytes.len(),
        }
    }
}
