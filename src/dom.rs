use scraper::{ElementRef, Html};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// A detached copy of parsed markup. Chapters are transformed on this tree so
/// nothing downstream ever touches the reader's live document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(idx).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(element) => collect_text(&element.children, out),
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) => {}
        }
    }
}

pub fn parse_fragment(markup: &str) -> Vec<Node> {
    let fragment = Html::parse_fragment(markup);
    convert_children(fragment.root_element())
}

fn convert_children(parent: ElementRef<'_>) -> Vec<Node> {
    let mut out = Vec::new();
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            out.push(Node::Element(convert_element(element)));
            continue;
        }
        match child.value() {
            scraper::Node::Text(text) => out.push(Node::Text(String::from(&**text))),
            scraper::Node::Comment(comment) => out.push(Node::Comment(String::from(&**comment))),
            _ => {}
        }
    }
    out
}

fn convert_element(element: ElementRef<'_>) -> Element {
    let value = element.value();

    // Foreign attributes (`xlink:href`, `xml:space`, `xmlns:xlink`) are filed
    // under their local name; the prefix has to be put back when serializing.
    let mut attrs: Vec<(String, String)> = value
        .attrs
        .iter()
        .map(|(name, attr_value)| {
            let qualified = match &name.prefix {
                Some(prefix) => format!("{}:{}", &**prefix, &*name.local),
                None => name.local.to_string(),
            };
            (qualified, String::from(&**attr_value))
        })
        .collect();
    // Parser attribute order is unspecified; sort for reproducible output.
    attrs.sort();

    Element {
        name: value.name().to_owned(),
        attrs,
        children: convert_children(element),
    }
}

/// Calls `f` on every element in document order (parents before children).
pub fn for_each_element_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let Node::Element(element) = node {
            f(element);
            for_each_element_mut(&mut element.children, f);
        }
    }
}

pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    serialize_into(nodes, false, &mut out);
    out
}

fn serialize_into(nodes: &[Node], raw_text: bool, out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(element) => serialize_element(element, out),
            Node::Text(text) if raw_text => out.push_str(text),
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
        }
    }
}

fn serialize_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&element.name.as_str()) {
        return;
    }

    let raw_text = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
    serialize_into(&element.children, raw_text, out);
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
