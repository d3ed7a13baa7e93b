use std::fmt;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::wire::{XmlError, MAX_DEPTH};

/// A parsed XML element: name, child elements and the text directly inside it.
///
/// Attributes, comments and processing instructions carry no meaning in XML-RPC and are dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content directly inside this element, excluding child elements.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Element> {
        self.children
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Parse a complete document and return its root element.
    ///
    /// Documents nested deeper than [MAX_DEPTH] are rejected while reading, before the tree
    /// is built.
    pub fn parse(document: &str) -> Result<Element, XmlError> {
        let mut reader = Reader::from_str(document);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    check_depth(&stack)?;
                    stack.push(Element::new(element_name(&start)?));
                }
                Event::Empty(start) => {
                    check_depth(&stack)?;
                    let element = Element::new(element_name(&start)?);
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::Unbalanced)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    } else if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(XmlError::TextOutsideRoot);
                    }
                }
                Event::CData(data) => {
                    let current = stack.last_mut().ok_or(XmlError::TextOutsideRoot)?;
                    current
                        .text
                        .push_str(&String::from_utf8(data.into_inner().into_owned())?);
                }
                Event::Eof => break,
                // Declarations, comments, doctypes and processing instructions
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Unbalanced);
        }

        root.ok_or(XmlError::Empty)
    }

    /// Serialize this element (without an XML declaration).
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        self.write(&mut writer)?;

        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
        if self.children.is_empty() && self.text.is_empty() {
            return writer
                .write_event(Event::Empty(BytesStart::new(self.name.as_str())))
                .map_err(XmlError::write);
        }

        writer
            .write_event(Event::Start(BytesStart::new(self.name.as_str())))
            .map_err(XmlError::write)?;

        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(XmlError::write)?;
        }

        for child in &self.children {
            child.write(writer)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(XmlError::write)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_xml() {
            Ok(xml) => f.write_str(&xml),
            Err(_) => write!(f, "<{}/>", self.name),
        }
    }
}

fn check_depth(stack: &[Element]) -> Result<(), XmlError> {
    if stack.len() >= MAX_DEPTH {
        return Err(XmlError::TooDeep(MAX_DEPTH));
    }

    Ok(())
}

fn element_name(start: &BytesStart<'_>) -> Result<String, XmlError> {
    Ok(String::from_utf8(start.name().as_ref().to_vec())?)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::MultipleRoots),
    }
}

#[cfg(test)]
mod tests {
    use super::Element;
    use crate::wire::{XmlError, MAX_DEPTH};

    fn nested(depth: usize, innermost: &str) -> String {
        format!("{}{innermost}{}", "<a>".repeat(depth), "</a>".repeat(depth))
    }

    #[test]
    fn parse_nested_document() {
        let root = Element::parse(
            r#"<?xml version="1.0"?>
            <!-- a comment -->
            <methodCall>
                <methodName>echo</methodName>
                <params><param><value><i4>42</i4></value></param></params>
            </methodCall>"#,
        )
        .unwrap();

        assert_eq!(root.name(), "methodCall");
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child("methodName").unwrap().text(), "echo");

        let value = root
            .child("params")
            .and_then(|p| p.child("param"))
            .and_then(|p| p.child("value"))
            .unwrap();
        assert_eq!(value.children()[0].name(), "i4");
        assert_eq!(value.children()[0].text(), "42");
    }

    #[test]
    fn text_is_unescaped_and_cdata_kept() {
        let root =
            Element::parse("<string>a &amp; b &lt;c&gt;<![CDATA[ <raw> ]]></string>").unwrap();

        assert_eq!(root.text(), "a & b <c> <raw> ");
    }

    #[test]
    fn round_trip_escapes_text() {
        let element = Element::new("value").with_child(Element::with_text("string", "1 < 2 & 3"));
        let xml = element.to_xml().unwrap();

        assert_eq!(xml, "<value><string>1 &lt; 2 &amp; 3</string></value>");
        assert_eq!(Element::parse(&xml).unwrap(), element);
    }

    #[test]
    fn empty_element_is_self_closing() {
        assert_eq!(Element::new("nil").to_xml().unwrap(), "<nil/>");
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(Element::parse("<a><b></a>").is_err());
        assert!(matches!(Element::parse(""), Err(XmlError::Empty)));
        assert!(matches!(
            Element::parse("<a/><b/>"),
            Err(XmlError::MultipleRoots)
        ));
        assert!(Element::parse("<a>").is_err());
    }

    #[test]
    fn nesting_up_to_the_limit_is_accepted() {
        let root = Element::parse(&nested(MAX_DEPTH - 1, "<b/>")).unwrap();

        let mut depth = 1;
        let mut current = &root;
        while let Some(child) = current.children().first() {
            depth += 1;
            current = child;
        }
        assert_eq!(depth, MAX_DEPTH);
    }

    #[test]
    fn nesting_past_the_limit_is_rejected() {
        assert!(matches!(
            Element::parse(&nested(MAX_DEPTH, "<b/>")),
            Err(XmlError::TooDeep(MAX_DEPTH))
        ));
        assert!(matches!(
            Element::parse(&nested(MAX_DEPTH + 1, "")),
            Err(XmlError::TooDeep(MAX_DEPTH))
        ));
    }

    #[test]
    fn very_deep_documents_do_not_exhaust_the_stack() {
        let document = nested(20_000, "<i4>1</i4>");

        // A small stack makes unbounded recursion fail loudly
        let result = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || matches!(Element::parse(&document), Err(XmlError::TooDeep(_))))
            .unwrap()
            .join()
            .unwrap();

        assert!(result);
    }
}
