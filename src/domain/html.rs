//! Lenient HTML fragment parser.
//!
//! Never fails: malformed markup degrades to text or is dropped, the way a
//! browser's `innerHTML` setter would recover.

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is not parsed as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<Fragment>,
    },
    Text(String),
}

impl Fragment {
    fn element(tag: String, attributes: Vec<(String, String)>) -> Self {
        Fragment::Element {
            tag,
            attributes,
            children: Vec::new(),
        }
    }
}

/// Parse `input` into a sequence of top-level nodes.
pub fn parse_fragment(input: &str) -> Vec<Fragment> {
    Parser::new(input).run()
}

struct Parser<'a> {
    input: &'a str,
    position: usize,
    /// Open elements; index 0 collects the top-level nodes.
    stack: Vec<Fragment>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            stack: vec![Fragment::element(String::new(), Vec::new())],
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn run(mut self) -> Vec<Fragment> {
        while self.position < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_past("-->", 4);
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">", 2);
            } else if rest.starts_with("</") {
                self.end_tag();
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.start_tag();
            } else {
                self.text();
            }
        }
        while self.stack.len() > 1 {
            self.close_top();
        }
        match self.stack.pop() {
            Some(Fragment::Element { children, .. }) => children,
            _ => Vec::new(),
        }
    }

    fn skip_past(&mut self, terminator: &str, from: usize) {
        let rest = self.rest();
        self.position += rest[from.min(rest.len())..]
            .find(terminator)
            .map_or(rest.len(), |i| from + i + terminator.len());
    }

    fn push_node(&mut self, node: Fragment) {
        if let Some(Fragment::Element { children, .. }) = self.stack.last_mut() {
            match (children.last_mut(), node) {
                (Some(Fragment::Text(previous)), Fragment::Text(more)) => previous.push_str(&more),
                (_, node) => children.push(node),
            }
        }
    }

    fn close_top(&mut self) {
        if let Some(node) = self.stack.pop() {
            self.push_node(node);
        }
    }

    fn text(&mut self) {
        let rest = self.rest();
        // A lone '<' that does not open markup is text.
        let start = usize::from(rest.starts_with('<'));
        let end = rest[start..].find('<').map_or(rest.len(), |i| start + i);
        self.push_node(Fragment::Text(decode_entities(&rest[..end])));
        self.position += end;
    }

    fn end_tag(&mut self) {
        let rest = self.rest();
        let end = rest.find('>').map_or(rest.len(), |i| i + 1);
        let name = rest[2..end]
            .trim_end_matches('>')
            .trim()
            .to_ascii_lowercase();
        self.position += end;

        let open = self.stack.iter().rposition(|node| match node {
            Fragment::Element { tag, .. } => *tag == name,
            Fragment::Text(_) => false,
        });
        // Index 0 is the fragment container, never closed by markup.
        if let Some(index) = open.filter(|&i| i > 0) {
            while self.stack.len() > index {
                self.close_top();
            }
        }
    }

    fn start_tag(&mut self) {
        let bytes = self.input.as_bytes();
        let mut pos = self.position + 1;
        let name_start = pos;
        while pos < bytes.len() && !is_tag_delimiter(bytes[pos]) {
            pos += 1;
        }
        let tag = self.input[name_start..pos].to_ascii_lowercase();

        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;
        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                break;
            }
            match bytes[pos] {
                b'>' => {
                    pos += 1;
                    break;
                }
                b'/' => {
                    pos += 1;
                    if bytes.get(pos) == Some(&b'>') {
                        self_closing = true;
                        pos += 1;
                        break;
                    }
                }
                _ => {
                    let name_start = pos;
                    while pos < bytes.len()
                        && !is_tag_delimiter(bytes[pos])
                        && bytes[pos] != b'='
                    {
                        pos += 1;
                    }
                    let name = self.input[name_start..pos].to_ascii_lowercase();
                    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                    let mut value = String::new();
                    if bytes.get(pos) == Some(&b'=') {
                        pos += 1;
                        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                            pos += 1;
                        }
                        let value_start;
                        match bytes.get(pos) {
                            Some(&quote) if quote == b'"' || quote == b'\'' => {
                                value_start = pos + 1;
                                pos = self.input[value_start..]
                                    .find(quote as char)
                                    .map_or(bytes.len(), |i| value_start + i);
                                value = decode_entities(&self.input[value_start..pos]);
                                pos = (pos + 1).min(bytes.len());
                            }
                            _ => {
                                value_start = pos;
                                while pos < bytes.len()
                                    && !bytes[pos].is_ascii_whitespace()
                                    && bytes[pos] != b'>'
                                {
                                    pos += 1;
                                }
                                value = decode_entities(&self.input[value_start..pos]);
                            }
                        }
                    }
                    if !name.is_empty() && !attributes.iter().any(|(k, _)| *k == name) {
                        attributes.push((name, value));
                    }
                }
            }
        }
        self.position = pos;

        if is_void(&tag) || self_closing {
            self.push_node(Fragment::element(tag, attributes));
            return;
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let rest = self.rest();
            let closing = format!("</{}", tag);
            let end = rest.to_ascii_lowercase().find(&closing).unwrap_or(rest.len());
            let mut element = Fragment::element(tag, attributes);
            if end > 0 {
                if let Fragment::Element { children, .. } = &mut element {
                    children.push(Fragment::Text(rest[..end].to_string()));
                }
            }
            self.position += end;
            self.stack.push(element);
            // The end tag itself is consumed by `end_tag`.
            return;
        }

        self.stack.push(Fragment::element(tag, attributes));
    }
}

fn is_tag_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == b'>' || byte == b'/'
}

/// Decode the common named entities and numeric character references.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|number| {
                    let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => number.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text content for serialization.
pub fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for a double-quoted serialization.
pub fn escape_attribute(input: &str) -> String {
    input.replace('&', "&amp;").replace('"', "&quot;")
}
