//! Minimal top-level template handling: just enough of the parse-tree
//! capability set to drive the engine offline. Nested templates and links
//! survive inside parameter values as raw text; only top-level templates
//! are addressable. Untouched templates serialize back byte for byte.

use geograph_sync::document::{Template, TemplateRef, WikiDocument};

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Template {
        /// Original slice of the page, kept so that serializing an
        /// untouched template changes nothing.
        raw: Option<String>,
        template: Template,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SimpleWikiDocument {
    nodes: Vec<Node>,
}

impl SimpleWikiDocument {
    pub fn parse(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut nodes = Vec::new();
        let mut plain_start = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
                if let Some(end) = find_close(bytes, i) {
                    if plain_start < i {
                        nodes.push(Node::Text(text[plain_start..i].to_string()));
                    }
                    let raw = &text[i..end];
                    nodes.push(Node::Template {
                        raw: Some(raw.to_string()),
                        template: parse_template(raw),
                    });
                    plain_start = end;
                    i = end;
                    continue;
                }
            }
            i += 1;
        }
        if plain_start < bytes.len() {
            nodes.push(Node::Text(text[plain_start..].to_string()));
        }
        Self { nodes }
    }
}

/// Index just past the "}}" matching the "{{" at `start`, or None when the
/// template never closes.
fn find_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'}' && bytes.get(i + 1) == Some(&b'}') {
            depth = depth.checked_sub(1)?;
            i += 2;
            if depth == 0 {
                return Some(i);
            }
        } else {
            i += 1;
        }
    }
    None
}

fn parse_template(raw: &str) -> Template {
    let inner = &raw[2..raw.len() - 2];
    let bytes = inner.as_bytes();

    // Split on '|' outside nested templates and links.
    let mut parts: Vec<&str> = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'[' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth += 1;
                i += 2;
            }
            b'}' | b']' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth -= 1;
                i += 2;
            }
            b'|' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    parts.push(&inner[start..]);

    let mut template = Template {
        name: parts[0].trim().to_string(),
        params: Vec::new(),
    };
    let mut position = 0;
    for part in &parts[1..] {
        let named = part.split_once('=').filter(|(key, _)| {
            let key = key.trim();
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == ' ')
        });
        match named {
            Some((key, value)) => template
                .params
                .push((key.trim().to_string(), value.trim().to_string())),
            None => {
                position += 1;
                template
                    .params
                    .push((position.to_string(), part.trim().to_string()));
            }
        }
    }
    template
}

fn render(template: &Template) -> String {
    let mut out = format!("{{{{{}", template.name);
    let mut next_position = 1;
    for (key, value) in &template.params {
        if *key == next_position.to_string() {
            out.push('|');
            out.push_str(value);
            next_position += 1;
        } else {
            out.push('|');
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
    }
    out.push_str("}}");
    out
}

impl WikiDocument for SimpleWikiDocument {
    fn templates(&self) -> Vec<TemplateRef> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| matches!(node, Node::Template { .. }).then_some(i))
            .collect()
    }

    fn name(&self, tpl: TemplateRef) -> String {
        match &self.nodes[tpl] {
            Node::Template { template, .. } => template.name.clone(),
            Node::Text(_) => String::new(),
        }
    }

    fn get_param(&self, tpl: TemplateRef, key: &str) -> Option<String> {
        match &self.nodes[tpl] {
            Node::Template { template, .. } => template.get(key).map(str::to_string),
            Node::Text(_) => None,
        }
    }

    fn set_param(&mut self, tpl: TemplateRef, key: &str, value: &str) {
        if let Node::Template { raw, template } = &mut self.nodes[tpl] {
            match template.params.iter_mut().find(|(k, _)| k == key) {
                Some((_, v)) => *v = value.to_string(),
                None => template.params.push((key.to_string(), value.to_string())),
            }
            // The original slice no longer reflects the template.
            *raw = None;
        }
    }

    fn replace(&mut self, tpl: TemplateRef, new: Template) {
        self.nodes[tpl] = Node::Template {
            raw: None,
            template: new,
        };
    }

    fn insert_before(&mut self, anchor: TemplateRef, new: Template) {
        self.nodes.insert(anchor, Node::Text("\n".to_string()));
        self.nodes.insert(
            anchor,
            Node::Template {
                raw: None,
                template: new,
            },
        );
    }

    fn insert_after(&mut self, anchor: TemplateRef, new: Template) {
        self.nodes.insert(
            anchor + 1,
            Node::Template {
                raw: None,
                template: new,
            },
        );
        self.nodes.insert(anchor + 1, Node::Text("\n".to_string()));
    }

    fn append(&mut self, new: Template) {
        if !self.nodes.is_empty() {
            self.nodes.push(Node::Text("\n".to_string()));
        }
        self.nodes.push(Node::Template {
            raw: None,
            template: new,
        });
    }

    fn remove(&mut self, tpl: TemplateRef) {
        self.nodes.remove(tpl);
    }

    fn serialize(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Template { raw: Some(raw), .. } => out.push_str(raw),
                Node::Template {
                    raw: None,
                    template,
                } => out.push_str(&render(template)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geograph_sync::document::{self, set_location};
    use geograph_sync::{LocationFact, Provenance, Role};

    fn fact(role: Role, lat: &str) -> LocationFact {
        LocationFact {
            role,
            latitude: lat.to_string(),
            longitude: "-2.2766".to_string(),
            precision: 100.0,
            digits: 8,
            provenance: Provenance {
                source: Some("geograph-osgb36(SO80980134)".to_string()),
                region: None,
                heading: None,
            },
        }
    }

    #[test]
    fn test_untouched_page_round_trips() {
        let text = "\n== {{int:filedesc}} ==\n{{Information\n|description={{en|1=A bin}}\n\
                    |date=2010-04-11\n}}\n{{Location dec|53.487763|-3.040917}}\n\n\
                    {{Geograph|1801330|Paul Glover}}\n";
        let doc = SimpleWikiDocument::parse(text);
        assert_eq!(doc.serialize(), text);
    }

    #[test]
    fn test_nested_templates_stay_nested() {
        let doc = SimpleWikiDocument::parse("{{Information|description={{en|1=A|2=B}}|date=x}}");
        let templates = doc.templates();
        assert_eq!(templates.len(), 1);
        assert_eq!(doc.name(templates[0]), "Information");
        assert_eq!(
            doc.get_param(templates[0], "description").as_deref(),
            Some("{{en|1=A|2=B}}")
        );
    }

    #[test]
    fn test_positional_and_named_params() {
        let doc = SimpleWikiDocument::parse(
            "{{Location|51.71051|-2.2766|source:geograph-osgb36(SO80980134)|prec=100}}",
        );
        let tpl = doc.templates()[0];
        assert_eq!(doc.get_param(tpl, "1").as_deref(), Some("51.71051"));
        assert_eq!(doc.get_param(tpl, "2").as_deref(), Some("-2.2766"));
        assert_eq!(doc.get_param(tpl, "prec").as_deref(), Some("100"));
        assert_eq!(doc.get_param(tpl, "4"), None);
    }

    #[test]
    fn test_replace_keeps_surrounding_text() {
        let mut doc = SimpleWikiDocument::parse("{{Information}}\n{{location dec}}");
        set_location(&mut doc, Role::Camera, Some(&fact(Role::Camera, "51.71051"))).unwrap();
        assert_eq!(
            doc.serialize(),
            "{{Information}}\n{{Location|51.71051|-2.2766|\
             source:geograph-osgb36(SO80980134)|prec=100}}"
        );
    }

    #[test]
    fn test_camera_inserts_before_object() {
        let mut doc = SimpleWikiDocument::parse("{{object location}}");
        set_location(&mut doc, Role::Camera, Some(&fact(Role::Camera, "51.71051"))).unwrap();
        assert_eq!(
            doc.serialize(),
            "{{Location|51.71051|-2.2766|source:geograph-osgb36(SO80980134)|prec=100}}\n\
             {{object location}}"
        );
    }

    #[test]
    fn test_object_inserts_after_camera() {
        let mut doc = SimpleWikiDocument::parse("{{Information}}\n{{location dec}}");
        set_location(&mut doc, Role::Object, Some(&fact(Role::Object, "51.71051"))).unwrap();
        assert_eq!(
            doc.serialize(),
            "{{Information}}\n{{location dec}}\n{{Object location|51.71051|-2.2766|\
             source:geograph-osgb36(SO80980134)|prec=100}}"
        );
    }

    #[test]
    fn test_removal_leaves_text_alone() {
        let mut doc =
            SimpleWikiDocument::parse("{{Information}}\n{{Location dec|53.48|-3.04}}\n\n[[Category:X]]");
        set_location(&mut doc, Role::Camera, None).unwrap();
        // The blank line the template sat on survives.
        assert_eq!(doc.serialize(), "{{Information}}\n\n\n[[Category:X]]");
    }

    #[test]
    fn test_object_falls_back_to_information_anchor() {
        let mut doc = SimpleWikiDocument::parse("{{Information}}\n\n[[Category:X]]");
        set_location(&mut doc, Role::Object, Some(&fact(Role::Object, "51.71051"))).unwrap();
        assert_eq!(
            doc.serialize(),
            "{{Information}}\n{{Object location|51.71051|-2.2766|\
             source:geograph-osgb36(SO80980134)|prec=100}}\n\n[[Category:X]]"
        );
    }

    #[test]
    fn test_set_param_rerenders_template() {
        let mut doc = SimpleWikiDocument::parse("text\n{{Location dec|53.487763|-3.040917}}\nmore");
        let tpl = doc.templates()[0];
        document::mark_archive_provenance(&mut doc, tpl);
        assert_eq!(
            doc.serialize(),
            "text\n{{Location dec|53.487763|-3.040917|source:geograph}}\nmore"
        );
    }

    #[test]
    fn test_image_id_from_page() {
        let doc = SimpleWikiDocument::parse("{{Geograph|1801330|Paul Glover}}");
        assert_eq!(document::image_id(&doc).unwrap(), 1801330);
    }
}
