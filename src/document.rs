use crate::error::LocationError;
use crate::model::{ExistingLocation, LocationFact, Role};

/// Opaque handle to a template inside a document. Handles are only valid
/// until the document is next mutated.
pub type TemplateRef = usize;

/// Template names identifying the archive's own tag on a page.
const ARCHIVE_TEMPLATES: &[&str] = &["Geograph", "Also geograph"];

/// A template value to be written into a document. Keys are positional
/// ("1", "2", ...) or named ("prec").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl Template {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The capability set the engine needs from a parse tree. The real tree
/// belongs to the wiki client; tests and the CLI carry small
/// implementations.
pub trait WikiDocument {
    /// All templates, in page order.
    fn templates(&self) -> Vec<TemplateRef>;
    fn name(&self, tpl: TemplateRef) -> String;
    fn get_param(&self, tpl: TemplateRef, key: &str) -> Option<String>;
    fn set_param(&mut self, tpl: TemplateRef, key: &str, value: &str);
    fn replace(&mut self, tpl: TemplateRef, new: Template);
    fn insert_before(&mut self, anchor: TemplateRef, new: Template);
    fn insert_after(&mut self, anchor: TemplateRef, new: Template);
    fn append(&mut self, new: Template);
    fn remove(&mut self, tpl: TemplateRef);
    fn serialize(&self) -> String;
}

/// Template titles match when they differ at most in the case of the first
/// letter.
pub fn title_match(a: &str, b: &str) -> bool {
    fn capitalize(s: &str) -> String {
        let mut chars = s.trim().chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }
    capitalize(a) == capitalize(b)
}

pub fn title_in(name: &str, names: &[&str]) -> bool {
    names.iter().any(|candidate| title_match(name, candidate))
}

/// All templates matching any of the given names, in page order.
pub fn find_templates<D: WikiDocument + ?Sized>(doc: &D, names: &[&str]) -> Vec<TemplateRef> {
    doc.templates()
        .into_iter()
        .filter(|&tpl| title_in(&doc.name(tpl), names))
        .collect()
}

/// The single template for a role, or an error when the page carries
/// several and we cannot tell which one is meant.
fn role_template<D: WikiDocument + ?Sized>(
    doc: &D,
    role: Role,
) -> Result<Option<TemplateRef>, LocationError> {
    let found = find_templates(doc, role.aliases());
    match found.len() {
        0 => Ok(None),
        1 => Ok(Some(found[0])),
        count => Err(LocationError::AmbiguousTemplates {
            name: role.template_name(),
            count,
        }),
    }
}

/// Extract the existing fact for a role from current page markup.
pub fn existing_location<D: WikiDocument + ?Sized>(
    doc: &D,
    role: Role,
) -> Result<Option<ExistingLocation>, LocationError> {
    let Some(tpl) = role_template(doc, role)? else {
        return Ok(None);
    };
    Ok(Some(ExistingLocation {
        role,
        template_name: doc.name(tpl).trim().to_string(),
        latitude: doc.get_param(tpl, "1").unwrap_or_default().trim().to_string(),
        longitude: doc.get_param(tpl, "2").unwrap_or_default().trim().to_string(),
        source_param: doc.get_param(tpl, "3").map(|v| v.trim().to_string()),
        // A fourth positional parameter means degrees/minutes/seconds.
        dms: doc.get_param(tpl, "4").is_some(),
    }))
}

/// The numeric image id from the {{Geograph|id|author}} template.
pub fn image_id<D: WikiDocument + ?Sized>(doc: &D) -> Result<u64, LocationError> {
    let found = find_templates(doc, ARCHIVE_TEMPLATES);
    match found.len() {
        0 => Err(LocationError::MissingTemplate("Geograph")),
        1 => doc
            .get_param(found[0], "1")
            .and_then(|value| value.trim().parse().ok())
            .ok_or(LocationError::BadTemplate("Geograph")),
        count => Err(LocationError::AmbiguousTemplates {
            name: "Geograph",
            count,
        }),
    }
}

/// Render a fact as the template the engine writes.
pub fn fact_template(fact: &LocationFact) -> Template {
    Template {
        name: fact.role.template_name().to_string(),
        params: vec![
            ("1".to_string(), fact.latitude.clone()),
            ("2".to_string(), fact.longitude.clone()),
            ("3".to_string(), fact.provenance.to_string()),
            ("prec".to_string(), fact.precision_string()),
        ],
    }
}

/// Tag a location template whose coordinates are known to come from the
/// archive by appending "source:geograph" to its attribute parameter — the
/// marker later runs trust when deciding whether an update is safe.
pub fn mark_archive_provenance<D: WikiDocument + ?Sized>(doc: &mut D, tpl: TemplateRef) {
    let mut param = doc.get_param(tpl, "3").unwrap_or_default().trim().to_string();
    if !param.is_empty() {
        param.push('_');
    }
    param.push_str("source:geograph");
    doc.set_param(tpl, "3", &param);
}

/// Write, replace or remove a role's template. A new camera template goes
/// before the object location, or failing that after {{Information}}; a new
/// object template goes after the camera location.
pub fn set_location<D: WikiDocument + ?Sized>(
    doc: &mut D,
    role: Role,
    fact: Option<&LocationFact>,
) -> Result<(), LocationError> {
    let current = role_template(doc, role)?;
    match (current, fact) {
        (Some(tpl), Some(fact)) => doc.replace(tpl, fact_template(fact)),
        (Some(tpl), None) => doc.remove(tpl),
        (None, Some(fact)) => {
            let other = role_template(doc, role.other())?;
            let template = fact_template(fact);
            let information = find_templates(doc, &["Information"]).first().copied();
            match (role, other) {
                (Role::Camera, Some(anchor)) => doc.insert_before(anchor, template),
                (Role::Object, Some(anchor)) => doc.insert_after(anchor, template),
                (_, None) => match information {
                    Some(anchor) => doc.insert_after(anchor, template),
                    None => doc.append(template),
                },
            }
        }
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Just enough of a parse tree for extraction tests. The CLI crate
    /// carries the text-preserving implementation.
    #[derive(Default)]
    struct TemplateList {
        templates: Vec<Template>,
    }

    impl TemplateList {
        fn with(templates: &[(&str, &[(&str, &str)])]) -> Self {
            Self {
                templates: templates
                    .iter()
                    .map(|(name, params)| Template {
                        name: name.to_string(),
                        params: params
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                    })
                    .collect(),
            }
        }
    }

    impl WikiDocument for TemplateList {
        fn templates(&self) -> Vec<TemplateRef> {
            (0..self.templates.len()).collect()
        }

        fn name(&self, tpl: TemplateRef) -> String {
            self.templates[tpl].name.clone()
        }

        fn get_param(&self, tpl: TemplateRef, key: &str) -> Option<String> {
            self.templates[tpl].get(key).map(str::to_string)
        }

        fn set_param(&mut self, tpl: TemplateRef, key: &str, value: &str) {
            let params = &mut self.templates[tpl].params;
            match params.iter_mut().find(|(k, _)| k == key) {
                Some((_, v)) => *v = value.to_string(),
                None => params.push((key.to_string(), value.to_string())),
            }
        }

        fn replace(&mut self, tpl: TemplateRef, new: Template) {
            self.templates[tpl] = new;
        }

        fn insert_before(&mut self, anchor: TemplateRef, new: Template) {
            self.templates.insert(anchor, new);
        }

        fn insert_after(&mut self, anchor: TemplateRef, new: Template) {
            self.templates.insert(anchor + 1, new);
        }

        fn append(&mut self, new: Template) {
            self.templates.push(new);
        }

        fn remove(&mut self, tpl: TemplateRef) {
            self.templates.remove(tpl);
        }

        fn serialize(&self) -> String {
            self.templates
                .iter()
                .map(|t| format!("{{{{{}}}}}", t.name))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    #[test]
    fn test_title_match_first_letter_case() {
        assert!(title_match("location dec", "Location dec"));
        assert!(title_match("Location dec", "Location dec"));
        assert!(!title_match("Location Dec", "Location dec"));
        assert!(!title_match("Object location", "Location"));
    }

    #[test]
    fn test_existing_location_extraction() {
        let doc = TemplateList::with(&[
            ("Information", &[]),
            (
                "location dec",
                &[
                    ("1", "51.71051"),
                    ("2", "-2.2766"),
                    ("3", "source:geograph-osgb36(SO80980134)_heading:292"),
                    ("prec", "100"),
                ],
            ),
        ]);
        let existing = existing_location(&doc, Role::Camera).unwrap().unwrap();
        assert_eq!(existing.template_name, "location dec");
        assert_eq!(existing.latitude, "51.71051");
        assert_eq!(existing.longitude, "-2.2766");
        assert!(existing.is_archive_provenanced());
        assert!(!existing.dms);
        assert_eq!(existing.provenance().heading, Some(292));

        assert!(existing_location(&doc, Role::Object).unwrap().is_none());
    }

    #[test]
    fn test_dms_template_is_flagged() {
        let doc = TemplateList::with(&[(
            "Location",
            &[("1", "51"), ("2", "42"), ("3", "37.8"), ("4", "N")],
        )]);
        let existing = existing_location(&doc, Role::Camera).unwrap().unwrap();
        assert!(existing.dms);
    }

    #[test]
    fn test_ambiguous_templates_are_an_error() {
        let doc = TemplateList::with(&[
            ("Location", &[("1", "51.0"), ("2", "-2.0")]),
            ("location dec", &[("1", "51.1"), ("2", "-2.1")]),
        ]);
        assert!(matches!(
            existing_location(&doc, Role::Camera),
            Err(LocationError::AmbiguousTemplates { count: 2, .. })
        ));
    }

    #[test]
    fn test_mark_archive_provenance() {
        // A bare template gains the source parameter.
        let mut doc = TemplateList::with(&[(
            "Location dec",
            &[("1", "53.487763"), ("2", "-3.040917")],
        )]);
        let tpl = doc.templates()[0];
        mark_archive_provenance(&mut doc, tpl);
        assert_eq!(doc.get_param(tpl, "3").as_deref(), Some("source:geograph"));

        // An existing attribute parameter keeps its other entries.
        let mut doc = TemplateList::with(&[(
            "Location dec",
            &[("1", "53.487763"), ("2", "-3.040917"), ("3", "heading:90")],
        )]);
        let tpl = doc.templates()[0];
        mark_archive_provenance(&mut doc, tpl);
        assert_eq!(
            doc.get_param(tpl, "3").as_deref(),
            Some("heading:90_source:geograph")
        );
        let existing = existing_location(&doc, Role::Camera).unwrap().unwrap();
        assert!(existing.is_archive_provenanced());
    }

    #[test]
    fn test_image_id() {
        let doc = TemplateList::with(&[("Geograph", &[("1", "1801330"), ("2", "Paul Glover")])]);
        assert_eq!(image_id(&doc).unwrap(), 1801330);

        let doc = TemplateList::with(&[("Information", &[])]);
        assert!(matches!(
            image_id(&doc),
            Err(LocationError::MissingTemplate("Geograph"))
        ));

        let doc = TemplateList::with(&[("Geograph", &[("1", "not-a-number")])]);
        assert!(matches!(
            image_id(&doc),
            Err(LocationError::BadTemplate("Geograph"))
        ));
    }
}
