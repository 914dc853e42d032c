//! SKOS thesaurus to Solr synonyms.
//!
//! Reads an RDF/XML thesaurus, collects each concept's first `skos:prefLabel` plus all of
//! its `skos:altLabel`s, and writes one comma-separated line per concept that has at
//! least one alternative. Descriptions sharing an `rdf:about` are merged.

use crate::error::{RagError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::path::Path;

/// One concept's labels, preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SynonymGroup {
    pub preferred: String,
    pub alternatives: Vec<String>,
}

impl SynonymGroup {
    /// Every label, preferred first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.preferred.as_str()).chain(self.alternatives.iter().map(String::as_str))
    }

    /// `"pref, alt1, alt2"`, with literal commas escaped for Solr.
    pub fn to_solr_line(&self) -> String {
        self.labels()
            .map(|l| l.replace(',', "\\,"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Default)]
struct ConceptLabels {
    preferred: Option<String>,
    alternatives: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum LabelKind {
    Preferred,
    Alternative,
}

fn is_concept(name: &[u8]) -> bool {
    name == b"Concept" || name == b"Description"
}

fn label_kind(name: &[u8]) -> Option<LabelKind> {
    match name {
        b"prefLabel" => Some(LabelKind::Preferred),
        b"altLabel" => Some(LabelKind::Alternative),
        _ => None,
    }
}

fn about(start: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| RagError::Thesaurus(e.to_string()))?;
        if attr.key.local_name().as_ref() == b"about" {
            let value = attr
                .unescape_value()
                .map_err(|e| RagError::Thesaurus(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse an RDF/XML thesaurus into synonym groups of two or more labels.
pub fn parse_thesaurus(xml: &str) -> Result<Vec<SynonymGroup>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut concepts: Vec<ConceptLabels> = Vec::new();
    let mut by_about: HashMap<String, usize> = HashMap::new();
    // Indices into `concepts` for the currently open concept elements.
    let mut open: Vec<usize> = Vec::new();
    let mut label: Option<(LabelKind, String)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            RagError::Thesaurus(format!(
                "malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(start) => {
                let name = start.local_name();
                if is_concept(name.as_ref()) {
                    let index = match about(&start)? {
                        Some(key) => *by_about.entry(key).or_insert_with(|| {
                            concepts.push(ConceptLabels::default());
                            concepts.len() - 1
                        }),
                        None => {
                            concepts.push(ConceptLabels::default());
                            concepts.len() - 1
                        }
                    };
                    open.push(index);
                } else if let Some(kind) = label_kind(name.as_ref()) {
                    if !open.is_empty() {
                        label = Some((kind, String::new()));
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, buf)) = label.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| RagError::Thesaurus(e.to_string()))?;
                    buf.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some((_, buf)) = label.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(end) => {
                let name = end.local_name();
                if is_concept(name.as_ref()) {
                    open.pop();
                } else if label_kind(name.as_ref()).is_some() {
                    if let (Some((kind, text)), Some(&index)) = (label.take(), open.last()) {
                        let text = text.trim().to_string();
                        if text.is_empty() {
                            continue;
                        }
                        let concept = &mut concepts[index];
                        match kind {
                            LabelKind::Preferred if concept.preferred.is_none() => {
                                concept.preferred = Some(text)
                            }
                            LabelKind::Preferred => {}
                            LabelKind::Alternative => concept.alternatives.push(text),
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let groups: Vec<SynonymGroup> = concepts
        .into_iter()
        .filter_map(|c| {
            let preferred = c.preferred?;
            let mut alternatives: Vec<String> = Vec::new();
            for alt in c.alternatives {
                if alt != preferred && !alternatives.contains(&alt) {
                    alternatives.push(alt);
                }
            }
            (!alternatives.is_empty()).then_some(SynonymGroup {
                preferred,
                alternatives,
            })
        })
        .collect();

    tracing::info!(groups = groups.len(), "parsed thesaurus");
    Ok(groups)
}

/// Read and parse a thesaurus file.
pub fn load_thesaurus(path: &Path) -> Result<Vec<SynonymGroup>> {
    let xml = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
    parse_thesaurus(&xml)
}

/// Write groups as a Solr `synonyms.txt`.
pub fn write_synonyms(groups: &[SynonymGroup], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
    }

    let mut content = String::new();
    for group in groups {
        content.push_str(&group.to_solr_line());
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|e| RagError::io(path, e))
}
