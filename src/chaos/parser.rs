//! CHAOS format parser
//!
//! A CHAOS document is line-oriented text in three sections:
//! - structured core: `[key]: value` lines
//! - `---EMOTIVE_LAYER---`: `[EMOTION:type:INTENSITY]`,
//!   `[SYMBOL:type:PRESENCE]` and `[RELATIONSHIP:source:type:target]` tags
//! - `---CHAOSFIELD_LAYER---`: free text
//!
//! Tag lines are recognized wherever they appear; section markers only
//! affect how non-tag lines are interpreted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Valid emotion intensities, strongest first
pub const INTENSITIES: [&str; 5] = ["EXTREME", "HIGH", "MEDIUM", "LOW", "MINIMAL"];

/// Valid symbol presences
pub const PRESENCES: [&str; 3] = ["STRONG", "PRESENT", "WEAK"];

/// An `[EMOTION:type:INTENSITY]` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionTag {
    #[serde(rename = "type")]
    pub emotion_type: String,
    pub intensity: String,
}

/// A `[SYMBOL:type:PRESENCE]` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTag {
    #[serde(rename = "type")]
    pub symbol_type: String,
    pub presence: String,
}

/// A `[RELATIONSHIP:source:type:target]` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTag {
    pub source: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub target: String,
}

/// The tag-bearing middle section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotiveLayer {
    pub emotions: Vec<EmotionTag>,
    pub symbols: Vec<SymbolTag>,
    pub relationships: Vec<RelationshipTag>,
}

/// A parsed CHAOS document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosDocument {
    pub structured_core: BTreeMap<String, String>,
    pub emotive_layer: EmotiveLayer,
    pub chaosfield_layer: String,
}

/// A single validated tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParsedTag {
    #[serde(rename = "EMOTION")]
    Emotion {
        emotion_type: String,
        intensity: String,
        valid: bool,
    },
    #[serde(rename = "SYMBOL")]
    Symbol {
        symbol_type: String,
        presence: String,
        valid: bool,
    },
    #[serde(rename = "RELATIONSHIP")]
    Relationship {
        source: String,
        relationship_type: String,
        target: String,
        valid: bool,
    },
    #[serde(rename = "UNKNOWN")]
    Unknown { valid: bool },
}

enum Section {
    StructuredCore,
    EmotiveLayer,
    ChaosfieldLayer,
}

/// Parse a CHAOS document
///
/// Returns `None` for empty input.
pub fn parse(content: &str) -> Option<ChaosDocument> {
    if content.is_empty() {
        return None;
    }

    let mut doc = ChaosDocument::default();
    let mut section = Section::StructuredCore;
    let mut chaosfield: Vec<&str> = Vec::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();

        if line.starts_with("---EMOTIVE_LAYER---") {
            section = Section::EmotiveLayer;
        } else if line.starts_with("---CHAOSFIELD_LAYER---") {
            section = Section::ChaosfieldLayer;
        } else if line.starts_with("[EMOTION:") {
            let inner = trim_brackets(line);
            let parts: Vec<&str> = inner.split(':').collect();
            if parts.len() >= 3 {
                doc.emotive_layer.emotions.push(EmotionTag {
                    emotion_type: parts[1].to_string(),
                    intensity: parts[2].to_string(),
                });
            }
        } else if line.starts_with("[SYMBOL:") {
            let inner = trim_brackets(line);
            let parts: Vec<&str> = inner.split(':').collect();
            if parts.len() >= 3 {
                doc.emotive_layer.symbols.push(SymbolTag {
                    symbol_type: parts[1].to_string(),
                    presence: parts[2].to_string(),
                });
            }
        } else if line.starts_with("[RELATIONSHIP:") {
            let inner = trim_brackets(line);
            let parts: Vec<&str> = inner.split(':').collect();
            if parts.len() >= 4 {
                doc.emotive_layer.relationships.push(RelationshipTag {
                    source: parts[1].to_string(),
                    relationship_type: parts[2].to_string(),
                    target: parts[3].to_string(),
                });
            }
        } else if matches!(section, Section::ChaosfieldLayer) {
            chaosfield.push(line);
        } else if matches!(section, Section::StructuredCore) && line.starts_with('[') {
            if let Some(close) = line.find("]:") {
                let key = &line[1..close];
                let value = line[close + 2..].trim();
                doc.structured_core
                    .insert(key.to_string(), value.to_string());
            }
        }
    }

    doc.chaosfield_layer = chaosfield.join("\n");
    Some(doc)
}

fn trim_brackets(line: &str) -> &str {
    line.trim_start_matches('[').trim_end_matches(']')
}

/// Build an emotion tag string, or `None` for invalid input
pub fn create_emotion_tag(emotion_type: &str, intensity: &str) -> Option<String> {
    if emotion_type.is_empty() || intensity.is_empty() {
        return None;
    }
    let intensity = intensity.to_uppercase();
    if !INTENSITIES.contains(&intensity.as_str()) {
        return None;
    }
    Some(format!(
        "[EMOTION:{}:{}]",
        emotion_type.to_uppercase(),
        intensity
    ))
}

/// Build a symbol tag string, or `None` for invalid input
pub fn create_symbol_tag(symbol_type: &str, presence: &str) -> Option<String> {
    if symbol_type.is_empty() || presence.is_empty() {
        return None;
    }
    let presence = presence.to_uppercase();
    if !PRESENCES.contains(&presence.as_str()) {
        return None;
    }
    Some(format!(
        "[SYMBOL:{}:{}]",
        symbol_type.to_uppercase(),
        presence
    ))
}

/// Build a relationship tag string, or `None` for invalid input
pub fn create_relationship_tag(source: &str, relationship_type: &str, target: &str) -> Option<String> {
    if source.is_empty() || relationship_type.is_empty() || target.is_empty() {
        return None;
    }
    Some(format!(
        "[RELATIONSHIP:{}:{}:{}]",
        source.to_uppercase(),
        relationship_type.to_uppercase(),
        target.to_uppercase()
    ))
}

/// Validate and classify a single bracketed tag
pub fn validate_tag(tag: &str) -> Option<ParsedTag> {
    if !tag.starts_with('[') || !tag.ends_with(']') {
        return None;
    }
    let parts: Vec<&str> = tag[1..tag.len() - 1].split(':').collect();
    if parts.len() < 2 {
        return None;
    }

    match parts[0] {
        "EMOTION" if parts.len() >= 3 => Some(ParsedTag::Emotion {
            emotion_type: parts[1].to_string(),
            intensity: parts[2].to_string(),
            valid: INTENSITIES.contains(&parts[2].to_uppercase().as_str()),
        }),
        "SYMBOL" if parts.len() >= 3 => Some(ParsedTag::Symbol {
            symbol_type: parts[1].to_string(),
            presence: parts[2].to_string(),
            valid: PRESENCES.contains(&parts[2].to_uppercase().as_str()),
        }),
        "RELATIONSHIP" if parts.len() >= 4 => Some(ParsedTag::Relationship {
            source: parts[1].to_string(),
            relationship_type: parts[2].to_string(),
            target: parts[3].to_string(),
            valid: true,
        }),
        _ => Some(ParsedTag::Unknown { valid: false }),
    }
}

/// Extract every bracketed tag from a document
pub fn extract_tags(content: &str) -> Vec<ParsedTag> {
    let mut tags = Vec::new();
    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            if let Some(close) = line.find(']') {
                if let Some(parsed) = validate_tag(&line[..=close]) {
                    tags.push(parsed);
                }
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[event]: first_light
[subject]: dawn over the bay
---EMOTIVE_LAYER---
[EMOTION:JOY:HIGH]
[SYMBOL:FIRE:STRONG]
[RELATIONSHIP:USER:OBSERVES:EDEN]
---CHAOSFIELD_LAYER---
the water burned orange
and nothing needed a name";

    #[test]
    fn test_parse_sections() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.structured_core["event"], "first_light");
        assert_eq!(doc.structured_core["subject"], "dawn over the bay");
        assert_eq!(doc.emotive_layer.emotions.len(), 1);
        assert_eq!(doc.emotive_layer.emotions[0].emotion_type, "JOY");
        assert_eq!(doc.emotive_layer.emotions[0].intensity, "HIGH");
        assert_eq!(doc.emotive_layer.symbols[0].symbol_type, "FIRE");
        assert_eq!(doc.emotive_layer.relationships[0].source, "USER");
        assert!(doc.chaosfield_layer.contains("the water burned orange"));
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(parse("").is_none());
    }

    #[test]
    fn test_tags_recognized_outside_their_section() {
        let doc = parse("[EMOTION:CALM:LOW]").unwrap();
        assert_eq!(doc.emotive_layer.emotions.len(), 1);
    }

    #[test]
    fn test_create_emotion_tag_validates_intensity() {
        assert_eq!(
            create_emotion_tag("joy", "high").as_deref(),
            Some("[EMOTION:JOY:HIGH]")
        );
        assert!(create_emotion_tag("joy", "sideways").is_none());
        assert!(create_emotion_tag("", "HIGH").is_none());
    }

    #[test]
    fn test_create_symbol_tag_validates_presence() {
        assert_eq!(
            create_symbol_tag("fire", "strong").as_deref(),
            Some("[SYMBOL:FIRE:STRONG]")
        );
        assert!(create_symbol_tag("fire", "overwhelming").is_none());
    }

    #[test]
    fn test_create_relationship_tag() {
        assert_eq!(
            create_relationship_tag("user", "loves", "eden").as_deref(),
            Some("[RELATIONSHIP:USER:LOVES:EDEN]")
        );
        assert!(create_relationship_tag("user", "", "eden").is_none());
    }

    #[test]
    fn test_validate_tag() {
        assert_eq!(
            validate_tag("[EMOTION:JOY:HIGH]"),
            Some(ParsedTag::Emotion {
                emotion_type: "JOY".into(),
                intensity: "HIGH".into(),
                valid: true,
            })
        );
        assert_eq!(
            validate_tag("[EMOTION:JOY:IMMENSE]"),
            Some(ParsedTag::Emotion {
                emotion_type: "JOY".into(),
                intensity: "IMMENSE".into(),
                valid: false,
            })
        );
        assert_eq!(
            validate_tag("[WHATEVER:X]"),
            Some(ParsedTag::Unknown { valid: false })
        );
        assert!(validate_tag("no brackets").is_none());
        assert!(validate_tag("[solo]").is_none());
    }

    #[test]
    fn test_extract_tags() {
        let tags = extract_tags(SAMPLE);
        assert_eq!(tags.len(), 3);
        assert!(matches!(tags[0], ParsedTag::Emotion { .. }));
        assert!(matches!(tags[1], ParsedTag::Symbol { .. }));
        assert!(matches!(tags[2], ParsedTag::Relationship { .. }));
    }
}
