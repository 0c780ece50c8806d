//! Parsing of the remote system's XML state document (`GET /api`).
//!
//! Only the parts needed for discovery are read: each `<input>` element's
//! identity attributes and its text/image/color children.

use crate::api::{RemoteFieldDescriptor, RemoteInputDescriptor};
use crate::field::{kind_of_suffix, strip_suffix, FieldKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// An input together with the fields it exposes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedInput {
    pub descriptor: RemoteInputDescriptor,
    pub fields: Vec<RemoteFieldDescriptor>,
}

static INPUT_REGEX: OnceLock<Regex> = OnceLock::new();
static FIELD_REGEX: OnceLock<Regex> = OnceLock::new();
static ATTR_REGEX: OnceLock<Regex> = OnceLock::new();

fn input_regex() -> &'static Regex {
    INPUT_REGEX.get_or_init(|| {
        // Attribute values may contain '>' so quoted runs are skipped whole.
        Regex::new(r#"(?s)<input\b((?:[^>"]|"[^"]*")*?)(?:/>|>(.*?)</input>)"#)
            .expect("input element regex should compile")
    })
}

fn field_regex() -> &'static Regex {
    FIELD_REGEX.get_or_init(|| {
        Regex::new(r#"<(text|image|color)\b((?:[^>"]|"[^"]*")*)>"#)
            .expect("field element regex should compile")
    })
}

fn attr_regex() -> &'static Regex {
    ATTR_REGEX.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][\w.-]*)\s*=\s*"([^"]*)""#)
            .expect("attribute regex should compile")
    })
}

fn attributes(raw: &str) -> HashMap<&str, String> {
    attr_regex()
        .captures_iter(raw)
        .filter_map(|c| {
            let name = c.get(1)?.as_str();
            let value = c.get(2)?.as_str();
            Some((name, unescape(value)))
        })
        .collect()
}

fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// All inputs in document order.
pub fn parse_inputs(xml: &str) -> Vec<ParsedInput> {
    input_regex()
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = attributes(caps.get(1).map_or("", |m| m.as_str()));
            let descriptor = RemoteInputDescriptor {
                key: attrs.get("key").cloned().unwrap_or_default(),
                title: attrs.get("title").cloned().unwrap_or_default(),
                number: attrs.get("number").cloned().unwrap_or_default(),
            };
            if descriptor.key.is_empty() && descriptor.number.is_empty() {
                log::warn!("Skipping remote input without key or number");
                return None;
            }
            let fields = caps.get(2).map_or_else(Vec::new, |body| parse_fields(body.as_str()));
            Some(ParsedInput { descriptor, fields })
        })
        .collect()
}

/// Field children of one input body. Names are stored without their kind
/// suffix; duplicates keep the first occurrence.
pub fn parse_fields(body: &str) -> Vec<RemoteFieldDescriptor> {
    let mut fields: Vec<RemoteFieldDescriptor> = Vec::new();
    for caps in field_regex().captures_iter(body) {
        let element = caps.get(1).map_or("", |m| m.as_str());
        let attrs = attributes(caps.get(2).map_or("", |m| m.as_str()));
        let Some(raw_name) = attrs.get("name").filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        let kind = match kind_of_suffix(raw_name) {
            Some(kind) => kind,
            None => match element {
                "image" => FieldKind::Image,
                "color" => FieldKind::Fill,
                _ => FieldKind::Text,
            },
        };
        let name = strip_suffix(raw_name);
        if fields.iter().any(|f| f.name == name) {
            continue;
        }
        fields.push(RemoteFieldDescriptor { name, kind });
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: &str = r#"<vmix>
<version>27.0.0.49</version>
<inputs>
<input key="26cae087-b7b6" number="1" type="GT" title="Score &amp; Sets" state="Paused">Score
<text index="0" name="HomeName.Text">Eagles</text>
<text index="1" name="AwayName.Text">Hawks</text>
<image index="0" name="HomeLogo.Source">C:\logo.png</image>
<color index="0" name="HomeBar.Fill.Color">#FF0000</color>
</input>
<input key="9f1c" number="2" type="Colour" title="Black" state="Paused"/>
<input key="77aa" number="3" type="GT" title="a > b">
<text index="0" name="Headline">x</text>
<text index="1" name="Headline.Text">dup</text>
</input>
</inputs>
</vmix>"#;

    #[test]
    fn parses_input_identity() {
        let inputs = parse_inputs(STATE);
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].descriptor.key, "26cae087-b7b6");
        assert_eq!(inputs[0].descriptor.number, "1");
        assert_eq!(inputs[0].descriptor.title, "Score & Sets");
        assert_eq!(inputs[2].descriptor.title, "a > b");
    }

    #[test]
    fn parses_fields_with_kinds_and_bare_names() {
        let inputs = parse_inputs(STATE);
        let fields = &inputs[0].fields;
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].name, "HomeName");
        assert_eq!(fields[0].kind, FieldKind::Text);
        assert_eq!(fields[2].name, "HomeLogo");
        assert_eq!(fields[2].kind, FieldKind::Image);
        assert_eq!(fields[3].name, "HomeBar");
        assert_eq!(fields[3].kind, FieldKind::Fill);
    }

    #[test]
    fn self_closing_input_has_no_fields() {
        let inputs = parse_inputs(STATE);
        assert_eq!(inputs[1].descriptor.title, "Black");
        assert!(inputs[1].fields.is_empty());
    }

    #[test]
    fn duplicate_field_names_collapse() {
        let inputs = parse_inputs(STATE);
        assert_eq!(inputs[2].fields.len(), 1);
        assert_eq!(inputs[2].fields[0].name, "Headline");
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_inputs("not xml at all").is_empty());
        assert!(parse_inputs("").is_empty());
    }
}
