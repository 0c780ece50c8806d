use crate::field::{to_wire_name, FieldKind};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Discovery types ─────────────────────────────────────────────────────────

/// An input as reported by the remote system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInputDescriptor {
    pub key: String,
    pub title: String,
    pub number: String,
}

/// A field slot inside a remote input. `name` is the bare identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

// ── Commands ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteFunction {
    SetText,
    SetImage,
    SetColor,
    SetTextColour,
    SetTextVisibleOn,
    SetTextVisibleOff,
    OverlayIn(u8),
    OverlayOut(u8),
}

impl RemoteFunction {
    /// Function for writing a value into a field of `kind`.
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => RemoteFunction::SetText,
            FieldKind::Image => RemoteFunction::SetImage,
            FieldKind::Fill => RemoteFunction::SetColor,
        }
    }

    pub fn wire_name(&self) -> String {
        match self {
            RemoteFunction::SetText => "SetText".into(),
            RemoteFunction::SetImage => "SetImage".into(),
            RemoteFunction::SetColor => "SetColor".into(),
            RemoteFunction::SetTextColour => "SetTextColour".into(),
            RemoteFunction::SetTextVisibleOn => "SetTextVisibleOn".into(),
            RemoteFunction::SetTextVisibleOff => "SetTextVisibleOff".into(),
            RemoteFunction::OverlayIn(channel) => format!("OverlayInput{}In", channel),
            RemoteFunction::OverlayOut(channel) => format!("OverlayInput{}Out", channel),
        }
    }
}

impl fmt::Display for RemoteFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_name())
    }
}

/// One request to the remote control API. Generated on demand, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCommand {
    pub function: RemoteFunction,
    /// Remote title or number
    pub input: String,
    /// Suffix-qualified field name
    pub selected_name: Option<String>,
    pub value: Option<String>,
}

impl RemoteCommand {
    /// Write `value` into the field `field` (bare identifier) of `kind`.
    pub fn set_field(input: &str, field: &str, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            function: RemoteFunction::for_kind(kind),
            input: input.to_string(),
            selected_name: Some(to_wire_name(field, kind)),
            value: Some(value.into()),
        }
    }

    pub fn set_text_colour(input: &str, field: &str, colour: impl Into<String>) -> Self {
        Self {
            function: RemoteFunction::SetTextColour,
            input: input.to_string(),
            selected_name: Some(to_wire_name(field, FieldKind::Text)),
            value: Some(colour.into()),
        }
    }

    pub fn text_visibility(input: &str, field: &str, visible: bool) -> Self {
        Self {
            function: if visible {
                RemoteFunction::SetTextVisibleOn
            } else {
                RemoteFunction::SetTextVisibleOff
            },
            input: input.to_string(),
            selected_name: Some(to_wire_name(field, FieldKind::Text)),
            value: None,
        }
    }

    pub fn overlay(input: &str, channel: u8, show: bool) -> Self {
        Self {
            function: if show {
                RemoteFunction::OverlayIn(channel)
            } else {
                RemoteFunction::OverlayOut(channel)
            },
            input: input.to_string(),
            selected_name: None,
            value: None,
        }
    }

    /// Query parameters in wire order. Encoding is left to the transport.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("Function", self.function.wire_name()),
            ("Input", self.input.clone()),
        ];
        if let Some(name) = &self.selected_name {
            params.push(("SelectedName", name.clone()));
        }
        if let Some(value) = &self.value {
            params.push(("Value", value.clone()));
        }
        params
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} input={}", self.function, self.input)?;
        if let Some(name) = &self.selected_name {
            write!(f, " field={}", name)?;
        }
        Ok(())
    }
}

/// Normalize a colour to `#RRGGBB`. Accepts an optional leading `#` and
/// the three-digit short form.
pub fn normalize_color(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(format!("#{}", hex.to_ascii_uppercase())),
        3 => {
            let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
            Some(format!("#{}", expanded.to_ascii_uppercase()))
        }
        _ => None,
    }
}
