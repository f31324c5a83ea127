//! Entry-file rendering
//!
//! Output is a pure function of the descriptor: rendering the same descriptor
//! twice yields byte-identical text.

use crate::config::ImportStyle;
use crate::descriptor::PreviewDescriptor;
use preview_value::{format_number, Value};
use std::fmt::Write as _;

/// First line of every generated entry file
pub const GENERATED_BANNER: &str =
    "// This content was auto-generated! DO NOT ATTEMPT TO EDIT OR REMOVE";

/// Render the complete replacement entry file
#[must_use]
pub fn render(descriptor: &PreviewDescriptor) -> String {
    let import = import_statement(descriptor);
    let element = mount_element(descriptor);
    format!(
        "{GENERATED_BANNER}

import React from 'react';
import ReactDOM from 'react-dom';
import './index.css';
{import}

ReactDOM.render(
  <React.StrictMode>
    {element}
  </React.StrictMode>,
  document.getElementById('root')
);
"
    )
}

/// Import statement for the component module
#[must_use]
pub fn import_statement(descriptor: &PreviewDescriptor) -> String {
    let name = &descriptor.component_name;
    let path = quote_single(&descriptor.source_module_path);
    match descriptor.import_style {
        ImportStyle::Default => format!("import {name} from {path};"),
        ImportStyle::Named => format!("import {{{name}}} from {path};"),
        ImportStyle::Namespace => format!("import * as {name} from {path};"),
        ImportStyle::DynamicRequire => format!("const {name} = require({path});"),
    }
}

/// `<div style={...}><Name attr... /></div>`
#[must_use]
pub fn mount_element(descriptor: &PreviewDescriptor) -> String {
    let style = Value::Object(descriptor.style.clone())
        .to_json()
        .unwrap_or_else(|| "{}".to_string());

    let mut element = format!("<div style={{{style}}}><{}", descriptor.component_name);
    for (name, value) in &descriptor.props {
        element.push(' ');
        element.push_str(&render_prop(name, value));
    }
    element.push_str(" /></div>");
    element
}

/// Render one JSX attribute
#[must_use]
pub fn render_prop(name: &str, value: &Value) -> String {
    match value {
        Value::String(s) if is_plain_attribute_text(s) => format!("{name}=\"{s}\""),
        Value::Number(n) => format!("{name}={{{}}}", format_number(*n)),
        other => format!("{name}={{{}}}", other.to_code_string()),
    }
}

/// Text that can sit between double quotes in an attribute unchanged
fn is_plain_attribute_text(s: &str) -> bool {
    !s.chars().any(|c| c == '"' || c == '&' || c.is_control())
}

fn quote_single(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
