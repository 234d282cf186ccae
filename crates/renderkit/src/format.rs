//! Rendering of extracted documents into output formats
//!
//! Markdown is the canonical form; HTML is derived from it by a fixed set of
//! line-level substitutions. All renderers are pure.

use crate::types::{DocumentationModel, ExtractedDocument, Parameter};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::warn;

static MD_H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^# (.*)$").expect("MD_H1_RE should compile"));
static MD_H2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^## (.*)$").expect("MD_H2_RE should compile"));
static MD_H3_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^### (.*)$").expect("MD_H3_RE should compile"));
static MD_BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("MD_BOLD_RE should compile"));
static MD_ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("MD_ITALIC_RE should compile"));

const BANNER_RULE: &str =
    "================================================================================";
const SECTION_RULE: &str = "--------------------------------------------------";

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    Html,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err("Invalid format: must be markdown, json, html or text".to_string()),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

/// Render `doc` in the requested format
pub fn format(doc: &ExtractedDocument, target: OutputFormat) -> String {
    match target {
        OutputFormat::Markdown => to_markdown(doc),
        OutputFormat::Json => to_json(doc),
        OutputFormat::Html => to_html(doc),
        OutputFormat::Text => to_text(doc),
    }
}

/// Canonical markdown rendering
pub fn to_markdown(doc: &ExtractedDocument) -> String {
    let mut out = Vec::new();

    let title = if doc.title.is_empty() { &doc.url } else { &doc.title };
    out.push(format!("# {title}"));
    out.push(String::new());

    let Some(ref model) = doc.documentation else {
        out.push(format!("**Source:** {}", doc.url));
        out.push(String::new());
        out.push("## Content".to_string());
        out.push(String::new());
        out.push(doc.content.clone());
        return finish(out);
    };

    if let Some(ref class_name) = model.class_name {
        out.push(format!("**Class:** {class_name}"));
    }
    out.push(format!("**Source:** {}", doc.url));
    out.push(String::new());

    markdown_sections(model, &mut out);
    finish(out)
}

fn markdown_sections(model: &DocumentationModel, out: &mut Vec<String>) {
    if !model.overview.is_empty() {
        out.push("## Overview".to_string());
        out.push(String::new());
        out.push(model.overview.clone());
        out.push(String::new());
    }

    let ctor = &model.constructor;
    if !ctor.description.is_empty() || !ctor.parameters.is_empty() {
        out.push("## Constructor".to_string());
        out.push(String::new());
        if !ctor.description.is_empty() {
            out.push(ctor.description.clone());
            out.push(String::new());
        }
        if let Some(ref since) = ctor.since {
            out.push(format!("*Since {since}*"));
            out.push(String::new());
        }
        if !ctor.parameters.is_empty() {
            out.push("### Parameters".to_string());
            out.push(String::new());
            out.extend(ctor.parameters.iter().map(markdown_parameter));
            out.push(String::new());
        }
    }

    if !model.properties.is_empty() {
        out.push("## Properties".to_string());
        out.push(String::new());
        for prop in &model.properties {
            out.push(format!("### {}", prop.name));
            out.push(String::new());
            if !prop.type_name.is_empty() {
                out.push(format!("- **Type:** `{}`", prop.type_name));
            }
            if let Some(ref default) = prop.default_value {
                out.push(format!("- **Default:** `{default}`"));
            }
            if let Some(ref since) = prop.since {
                out.push(format!("- **Since:** {since}"));
            }
            if prop.deprecated {
                out.push("- **Deprecated**".to_string());
            }
            if !prop.description.is_empty() {
                out.push(String::new());
                out.push(prop.description.clone());
            }
            out.push(String::new());
        }
    }

    if !model.methods.is_empty() {
        out.push("## Methods".to_string());
        out.push(String::new());
        for method in &model.methods {
            out.push(format!("### {}()", method.name));
            out.push(String::new());
            if !method.description.is_empty() {
                out.push(method.description.clone());
                out.push(String::new());
            }
            if !method.parameters.is_empty() {
                out.push("**Parameters:**".to_string());
                out.push(String::new());
                out.extend(method.parameters.iter().map(markdown_parameter));
                out.push(String::new());
            }
            if !method.returns.type_name.is_empty() {
                let mut line = format!("**Returns:** `{}`", method.returns.type_name);
                if !method.returns.description.is_empty() {
                    line.push_str(&format!(" {}", method.returns.description));
                }
                out.push(line);
                out.push(String::new());
            }
            if let Some(ref since) = method.since {
                out.push(format!("*Since {since}*"));
                out.push(String::new());
            }
            if method.deprecated {
                out.push("**Deprecated**".to_string());
                out.push(String::new());
            }
        }
    }

    if !model.events.is_empty() {
        out.push("## Events".to_string());
        out.push(String::new());
        for event in &model.events {
            out.push(format!("### {}", event.name));
            out.push(String::new());
            if !event.description.is_empty() {
                out.push(event.description.clone());
                out.push(String::new());
            }
            if !event.parameters.is_empty() {
                out.extend(event.parameters.iter().map(markdown_parameter));
                out.push(String::new());
            }
            if let Some(ref since) = event.since {
                out.push(format!("*Since {since}*"));
                out.push(String::new());
            }
        }
    }

    if !model.examples.is_empty() {
        out.push("## Examples".to_string());
        out.push(String::new());
        for (i, example) in model.examples.iter().enumerate() {
            out.push(format!("### Example {}", i + 1));
            out.push(String::new());
            if let Some(ref description) = example.description {
                out.push(description.clone());
                out.push(String::new());
            }
            out.push(format!("```{}", example.language));
            out.push(example.code.clone());
            out.push("```".to_string());
            out.push(String::new());
        }
    }

    if !model.inheritance.is_empty() {
        out.push("## Inheritance".to_string());
        out.push(String::new());
        out.push(model.inheritance.join(" → "));
        out.push(String::new());
    }
}

fn markdown_parameter(param: &Parameter) -> String {
    let mut line = format!("- `{}`", param.name);
    match (param.type_name.is_empty(), param.optional) {
        (false, true) => line.push_str(&format!(" ({}, optional)", param.type_name)),
        (false, false) => line.push_str(&format!(" ({})", param.type_name)),
        (true, true) => line.push_str(" (optional)"),
        (true, false) => {}
    }
    if !param.description.is_empty() {
        line.push_str(&format!(": {}", param.description));
    }
    line
}

/// Pretty JSON; a serialization failure yields an error object instead
pub fn to_json(doc: &ExtractedDocument) -> String {
    serde_json::to_string_pretty(doc).unwrap_or_else(|e| {
        warn!(url = %doc.url, error = %e, "Failed to serialize document");
        serde_json::json!({ "error": e.to_string() }).to_string()
    })
}

/// Markdown with headings, emphasis and line breaks turned into tags
pub fn to_html(doc: &ExtractedDocument) -> String {
    let markdown = to_markdown(doc)
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    let html = MD_H3_RE.replace_all(&markdown, "<h3>$1</h3>");
    let html = MD_H2_RE.replace_all(&html, "<h2>$1</h2>");
    let html = MD_H1_RE.replace_all(&html, "<h1>$1</h1>");
    let html = MD_BOLD_RE.replace_all(&html, "<strong>$1</strong>");
    let html = MD_ITALIC_RE.replace_all(&html, "<em>$1</em>");
    html.replace('\n', "<br>")
}

/// Plain-text report with a ruled banner
pub fn to_text(doc: &ExtractedDocument) -> String {
    let mut out = Vec::new();
    out.push(BANNER_RULE.to_string());

    let Some(ref model) = doc.documentation else {
        let title = if doc.title.is_empty() { &doc.url } else { &doc.title };
        out.push(title.clone());
        out.push(BANNER_RULE.to_string());
        out.push(String::new());
        text_section(&mut out, "CONTENT");
        out.push(doc.content.clone());
        return finish(out);
    };

    out.push(format!(
        "API DOCUMENTATION: {}",
        model.class_name.as_deref().unwrap_or("unknown class")
    ));
    out.push(BANNER_RULE.to_string());
    out.push(String::new());

    if !model.overview.is_empty() {
        text_section(&mut out, "OVERVIEW");
        out.push(model.overview.clone());
        out.push(String::new());
    }

    let ctor = &model.constructor;
    if !ctor.description.is_empty() || !ctor.parameters.is_empty() {
        text_section(&mut out, "CONSTRUCTOR");
        if !ctor.description.is_empty() {
            out.push(ctor.description.clone());
            out.push(String::new());
        }
        if let Some(ref since) = ctor.since {
            out.push(format!("Since: {since}"));
            out.push(String::new());
        }
        if !ctor.parameters.is_empty() {
            out.push("Parameters:".to_string());
            out.extend(ctor.parameters.iter().map(|p| text_parameter(p, "  ")));
            out.push(String::new());
        }
    }

    if !model.properties.is_empty() {
        text_section(&mut out, "PROPERTIES");
        for prop in &model.properties {
            out.push(format!("{} ({})", prop.name, prop.type_name));
            if let Some(ref default) = prop.default_value {
                out.push(format!("  Default: {default}"));
            }
            if !prop.description.is_empty() {
                out.push(format!("  {}", prop.description));
            }
            if let Some(ref since) = prop.since {
                out.push(format!("  Since: {since}"));
            }
            if prop.deprecated {
                out.push("  DEPRECATED".to_string());
            }
            out.push(String::new());
        }
    }

    if !model.methods.is_empty() {
        text_section(&mut out, "METHODS");
        for method in &model.methods {
            out.push(format!("{}()", method.name));
            if !method.description.is_empty() {
                out.push(format!("  {}", method.description));
            }
            if !method.parameters.is_empty() {
                out.push("  Parameters:".to_string());
                out.extend(method.parameters.iter().map(|p| text_parameter(p, "    ")));
            }
            if !method.returns.type_name.is_empty() {
                out.push(format!("  Returns: {}", method.returns.type_name));
                if !method.returns.description.is_empty() {
                    out.push(format!("    {}", method.returns.description));
                }
            }
            if let Some(ref since) = method.since {
                out.push(format!("  Since: {since}"));
            }
            if method.deprecated {
                out.push("  DEPRECATED".to_string());
            }
            out.push(String::new());
        }
    }

    if !model.events.is_empty() {
        text_section(&mut out, "EVENTS");
        for event in &model.events {
            out.push(event.name.clone());
            if !event.description.is_empty() {
                out.push(format!("  {}", event.description));
            }
            if !event.parameters.is_empty() {
                out.push("  Parameters:".to_string());
                out.extend(event.parameters.iter().map(|p| text_parameter(p, "    ")));
            }
            if let Some(ref since) = event.since {
                out.push(format!("  Since: {since}"));
            }
            out.push(String::new());
        }
    }

    if !model.examples.is_empty() {
        text_section(&mut out, "EXAMPLES");
        for (i, example) in model.examples.iter().enumerate() {
            out.push(format!("Example {} ({}):", i + 1, example.language));
            if let Some(ref description) = example.description {
                out.push(description.clone());
            }
            out.push(example.code.clone());
            out.push(String::new());
        }
    }

    if !model.inheritance.is_empty() {
        text_section(&mut out, "INHERITANCE");
        out.push(format!("Extends: {}", model.inheritance.join(" → ")));
        out.push(String::new());
    }

    finish(out)
}

fn text_section(out: &mut Vec<String>, name: &str) {
    out.push(name.to_string());
    out.push(SECTION_RULE.to_string());
}

fn text_parameter(param: &Parameter, indent: &str) -> String {
    let marker = if param.optional { "?" } else { "" };
    format!(
        "{indent}* {}{marker} ({}): {}",
        param.name, param.type_name, param.description
    )
}

fn finish(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Constructor, Example, Metadata, Method, Property, Returns};
    use chrono::{TimeZone, Utc};

    fn plain_doc() -> ExtractedDocument {
        ExtractedDocument {
            url: "https://example.com/post".to_string(),
            title: "A Post".to_string(),
            content: "Line one\n  Line two".to_string(),
            html: None,
            images: None,
            links: None,
            tables: Vec::new(),
            headings: Vec::new(),
            outline: None,
            metadata: Metadata {
                timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                user_agent: "TestAgent".to_string(),
            },
            documentation: None,
        }
    }

    fn api_doc() -> ExtractedDocument {
        let mut doc = plain_doc();
        doc.url = "https://sapui5.hana.ondemand.com/#/api/sap.m.Button".to_string();
        doc.title = "sap.m.Button".to_string();
        doc.documentation = Some(DocumentationModel {
            class_name: Some("sap.m.Button".to_string()),
            overview: "Enables users to trigger actions.".to_string(),
            constructor: Constructor {
                description: "Constructor for a new Button.".to_string(),
                since: None,
                parameters: vec![Parameter {
                    name: "sId".to_string(),
                    type_name: "string".to_string(),
                    description: "ID for the new control".to_string(),
                    optional: true,
                }],
            },
            properties: vec![Property {
                name: "text".to_string(),
                type_name: "string".to_string(),
                default_value: Some("\"\"".to_string()),
                description: "Button text".to_string(),
                since: None,
                deprecated: false,
            }],
            methods: vec![Method {
                name: "firePress".to_string(),
                returns: Returns {
                    type_name: "this".to_string(),
                    description: String::new(),
                },
                deprecated: true,
                ..Default::default()
            }],
            events: Vec::new(),
            examples: vec![Example {
                language: "javascript".to_string(),
                code: "new Button();".to_string(),
                description: None,
            }],
            inheritance: vec!["sap.ui.core.Element".to_string(), "sap.ui.core.Control".to_string()],
        });
        doc
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_markdown_without_documentation_uses_content() {
        let md = format(&plain_doc(), OutputFormat::Markdown);
        assert!(md.starts_with("# A Post\n"));
        assert!(md.contains("## Content\n\nLine one\n  Line two\n"));
        assert!(!md.contains("## Overview"));
    }

    #[test]
    fn test_markdown_section_order() {
        let md = format(&api_doc(), OutputFormat::Markdown);
        let positions: Vec<usize> = [
            "# sap.m.Button",
            "## Overview",
            "## Constructor",
            "## Properties",
            "## Methods",
            "## Examples",
            "## Inheritance",
        ]
        .iter()
        .map(|h| md.find(h).unwrap_or_else(|| panic!("missing {h}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(!md.contains("## Events"));
        assert!(!md.contains("## Content"));
        assert!(md.contains("- `sId` (string, optional): ID for the new control"));
        assert!(md.contains("### firePress()"));
        assert!(md.contains("**Returns:** `this`"));
        assert!(md.contains("```javascript\nnew Button();\n```"));
        assert!(md.contains("sap.ui.core.Element → sap.ui.core.Control"));
    }

    #[test]
    fn test_markdown_is_idempotent() {
        let doc = api_doc();
        assert_eq!(to_markdown(&doc), to_markdown(&doc));
        assert_eq!(to_text(&doc), to_text(&doc));
    }

    #[test]
    fn test_json_round_trip() {
        let doc = api_doc();
        let json = format(&doc, OutputFormat::Json);
        let back: ExtractedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert!(json.contains("\"type\": \"string\""));
    }

    #[test]
    fn test_html_transform() {
        let html = format(&api_doc(), OutputFormat::Html);
        assert!(html.starts_with("<h1>sap.m.Button</h1><br>"));
        assert!(html.contains("<h2>Overview</h2>"));
        assert!(html.contains("<h3>Parameters</h3>"));
        assert!(html.contains("<strong>Class:</strong>"));
        assert!(!html.contains('\n'));
    }

    #[test]
    fn test_html_escapes_markup_in_content() {
        let mut doc = plain_doc();
        doc.content = "<script>alert(1)</script>".to_string();
        let html = format(&doc, OutputFormat::Html);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_text_banner() {
        let text = format(&api_doc(), OutputFormat::Text);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], BANNER_RULE);
        assert_eq!(lines[1], "API DOCUMENTATION: sap.m.Button");
        assert!(text.contains("OVERVIEW\n"));
        assert!(text.contains("  * sId? (string): ID for the new control"));
        assert!(text.contains("  DEPRECATED"));
        assert!(text.contains("Extends: sap.ui.core.Element → sap.ui.core.Control"));
    }
}
