//! First-order substitution language for generated source files.
//!
//! Two rules only: `{{key}}` interpolation and `{{#key}}...{{/key}}` repeated
//! blocks driven by a list of items. Blocks are expanded first, once per item,
//! with the item's fields as the only interpolation targets inside the block;
//! remaining text then gets a flat interpolation pass. Block output is never
//! re-scanned, and unbound keys survive untouched in the output.

use std::{collections::BTreeMap, sync::OnceLock};

use regex::{Captures, Regex};

/// A context binding: one scalar field or one repeated collection.
#[derive(Debug, Clone)]
pub enum TemplateValue {
    Scalar(String),
    List(Vec<BTreeMap<String, String>>),
}

impl TemplateValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        TemplateValue::Scalar(value.into())
    }
}

pub type TemplateContext = BTreeMap<String, TemplateValue>;

fn block_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{#([A-Za-z0-9_]+)\}\}").unwrap())
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap())
}

/// Renders `template` against `ctx` per the two-rule language above.
pub fn render(template: &str, ctx: &TemplateContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(caps) = block_open_regex().captures(rest) {
        let open = caps.get(0).expect("capture 0 always present");
        let key = caps.get(1).expect("block key group").as_str();
        let close_tag = format!("{{{{/{key}}}}}");
        let inner_start = open.end();

        let Some(close_rel) = rest[inner_start..].find(&close_tag) else {
            // Unterminated opener: treat it as plain text and move on.
            out.push_str(&interpolate(&rest[..inner_start], ctx));
            rest = &rest[inner_start..];
            continue;
        };

        out.push_str(&interpolate(&rest[..open.start()], ctx));
        let inner = &rest[inner_start..inner_start + close_rel];
        let block_end = inner_start + close_rel + close_tag.len();
        match ctx.get(key) {
            Some(TemplateValue::List(items)) => {
                for item in items {
                    out.push_str(&interpolate_fields(inner, item));
                }
            }
            // A block keyed to a scalar, or to nothing, survives untouched.
            _ => out.push_str(&rest[open.start()..block_end]),
        }
        rest = &rest[block_end..];
    }

    out.push_str(&interpolate(rest, ctx));
    out
}

fn interpolate(text: &str, ctx: &TemplateContext) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| match ctx.get(&caps[1]) {
            Some(TemplateValue::Scalar(value)) => value.clone(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

fn interpolate_fields(text: &str, fields: &BTreeMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| match fields.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
