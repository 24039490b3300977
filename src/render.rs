//! Placeholder substitution with minijinja.

use std::collections::HashSet;

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::error::CatalogError;

/// Names minijinja resolves on its own; never reported as missing.
const BUILTIN_NAMES: [&str; 10] = [
    "range",
    "dict",
    "namespace",
    "debug",
    "loop",
    "self",
    "super",
    "varargs",
    "kwargs",
    "caller",
];

/// What happens to a placeholder whose variable is not in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingVariables {
    /// Substitute an empty string.
    #[default]
    Empty,
    /// Leave the whole `{{ ... }}` expression in the output as written.
    Keep,
    /// Fail with [`CatalogError::MissingVariable`].
    Strict,
}

impl MissingVariables {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Some(Self::Empty),
            "keep" => Some(Self::Keep),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Keep => "keep",
            Self::Strict => "strict",
        }
    }
}

/// Renders template text against a [`RenderContext`].
///
/// Holds no template state between calls; the same text and context always
/// produce the same output.
pub struct Renderer {
    env: Environment<'static>,
    missing: MissingVariables,
}

impl Renderer {
    pub fn new(missing: MissingVariables) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(match missing {
            MissingVariables::Strict => UndefinedBehavior::Strict,
            MissingVariables::Empty | MissingVariables::Keep => UndefinedBehavior::Lenient,
        });
        Self { env, missing }
    }

    pub fn missing_variables(&self) -> MissingVariables {
        self.missing
    }

    /// Compile `text` without rendering it, reporting syntax errors.
    pub fn validate(&self, text: &str) -> Result<(), CatalogError> {
        self.env.template_from_str(text)?;
        Ok(())
    }

    pub fn render(&self, text: &str, context: &RenderContext) -> Result<String, CatalogError> {
        let template = self.env.template_from_str(text)?;

        match self.missing {
            MissingVariables::Empty => Ok(template.render(context.values())?),
            MissingVariables::Keep => {
                let missing = unresolved(&template.undeclared_variables(false), context);
                if missing.is_empty() {
                    return Ok(template.render(context.values())?);
                }
                let protected = self.protect_unresolved(text, &missing);
                Ok(self.env.render_str(&protected, context.values())?)
            }
            MissingVariables::Strict => match template.render(context.values()) {
                Ok(output) => Ok(output),
                Err(err) if err.kind() == ErrorKind::UndefinedError => {
                    let missing = unresolved(&template.undeclared_variables(false), context);
                    match missing.into_iter().next() {
                        Some(name) => Err(CatalogError::MissingVariable { name }),
                        None => Err(err.into()),
                    }
                }
                Err(err) => Err(err.into()),
            },
        }
    }

    /// Wrap every `{{ ... }}` that reads one of `missing` in a raw block so it
    /// comes out exactly as written. Statements are left alone and see the
    /// missing names as undefined. Comments and raw blocks are copied as is.
    fn protect_unresolved(&self, text: &str, missing: &[String]) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = next_tag_start(rest) {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let opener = &tail[..2];
            let closer = match opener {
                "{{" => "}}",
                "{%" => "%}",
                _ => "#}",
            };
            let Some(end) = tail[2..].find(closer).map(|i| i + 2 + closer.len()) else {
                rest = tail;
                break;
            };
            let tag = &tail[..end];
            rest = &tail[end..];

            match opener {
                "{{" if self.reads_any(tag, missing) => {
                    out.push_str("{% raw %}");
                    out.push_str(tag);
                    out.push_str("{% endraw %}");
                }
                "{%" if tag_body(tag) == "raw" => {
                    out.push_str(tag);
                    let len = raw_block_len(rest);
                    out.push_str(&rest[..len]);
                    rest = &rest[len..];
                }
                _ => out.push_str(tag),
            }
        }

        out.push_str(rest);
        out
    }

    fn reads_any(&self, expression: &str, missing: &[String]) -> bool {
        match self.env.template_from_str(expression) {
            Ok(template) => template
                .undeclared_variables(false)
                .iter()
                .any(|name| missing.contains(name)),
            Err(_) => false,
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(MissingVariables::default())
    }
}

/// Undeclared template variables the context does not provide, sorted.
fn unresolved(undeclared: &HashSet<String>, context: &RenderContext) -> Vec<String> {
    let mut names: Vec<String> = undeclared
        .iter()
        .filter(|name| !context.contains(name) && !BUILTIN_NAMES.contains(&name.as_str()))
        .cloned()
        .collect();
    names.sort();
    names
}

/// Byte offset of the next `{{`, `{%` or `{#`.
fn next_tag_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    text.match_indices('{')
        .map(|(i, _)| i)
        .find(|&i| matches!(bytes.get(i + 1), Some(b'{' | b'%' | b'#')))
}

/// Tag text without delimiters, whitespace control markers or padding.
fn tag_body(tag: &str) -> &str {
    tag[2..tag.len() - 2].trim_matches(|c: char| c == '-' || c == '+' || c.is_whitespace())
}

/// Length of a raw block's body up to and including its `endraw` tag, or the
/// rest of the text when it is unterminated.
fn raw_block_len(text: &str) -> usize {
    let mut offset = 0;
    while let Some(found) = text[offset..].find("{%") {
        let start = offset + found;
        let Some(end) = text[start + 2..].find("%}").map(|i| start + 2 + i + 2) else {
            break;
        };
        if tag_body(&text[start..end]) == "endraw" {
            return end;
        }
        offset = end;
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> RenderContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_variables() {
        let renderer = Renderer::default();
        let out = renderer
            .render("Review this {{ lang }} code", &ctx(&[("lang", "Python")]))
            .unwrap();
        assert_eq!(out, "Review this Python code");
    }

    #[test]
    fn test_render_is_repeatable() {
        let renderer = Renderer::default();
        let context = ctx(&[("who", "world")]);
        let first = renderer.render("hello {{ who }}", &context).unwrap();
        let second = renderer.render("hello {{ who }}", &context).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_variable_renders_empty_by_default() {
        let renderer = Renderer::default();
        let out = renderer.render("[{{ absent }}]", &RenderContext::default()).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_missing_variable_keep() {
        let renderer = Renderer::new(MissingVariables::Keep);
        let out = renderer
            .render("{{ a }} and {{ b }}", &ctx(&[("a", "x")]))
            .unwrap();
        assert_eq!(out, "x and {{ b }}");
    }

    #[test]
    fn test_keep_leaves_filtered_and_attribute_placeholders_verbatim() {
        let renderer = Renderer::new(MissingVariables::Keep);
        let empty = RenderContext::default();
        assert_eq!(
            renderer.render("Use {{ lang | upper }} now", &empty).unwrap(),
            "Use {{ lang | upper }} now"
        );
        assert_eq!(
            renderer.render("Hi {{ user.name }}!", &empty).unwrap(),
            "Hi {{ user.name }}!"
        );
        assert_eq!(
            renderer.render("a {{- lang }} b", &empty).unwrap(),
            "a {{- lang }} b"
        );
    }

    #[test]
    fn test_keep_conditionals_treat_missing_as_undefined() {
        let renderer = Renderer::new(MissingVariables::Keep);
        let text = "{% if lang %}in {{ lang }}{% else %}any{% endif %}";
        assert_eq!(renderer.render(text, &RenderContext::default()).unwrap(), "any");
        assert_eq!(
            renderer.render(text, &ctx(&[("lang", "Rust")])).unwrap(),
            "in Rust"
        );
    }

    #[test]
    fn test_keep_renders_supplied_values_around_missing_ones() {
        let renderer = Renderer::new(MissingVariables::Keep);
        let out = renderer
            .render(
                "{{ lang | upper }} for {{ user.name }}{# note #}",
                &ctx(&[("lang", "rust")]),
            )
            .unwrap();
        assert_eq!(out, "RUST for {{ user.name }}");
    }

    #[test]
    fn test_keep_loop_variables_are_not_placeholders() {
        let renderer = Renderer::new(MissingVariables::Keep);
        let out = renderer
            .render(
                "{% for item in [1, 2] %}{{ item }}{% endfor %} {{ absent }}",
                &RenderContext::default(),
            )
            .unwrap();
        assert_eq!(out, "12 {{ absent }}");
    }

    #[test]
    fn test_keep_preserves_existing_raw_blocks() {
        let renderer = Renderer::new(MissingVariables::Keep);
        let out = renderer
            .render(
                "{% raw %}{{ literal }}{% endraw %} {{ absent }}",
                &RenderContext::default(),
            )
            .unwrap();
        assert_eq!(out, "{{ literal }} {{ absent }}");
    }

    #[test]
    fn test_raw_block_len() {
        assert_eq!(raw_block_len("{{ x }}{% endraw %} tail"), 19);
        assert_eq!(raw_block_len("{{ x }} unterminated"), 20);
        assert_eq!(tag_body("{%- raw -%}"), "raw");
    }

    #[test]
    fn test_missing_variable_strict() {
        let renderer = Renderer::new(MissingVariables::Strict);
        let err = renderer
            .render("{{ a }} and {{ b }}", &ctx(&[("a", "x")]))
            .unwrap_err();
        match err {
            CatalogError::MissingVariable { name } => assert_eq!(name, "b"),
            other => panic!("expected missing variable, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_passes_when_complete() {
        let renderer = Renderer::new(MissingVariables::Strict);
        let out = renderer.render("{{ a }}", &ctx(&[("a", "x")])).unwrap();
        assert_eq!(out, "x");
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        let renderer = Renderer::default();
        let text = "name: plain\ndescription: nothing to do";
        assert_eq!(renderer.render(text, &RenderContext::default()).unwrap(), text);
    }

    #[test]
    fn test_control_expressions() {
        let renderer = Renderer::default();
        let out = renderer
            .render(
                "{% if lang %}in {{ lang }}{% else %}any language{% endif %}",
                &ctx(&[("lang", "Rust")]),
            )
            .unwrap();
        assert_eq!(out, "in Rust");
        let out = renderer
            .render(
                "{% if lang %}in {{ lang }}{% else %}any language{% endif %}",
                &RenderContext::default(),
            )
            .unwrap();
        assert_eq!(out, "any language");
    }

    #[test]
    fn test_no_html_escaping() {
        let renderer = Renderer::default();
        let out = renderer
            .render("{{ code }}", &ctx(&[("code", "a < b && c")]))
            .unwrap();
        assert_eq!(out, "a < b && c");
    }

    #[test]
    fn test_syntax_error_is_render_error() {
        let renderer = Renderer::default();
        let err = renderer
            .render("{{ unclosed", &RenderContext::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Render { .. }));
        assert!(renderer.validate("{{ unclosed").is_err());
        assert!(renderer.validate("{{ fine }}").is_ok());
    }

    #[test]
    fn test_missing_variables_from_str() {
        assert_eq!(MissingVariables::from_str("empty"), Some(MissingVariables::Empty));
        assert_eq!(MissingVariables::from_str(" KEEP "), Some(MissingVariables::Keep));
        assert_eq!(MissingVariables::from_str("strict"), Some(MissingVariables::Strict));
        assert_eq!(MissingVariables::from_str("loose"), None);
        for policy in [
            MissingVariables::Empty,
            MissingVariables::Keep,
            MissingVariables::Strict,
        ] {
            assert_eq!(MissingVariables::from_str(policy.label()), Some(policy));
        }
    }
}
