//! TemplateRenderer backed by tera.
//!
//! Templates are addressed by their path relative to the template root,
//! e.g. `listings/emails/booking_confirmation.html`. Files ending in
//! `.html` are autoescaped.

use std::error::Error as _;

use tera::{Context, Tera};

use crate::ports::{RenderError, TemplateRenderer};

pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Load every file under `root`.
    pub fn from_dir(root: &str) -> Result<Self, RenderError> {
        let glob = format!("{}/**/*", root.trim_end_matches('/'));
        let tera = Tera::new(&glob).map_err(|e| RenderError::Load {
            root: root.to_string(),
            reason: full_reason(&e),
        })?;
        Ok(Self { tera })
    }

    /// Build from in-memory `(name, source)` pairs.
    pub fn from_raw<I, N, S>(templates: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates).map_err(|e| RenderError::Load {
            root: "<raw>".to_string(),
            reason: full_reason(&e),
        })?;
        Ok(Self { tera })
    }

    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(str::to_string).collect();
        names.sort();
        names
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, RenderError> {
        if !self.tera.get_template_names().any(|n| n == template) {
            return Err(RenderError::NotFound(template.to_string()));
        }
        let ctx = Context::from_value(context.clone()).map_err(|e| RenderError::Render {
            template: template.to_string(),
            reason: full_reason(&e),
        })?;
        self.tera.render(template, &ctx).map_err(|e| RenderError::Render {
            template: template.to_string(),
            reason: full_reason(&e),
        })
    }
}

// tera keeps the useful part of a failure in the source chain.
fn full_reason(err: &tera::Error) -> String {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        reason.push_str(": ");
        reason.push_str(&inner.to_string());
        source = inner.source();
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer() -> TeraRenderer {
        TeraRenderer::from_raw([
            ("greeting.html", "<p>Hello {{ user.name }}</p>"),
            ("broken.html", "{{ missing.field }}"),
        ])
        .unwrap()
    }

    #[test]
    fn renders_with_json_context() {
        let out = renderer()
            .render("greeting.html", &json!({"user": {"name": "Ana"}}))
            .unwrap();
        assert_eq!(out, "<p>Hello Ana</p>");
    }

    #[test]
    fn html_templates_escape_values() {
        let out = renderer()
            .render("greeting.html", &json!({"user": {"name": "<b>Ana</b>"}}))
            .unwrap();
        assert!(out.contains("&lt;b&gt;"));
    }

    #[test]
    fn unknown_template_is_not_found() {
        let err = renderer().render("nope.html", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::NotFound(name) if name == "nope.html"));
    }

    #[test]
    fn undefined_variable_is_a_render_error() {
        let err = renderer().render("broken.html", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Render { .. }));
    }

    #[test]
    fn loads_the_bundled_templates() {
        let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../../templates");
        let renderer = TeraRenderer::from_dir(root).unwrap();
        assert!(
            renderer
                .template_names()
                .contains(&"listings/emails/booking_confirmation.html".to_string())
        );
    }
}
