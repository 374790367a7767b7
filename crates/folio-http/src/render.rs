//! HTML rendering
//!
//! Handlers only assemble a JSON context; turning it into markup is the job
//! of a [`Renderer`]. Every rendered response also carries a
//! [`RenderedPage`] extension naming the template and its context.

use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tinytemplate::TinyTemplate;

use crate::error::HttpResult;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template error: {0}")]
    Template(String),
}

/// Turns a template name plus context into HTML
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError>;

    fn has_template(&self, template: &str) -> bool;
}

/// What was rendered for a response
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub template: String,
    pub context: Value,
}

macro_rules! templates {
    ($($name:literal),* $(,)?) => {
        &[$(($name, include_str!(concat!("../templates/", $name)))),*]
    };
}

/// Every template shipped with the binary, partials included
pub const TEMPLATES: &[(&str, &str)] = templates!(
    "includes/header.html",
    "includes/shared_header.html",
    "includes/footer.html",
    "includes/paginator.html",
    "includes/post_card.html",
    "includes/form_field.html",
    "posts/index.html",
    "posts/group_list.html",
    "posts/profile.html",
    "posts/post_detail.html",
    "posts/create_post.html",
    "posts/follow.html",
    "about/author.html",
    "about/tech.html",
    "core/400.html",
    "core/404.html",
    "core/500.html",
);

/// `2024-03-01T10:00:00Z` -> `1 March 2024`
fn format_date(value: &Value, output: &mut String) -> tinytemplate::error::Result<()> {
    match value
        .as_str()
        .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
    {
        Some(date) => {
            output.push_str(&date.format("%-d %B %Y").to_string());
            Ok(())
        }
        None => tinytemplate::format(value, output),
    }
}

/// Escaped text with newlines turned into `<br>`
fn format_linebreaks(value: &Value, output: &mut String) -> tinytemplate::error::Result<()> {
    let mut escaped = String::new();
    tinytemplate::format(value, &mut escaped)?;
    output.push_str(&escaped.replace('\n', "<br>"));
    Ok(())
}

/// [`Renderer`] backed by the embedded `tinytemplate` templates
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: &'static [(&'static str, &'static str)],
}

impl TemplateRenderer {
    /// Compile every embedded template once so syntax errors surface at startup
    pub fn new() -> Result<Self, RenderError> {
        let renderer = Self {
            templates: TEMPLATES,
        };
        renderer.engine()?;
        Ok(renderer)
    }

    fn engine(&self) -> Result<TinyTemplate<'static>, RenderError> {
        let mut engine = TinyTemplate::new();
        engine.add_formatter("date", format_date);
        engine.add_formatter("linebreaks", format_linebreaks);
        for &(name, source) in self.templates {
            engine
                .add_template(name, source)
                .map_err(|e| RenderError::Template(format!("{}: {}", name, e)))?;
        }
        Ok(engine)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError> {
        if !self.has_template(template) {
            return Err(RenderError::UnknownTemplate(template.to_string()));
        }
        // TinyTemplate is neither Send nor Sync, so an engine is built per render
        self.engine()?
            .render(template, context)
            .map_err(|e| RenderError::Template(format!("{}: {}", template, e)))
    }

    fn has_template(&self, template: &str) -> bool {
        self.templates.iter().any(|(name, _)| *name == template)
    }
}

/// Render `template` into an HTML response tagged with its [`RenderedPage`]
pub fn render_page(renderer: &dyn Renderer, template: &str, context: Value) -> HttpResult<Response> {
    let html = renderer.render(template, &context)?;
    let mut response = Html(html).into_response();
    response.extensions_mut().insert(RenderedPage {
        template: template.to_string(),
        context,
    });
    Ok(response)
}
