//! Template resolution with a three-tier override chain.
//!
//! Pages are rendered with Tera. Each page template (`content.html`,
//! `index.html`, `author.html`) extends `layout.html`, the page frame. A site
//! layout replaces that frame; it should define a `content` block so page
//! bodies have somewhere to go.
//!
//! For a section the frame comes from, in order: the section's layout, the
//! site default layout, the built-in frame. A layout whose source does not
//! compile is skipped with a warning and the next tier is tried.

use std::{
    collections::HashMap,
    error::Error as _,
    fmt::Write as _,
};

use chrono::{DateTime, Utc};
use pressroom_core::{Layout, Section};
use tera::{Context, Tera, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the page frame every page template extends.
pub const LAYOUT_TEMPLATE: &str = "layout.html";
/// Content page template.
pub const CONTENT_TEMPLATE: &str = "content.html";
/// Paginated index template.
pub const INDEX_TEMPLATE: &str = "index.html";
/// Author page template.
pub const AUTHOR_TEMPLATE: &str = "author.html";

const BUILTIN_LAYOUT: &str = include_str!("../templates/layout.html");
const BUILTIN_CONTENT: &str = include_str!("../templates/content.html");
const BUILTIN_INDEX: &str = include_str!("../templates/index.html");
const BUILTIN_AUTHOR: &str = include_str!("../templates/author.html");

/// Template errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The embedded template set does not compile.
    #[error("built-in templates failed to compile: {0}")]
    Builtin(String),

    /// Rendering a template failed.
    #[error("failed to render {template}: {message}")]
    Render { template: String, message: String },

    /// Page data could not be turned into a template context.
    #[error("invalid template context: {0}")]
    Context(String),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Where a resolved template came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateTier {
    /// The layout assigned to the section.
    Section(i64),
    /// The site default layout.
    SiteDefault(i64),
    /// The embedded template set.
    Builtin,
}

/// A template set ready to render pages for one section.
pub struct ResolvedTemplate<'r> {
    tera: &'r Tera,
    tier: TemplateTier,
}

impl ResolvedTemplate<'_> {
    pub fn tier(&self) -> TemplateTier {
        self.tier
    }

    /// Render one of the page templates with `context`.
    pub fn render(&self, template: &str, context: &Context) -> Result<String> {
        self.tera
            .render(template, context)
            .map_err(|e| TemplateError::Render {
                template: template.to_string(),
                message: error_chain(&e),
            })
    }
}

/// Resolves the template set for a section.
///
/// Compiled site layouts are cached by layout id for the lifetime of the
/// resolver, which is one generation run.
pub struct TemplateResolver<'a> {
    builtin: Tera,
    layouts: HashMap<i64, &'a Layout>,
    section_layouts: HashMap<i64, i64>,
    default_layout: Option<i64>,
    compiled: HashMap<i64, Option<Tera>>,
    now: DateTime<Utc>,
}

impl<'a> TemplateResolver<'a> {
    /// Create a resolver over a site's layouts and sections.
    ///
    /// Fails only when the built-in template set itself does not compile.
    pub fn new(
        layouts: &'a [Layout],
        sections: &[Section],
        default_layout: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let builtin = compile_set(BUILTIN_LAYOUT, now)
            .map_err(|e| TemplateError::Builtin(error_chain(&e)))?;

        let section_layouts = sections
            .iter()
            .filter_map(|s| s.layout_id.map(|layout| (s.id, layout)))
            .collect();

        Ok(Self {
            builtin,
            layouts: layouts.iter().map(|l| (l.id, l)).collect(),
            section_layouts,
            default_layout,
            compiled: HashMap::new(),
            now,
        })
    }

    /// Template set for a section; `None` resolves with the site default.
    pub fn resolve(&mut self, section_id: Option<i64>) -> ResolvedTemplate<'_> {
        let section_layout = section_id.and_then(|id| self.section_layouts.get(&id).copied());
        let default_layout = self.default_layout;

        for id in [section_layout, default_layout].into_iter().flatten() {
            self.ensure_compiled(id);
        }

        if let Some(id) = section_layout
            && let Some(Some(tera)) = self.compiled.get(&id)
        {
            return ResolvedTemplate {
                tera,
                tier: TemplateTier::Section(id),
            };
        }

        if let Some(id) = default_layout
            && let Some(Some(tera)) = self.compiled.get(&id)
        {
            return ResolvedTemplate {
                tera,
                tier: TemplateTier::SiteDefault(id),
            };
        }

        ResolvedTemplate {
            tera: &self.builtin,
            tier: TemplateTier::Builtin,
        }
    }

    fn ensure_compiled(&mut self, layout_id: i64) {
        if self.compiled.contains_key(&layout_id) {
            return;
        }

        let compiled = match self.layouts.get(&layout_id) {
            None => {
                warn!(layout = layout_id, "layout not found, falling back");
                None
            }
            Some(layout) if layout.code.trim().is_empty() => {
                debug!(layout = layout_id, "layout has no source, falling back");
                None
            }
            Some(layout) => match compile_set(&layout.code, self.now) {
                Ok(tera) => {
                    debug!(layout = layout_id, name = %layout.name, "compiled layout");
                    Some(tera)
                }
                Err(e) => {
                    warn!(
                        layout = layout_id,
                        name = %layout.name,
                        error = %error_chain(&e),
                        "layout failed to compile, falling back"
                    );
                    None
                }
            },
        };

        self.compiled.insert(layout_id, compiled);
    }
}

/// Compile the page templates on top of the given frame.
fn compile_set(frame: &str, now: DateTime<Utc>) -> tera::Result<Tera> {
    let mut tera = Tera::default();
    register_functions(&mut tera, now);
    tera.add_raw_templates(vec![
        (LAYOUT_TEMPLATE, frame),
        (CONTENT_TEMPLATE, BUILTIN_CONTENT),
        (INDEX_TEMPLATE, BUILTIN_INDEX),
        (AUTHOR_TEMPLATE, BUILTIN_AUTHOR),
    ])?;
    Ok(tera)
}

/// Register the functions templates may call.
///
/// Nothing here touches the filesystem or the network.
pub fn register_functions(tera: &mut Tera, now: DateTime<Utc>) {
    tera.register_function("safeHTML", SafeHtml);
    tera.register_filter("safeHTML", SafeHtml);

    tera.register_function("add", |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let sum = int_arg(args, "a")?
            .checked_add(int_arg(args, "b")?)
            .ok_or_else(|| tera::Error::msg("add: integer overflow"))?;
        Ok(Value::from(sum))
    });

    tera.register_function(
        "subtract",
        |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let diff = int_arg(args, "a")?
                .checked_sub(int_arg(args, "b")?)
                .ok_or_else(|| tera::Error::msg("subtract: integer overflow"))?;
            Ok(Value::from(diff))
        },
    );

    tera.register_function(
        "now",
        move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            match args.get("format").and_then(Value::as_str) {
                Some(format) => {
                    let mut out = String::new();
                    write!(out, "{}", now.format(format))
                        .map_err(|_| tera::Error::msg(format!("now: invalid format `{format}`")))?;
                    Ok(Value::String(out))
                }
                None => Ok(Value::String(now.to_rfc3339())),
            }
        },
    );
}

/// Marks markup as trusted so autoescaping leaves it alone.
struct SafeHtml;

impl tera::Function for SafeHtml {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let raw = args
            .get("raw")
            .ok_or_else(|| tera::Error::msg("safeHTML: missing `raw` argument"))?;
        Ok(Value::String(value_to_string(raw)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

impl tera::Filter for SafeHtml {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        Ok(Value::String(value_to_string(value)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn int_arg(args: &HashMap<String, Value>, name: &str) -> tera::Result<i64> {
    args.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| tera::Error::msg(format!("`{name}` must be an integer")))
}

/// Flatten a Tera error and its causes into one line.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Build a Tera context from serializable page data.
pub fn context_from<T: serde::Serialize>(data: &T) -> Result<Context> {
    Context::from_serialize(data).map_err(|e| TemplateError::Context(error_chain(&e)))
}
