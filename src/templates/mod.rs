//! src/templates/mod.rs
//!
//! Email rendering. Two strategies share the same resolved props:
//!
//! * `Live` renders the embedded Tera templates on every send.
//! * `Precompiled` loads HTML produced ahead of time by `generate_templates`,
//!   where every prop was rendered as a `{{key}}` token, and substitutes the
//!   tokens. It trades per-message theming for not needing the template
//!   engine at send time.

mod placeholder;
mod props;
mod theme;

pub use placeholder::substitute_placeholders;
pub use props::{
    Branding, LayoutProps, LeadMagnetProps, ResolvedProps, TemplateProps, DEFAULT_BUTTON_TEXT,
    DEFAULT_LEAD_MAGNET_DESCRIPTION,
};
pub use theme::{ColorScheme, Theme};

use crate::telemetry::spawn_blocking_with_tracing;
use anyhow::Context;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tera::Tera;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    #[serde(alias = "node")]
    Live,
    #[serde(alias = "edge")]
    Precompiled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    Layout,
    LeadMagnet,
}

impl EmailTemplate {
    pub const ALL: [EmailTemplate; 2] = [EmailTemplate::Layout, EmailTemplate::LeadMagnet];

    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::Layout => "LayoutTemplate",
            EmailTemplate::LeadMagnet => "LeadMagnetTemplate",
        }
    }

    fn tera_name(&self) -> &'static str {
        match self {
            EmailTemplate::Layout => "layout.html",
            EmailTemplate::LeadMagnet => "lead_magnet.html",
        }
    }

    /// Every prop the template reads, in the order they are resolved.
    pub fn placeholder_keys(&self) -> &'static [&'static str] {
        match self {
            EmailTemplate::Layout => &[
                "app_name",
                "preview_text",
                "heading",
                "footer_text",
                "unsubscribe_url",
                "logo_url",
                "content",
            ],
            EmailTemplate::LeadMagnet => &[
                "app_name",
                "preview_text",
                "heading",
                "footer_text",
                "unsubscribe_url",
                "logo_url",
                "greeting",
                "title",
                "description",
                "download_url",
                "cover_image_url",
                "button_text",
            ],
        }
    }

    pub fn generated_file(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.html", self.name()))
    }
}

impl FromStr for EmailTemplate {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmailTemplate::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| RenderError::UnknownTemplate(s.to_string()))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Unknown email template \"{0}\"")]
    UnknownTemplate(String),
    #[error(
        "Template \"{0}\" not found in generated templates. Run `generate_templates` first."
    )]
    NotGenerated(String),
    #[error("Failed to render template \"{name}\": {source}")]
    Engine {
        name: &'static str,
        #[source]
        source: tera::Error,
    },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct TemplateRenderer {
    tera: Tera,
    strategy: RenderStrategy,
    generated_dir: PathBuf,
    branding: Branding,
    default_theme: Theme,
}

impl TemplateRenderer {
    pub fn new(
        strategy: RenderStrategy,
        generated_dir: PathBuf,
        branding: Branding,
        default_theme: Theme,
    ) -> Result<Self, anyhow::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                EmailTemplate::Layout.tera_name(),
                include_str!("../../templates/email/layout.html"),
            ),
            (
                EmailTemplate::LeadMagnet.tera_name(),
                include_str!("../../templates/email/lead_magnet.html"),
            ),
        ])
        .context("Failed to parse the email templates")?;
        Ok(Self {
            tera,
            strategy,
            generated_dir,
            branding,
            default_theme,
        })
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    pub fn default_theme(&self) -> Theme {
        self.default_theme
    }

    #[tracing::instrument(
        name = "Rendering email template",
        skip(self, props),
        fields(template = props.template().name(), strategy = ?self.strategy)
    )]
    pub async fn render(&self, props: &TemplateProps) -> Result<String, RenderError> {
        let template = props.template();
        let resolved = props.resolve(&self.branding, self.default_theme);
        match self.strategy {
            RenderStrategy::Live => self.render_live(template, &resolved),
            RenderStrategy::Precompiled => {
                let html = self.load_generated(template).await?;
                Ok(substitute_placeholders(&html, &resolved.values))
            }
        }
    }

    pub fn render_live(
        &self,
        template: EmailTemplate,
        resolved: &ResolvedProps,
    ) -> Result<String, RenderError> {
        let mut context = tera::Context::new();
        for (key, value) in &resolved.values {
            context.insert(key.as_str(), value);
        }
        context.insert("colors", &resolved.theme.colors());
        self.tera
            .render(template.tera_name(), &context)
            .map_err(|source| RenderError::Engine {
                name: template.name(),
                source,
            })
    }

    /// Render `template` with each prop replaced by its own `{{key}}` token.
    pub fn precompile(&self, template: EmailTemplate) -> Result<String, RenderError> {
        let values: Map<String, Value> = template
            .placeholder_keys()
            .iter()
            .map(|key| (key.to_string(), Value::String(format!("{{{{{}}}}}", key))))
            .collect();
        let resolved = ResolvedProps {
            theme: self.default_theme,
            values,
        };
        self.render_live(template, &resolved)
    }

    async fn load_generated(&self, template: EmailTemplate) -> Result<String, RenderError> {
        let path = template.generated_file(&self.generated_dir);
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => Ok(html),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RenderError::NotGenerated(template.name().to_string()))
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to read {}", path.display()))
                .into()),
        }
    }

    /// Write every precompiled template into `dir`, creating it if needed.
    #[tracing::instrument(name = "Generating precompiled templates", skip(self))]
    pub async fn generate_templates(&self, dir: PathBuf) -> Result<Vec<PathBuf>, RenderError> {
        let renderer = self.clone();
        spawn_blocking_with_tracing(move || renderer.write_generated(&dir))
            .await
            .context("Failed to spawn blocking task")?
    }

    fn write_generated(&self, dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let mut written = Vec::with_capacity(EmailTemplate::ALL.len());
        for template in EmailTemplate::ALL {
            let html = self.precompile(template)?;
            let path = template.generated_file(dir);
            std::fs::write(&path, html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(template = template.name(), path = %path.display(), "Generated template");
            written.push(path);
        }
        Ok(written)
    }
}
