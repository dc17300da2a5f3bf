//! src/templates/props.rs

use super::{EmailTemplate, Theme};
use chrono::{Datelike, Utc};
use serde_json::{Map, Value};

/// Application identity baked into every email.
#[derive(Debug, Clone)]
pub struct Branding {
    pub app_name: String,
    pub base_url: String,
}

/// A standard email: arbitrary HTML content wrapped in the layout.
#[derive(Debug, Clone, Default)]
pub struct LayoutProps {
    pub content: String,
    pub preview_text: Option<String>,
    pub heading: Option<String>,
    pub footer_text: Option<String>,
    pub unsubscribe_url: Option<String>,
    pub logo_url: Option<String>,
    pub dark_mode: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadMagnetProps {
    pub recipient_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub download_url: String,
    pub cover_image_url: Option<String>,
    pub button_text: Option<String>,
    pub dark_mode: Option<bool>,
}

pub const DEFAULT_LEAD_MAGNET_DESCRIPTION: &str =
    "Here is your free download as promised. Click the button below to access it.";
pub const DEFAULT_BUTTON_TEXT: &str = "Download Now";

#[derive(Debug, Clone)]
pub enum TemplateProps {
    Layout(LayoutProps),
    LeadMagnet(LeadMagnetProps),
}

/// Props with every default filled in, ready for either render strategy.
#[derive(Debug, Clone)]
pub struct ResolvedProps {
    pub theme: Theme,
    pub values: Map<String, Value>,
}

impl TemplateProps {
    pub fn template(&self) -> EmailTemplate {
        match self {
            TemplateProps::Layout(_) => EmailTemplate::Layout,
            TemplateProps::LeadMagnet(_) => EmailTemplate::LeadMagnet,
        }
    }

    pub fn resolve(&self, branding: &Branding, default_theme: Theme) -> ResolvedProps {
        match self {
            TemplateProps::Layout(props) => resolve_layout(props, branding, default_theme),
            TemplateProps::LeadMagnet(props) => resolve_lead_magnet(props, branding, default_theme),
        }
    }
}

fn or_default(value: &Option<String>, default: impl FnOnce() -> String) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default(),
    }
}

struct LayoutFrame {
    preview_text: String,
    heading: String,
    footer_text: String,
    unsubscribe_url: String,
    logo_url: String,
}

impl LayoutFrame {
    fn new(props: &LayoutProps, branding: &Branding, theme: Theme) -> Self {
        let app = &branding.app_name;
        let base_url = branding.base_url.trim_end_matches('/');
        let logo = if theme.is_dark() {
            "logo-light.png"
        } else {
            "logo-dark.png"
        };
        Self {
            preview_text: or_default(&props.preview_text, || format!("Email from {}", app)),
            heading: or_default(&props.heading, || app.clone()),
            footer_text: or_default(&props.footer_text, || {
                format!("© {} {}. All rights reserved.", Utc::now().year(), app)
            }),
            unsubscribe_url: or_default(&props.unsubscribe_url, || {
                format!("{}/unsubscribe", base_url)
            }),
            logo_url: or_default(&props.logo_url, || format!("{}/{}", base_url, logo)),
        }
    }

    fn write(self, values: &mut Map<String, Value>, app_name: &str) {
        values.insert("app_name".into(), app_name.into());
        values.insert("preview_text".into(), self.preview_text.into());
        values.insert("heading".into(), self.heading.into());
        values.insert("footer_text".into(), self.footer_text.into());
        values.insert("unsubscribe_url".into(), self.unsubscribe_url.into());
        values.insert("logo_url".into(), self.logo_url.into());
    }
}

fn resolve_layout(props: &LayoutProps, branding: &Branding, default_theme: Theme) -> ResolvedProps {
    let theme = Theme::from_dark_mode(props.dark_mode, default_theme);
    let mut values = Map::new();
    LayoutFrame::new(props, branding, theme).write(&mut values, &branding.app_name);
    values.insert("content".into(), props.content.clone().into());
    ResolvedProps { theme, values }
}

fn resolve_lead_magnet(
    props: &LeadMagnetProps,
    branding: &Branding,
    default_theme: Theme,
) -> ResolvedProps {
    let theme = Theme::from_dark_mode(props.dark_mode, default_theme);
    let frame = LayoutProps {
        preview_text: Some(format!("Your download: {}", props.title)),
        heading: Some("Your Download Is Ready!".to_string()),
        dark_mode: Some(theme.is_dark()),
        ..Default::default()
    };
    let greeting = match props.recipient_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("Hi {},", name),
        _ => "Hi there,".to_string(),
    };

    let mut values = Map::new();
    LayoutFrame::new(&frame, branding, theme).write(&mut values, &branding.app_name);
    values.insert("greeting".into(), greeting.into());
    values.insert("title".into(), props.title.clone().into());
    values.insert(
        "description".into(),
        or_default(&props.description, || DEFAULT_LEAD_MAGNET_DESCRIPTION.to_string()).into(),
    );
    values.insert("download_url".into(), props.download_url.clone().into());
    values.insert(
        "cover_image_url".into(),
        props
            .cover_image_url
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    values.insert(
        "button_text".into(),
        or_default(&props.button_text, || DEFAULT_BUTTON_TEXT.to_string()).into(),
    );
    ResolvedProps { theme, values }
}
