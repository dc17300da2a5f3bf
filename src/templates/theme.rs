//! src/templates/theme.rs

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark_mode(dark_mode: Option<bool>, default: Theme) -> Theme {
        match dark_mode {
            Some(true) => Theme::Dark,
            Some(false) => Theme::Light,
            None => default,
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }

    /// Email clients ignore CSS variables, so every colour is inlined.
    pub fn colors(&self) -> ColorScheme {
        match self {
            Theme::Light => ColorScheme {
                background: "#f9fafb",
                container: "#ffffff",
                text_primary: "#1f2937",
                text_secondary: "#374151",
                text_muted: "#6b7280",
                heading: "#111827",
                button_background: "#4f46e5",
                button_text: "#ffffff",
                border: "#e5e7eb",
                link: "#4f46e5",
                shadow: "0 1px 2px rgba(0, 0, 0, 0.05)",
            },
            Theme::Dark => ColorScheme {
                background: "#111827",
                container: "#1f2937",
                text_primary: "#f3f4f6",
                text_secondary: "#d1d5db",
                text_muted: "#9ca3af",
                heading: "#ffffff",
                button_background: "#6366f1",
                button_text: "#ffffff",
                border: "#374151",
                link: "#818cf8",
                shadow: "0 4px 6px rgba(0, 0, 0, 0.1)",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColorScheme {
    pub background: &'static str,
    pub container: &'static str,
    pub text_primary: &'static str,
    pub text_secondary: &'static str,
    pub text_muted: &'static str,
    pub heading: &'static str,
    pub button_background: &'static str,
    pub button_text: &'static str,
    pub border: &'static str,
    pub link: &'static str,
    pub shadow: &'static str,
}
