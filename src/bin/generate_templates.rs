//! src/bin/generate_templates.rs
//!
//! Writes the precompiled email templates used by the `precompiled` render
//! strategy into the configured `email.generated_dir`.

use newsletter::configurations::get_configuration;
use newsletter::telemetry::{get_subscriber, init_subscriber};
use newsletter::templates::{Branding, RenderStrategy, TemplateRenderer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("generate_templates".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration");
    let output_dir = configuration.email.generated_dir.clone();
    let renderer = TemplateRenderer::new(
        RenderStrategy::Live,
        output_dir.clone(),
        Branding {
            app_name: configuration.application.name,
            base_url: configuration.application.base_url,
        },
        configuration.email.default_theme,
    )?;

    let written = renderer.generate_templates(output_dir).await?;
    tracing::info!(count = written.len(), "Email templates generated");
    Ok(())
}
