//! src/routes/home/mod.rs

use crate::configurations::LeadMagnetSettings;
use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};
use tera::{Context, Tera};

/// The home page only depends on configuration, so it is rendered once at
/// startup.
pub struct HomePage(String);

impl HomePage {
    pub fn render(lead_magnet: &LeadMagnetSettings) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template("home.html", include_str!("home.html"))?;

        let mut context = Context::new();
        context.insert("title", &lead_magnet.title);
        context.insert("description", &lead_magnet.description);
        context.insert("content_title", &lead_magnet.content_title);
        context.insert("cover_image_url", &lead_magnet.cover_image_url);
        context.insert("button_text", lead_magnet.kind.button_text());
        tera.render("home.html", &context).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn home(page: web::Data<HomePage>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page.as_str().to_owned())
}
