//! src/routes/unsubscribe/get.rs

use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};

pub struct TurnstileSiteKey(pub String);

pub async fn unsubscribe_form(site_key: web::Data<TurnstileSiteKey>) -> HttpResponse {
    let site_key = &site_key.0;
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8">
    <title>Unsubscribe</title>
    <script src="https://challenges.cloudflare.com/turnstile/v0/api.js" async defer></script>
</head>
<body>
    <h1>Unsubscribe</h1>
    <p>Enter your email address to stop receiving our newsletter.</p>
    <form action="/unsubscribe" method="post">
        <label>Email
            <input type="email" placeholder="you@example.com" name="email" required>
        </label>
        <div class="cf-turnstile" data-sitekey="{site_key}" data-response-field-name="turnstile_token"></div>
        <button type="submit">Unsubscribe</button>
    </form>
    <p><a href="/">&lt;- Back</a></p>
</body>
</html>"#
        ))
}
