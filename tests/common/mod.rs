// Common test utilities and fixtures

use std::time::Duration;

use axum::Router;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;

/// A page shaped like the generation site: a lazily rendered file input and,
/// when `offer_link` is set, an `.stl` download link injected after
/// `link_delay` to simulate generation time.
pub fn generation_page(link_delay: Duration, offer_link: bool) -> String {
    let inject = if offer_link {
        format!(
            r#"setTimeout(() => {{
                const a = document.createElement('a');
                a.href = '/model.stl';
                a.textContent = 'Download STL';
                document.body.appendChild(a);
            }}, {});"#,
            link_delay.as_millis()
        )
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Generation Fixture</title></head>
<body>
    <h1>Upload an image</h1>
    <script>
        // The real site renders its upload control client-side
        setTimeout(() => {{
            const input = document.createElement('input');
            input.type = 'file';
            input.accept = 'image/*';
            document.body.appendChild(input);
        }}, 500);
        {inject}
    </script>
</body>
</html>
"#
    )
}

/// Fixture server standing in for the generation site.
#[allow(dead_code)]
pub fn generation_site(link_delay: Duration, offer_link: bool) -> Router {
    let page = generation_page(link_delay, offer_link);
    Router::new()
        .route(
            "/",
            get(move || {
                let page = page.clone();
                async move { Html(page) }
            }),
        )
        .route("/model.stl", get(stl_artifact))
}

async fn stl_artifact() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"model.stl\"",
            ),
        ],
        "solid fixture\nendsolid fixture\n",
    )
}

/// Bind the fixture site on an ephemeral port and serve it in the background.
#[allow(dead_code)]
pub async fn spawn_site(app: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fixture server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fixture server died");
    });
    addr
}
