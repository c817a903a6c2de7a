//! Plain-HTTP health endpoint, served over TCP on the game port number.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use log::info;
use tokio::net::TcpListener;

pub const HEALTH_PATH: &str = "/healthz";

const BANNER: &str = "vrsync server";

/// `GET /healthz` answers `ok`; every other path gets the banner.
pub fn router() -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .fallback(banner)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn banner() -> impl IntoResponse {
    (StatusCode::OK, BANNER)
}

/// Serves the health router on `listener` until the process exits.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    info!("Health endpoint on http://{}{}", listener.local_addr()?, HEALTH_PATH);
    axum::serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio_test::assert_ok;

    async fn get_path(path: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n",
            path
        );
        assert_ok!(stream.write_all(request.as_bytes()).await);

        let mut response = String::new();
        assert_ok!(stream.read_to_string(&mut response).await);
        response
    }

    #[tokio::test]
    async fn test_health_endpoint_responds_ok() {
        let response = get_path(HEALTH_PATH).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("\r\n\r\nok"));
    }

    #[tokio::test]
    async fn test_health_ignores_query_string() {
        let response = get_path("/healthz?check=1").await;
        assert!(response.ends_with("\r\n\r\nok"));
    }

    #[tokio::test]
    async fn test_unknown_path_gets_banner() {
        let response = get_path("/status").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with(BANNER));
    }
}
