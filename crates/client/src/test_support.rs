//! Mock servers for client tests.

use axum::Router;
use tokio::net::TcpListener;
use url::Url;

/// Serve `app` on an ephemeral local port and return its base URL.
#[allow(clippy::unwrap_used)]
pub async fn serve(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// URL of a local port nothing listens on.
#[allow(clippy::unwrap_used)]
pub async fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}
