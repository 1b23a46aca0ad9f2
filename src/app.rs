use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Endpoint;
use crate::gateway::{self, GatewayState};

pub fn build_app(state: GatewayState) -> Router {
    Router::new()
        .nest("/api", gateway::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, endpoint: &Endpoint) -> anyhow::Result<()> {
    let addr = endpoint.address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("gateway listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
