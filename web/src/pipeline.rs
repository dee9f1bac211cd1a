//! HTTP pipeline assembled by plugin contributions.

use axum::Router;
use axum::routing::MethodRouter;

/// The application's HTTP pipeline.
///
/// Plugins add routes, nested routers, and layers in registration order;
/// the host mounts health endpoints last and serves the result.
#[derive(Debug, Default)]
pub struct HttpPipeline {
    router: Router,
    routes: Vec<String>,
}

impl HttpPipeline {
    /// Empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route.
    ///
    /// # Panics
    ///
    /// Axum panics if `path` is already routed or malformed.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.routes.push(path.to_string());
        self.apply(|router| router.route(path, method_router))
    }

    /// Merge another router's routes into this one.
    pub fn merge(&mut self, other: Router) -> &mut Self {
        self.apply(|router| router.merge(other))
    }

    /// Mount a router under `prefix`.
    pub fn nest(&mut self, prefix: &str, other: Router) -> &mut Self {
        self.routes.push(format!("{prefix}/*"));
        self.apply(|router| router.nest(prefix, other))
    }

    /// Transform the underlying router, e.g. to add a layer.
    pub fn configure<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(Router) -> Router,
    {
        self.apply(f)
    }

    /// Paths added with [`route`](Self::route) and [`nest`](Self::nest),
    /// in order.
    #[must_use]
    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    /// Finish the pipeline.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    fn apply<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(Router) -> Router,
    {
        let router = std::mem::take(&mut self.router);
        self.router = f(router);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_contributions_accumulate() {
        let mut pipeline = HttpPipeline::new();
        pipeline
            .route("/orders", get(|| async { "orders" }))
            .nest("/admin", Router::new().route("/stats", get(|| async { "stats" })));

        assert_eq!(pipeline.routes(), ["/orders", "/admin/*"]);

        let router = pipeline.into_router();
        let response = router
            .clone()
            .oneshot(Request::get("/admin/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
