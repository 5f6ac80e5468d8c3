//! Build-complete webhook
//!
//! Called by CI once an image is pushed. Parameters may come from the form
//! body or the query string; non-empty body values win.

use axum::{
    body::Bytes,
    extract::{Query, State},
};
use serde::Deserialize;
use shipyard_core::domain::{Build, BuildType};

use super::AppState;
use crate::api::error::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct BuildParams {
    #[serde(default)]
    pub project: String,

    /// Container image reference
    #[serde(default)]
    pub image: String,

    /// Branch or tag name
    #[serde(default)]
    pub target: String,

    #[serde(rename = "type", default)]
    pub kind: String,
}

impl BuildParams {
    fn or(self, other: BuildParams) -> BuildParams {
        let pick = |a: String, b: String| if a.is_empty() { b } else { a };
        BuildParams {
            project: pick(self.project, other.project),
            image: pick(self.image, other.image),
            target: pick(self.target, other.target),
            kind: pick(self.kind, other.kind),
        }
    }
}

/// POST /build-complete
/// Queue a completed build for deployment
pub async fn build_complete(
    State(state): State<AppState>,
    Query(query): Query<BuildParams>,
    body: Bytes,
) -> ApiResult<&'static str> {
    let form: BuildParams = serde_urlencoded::from_bytes(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid form body: {}", e)))?;
    let params = form.or(query);

    let project = state
        .registry
        .get(&params.project)
        .ok_or_else(|| ApiError::ProjectNotFound(params.project.clone()))?;

    let kind: BuildType = params.kind.parse().map_err(ApiError::BadRequest)?;
    if params.image.trim().is_empty() || params.target.trim().is_empty() {
        return Err(ApiError::BadRequest("image and target are required".to_string()));
    }

    let build = Build {
        project: project.id.clone(),
        target: params.target,
        image: params.image,
        kind,
    };
    tracing::info!(
        "Build complete for {}: {} ({} {})",
        build.project,
        build.image,
        build.kind,
        build.target
    );

    state.builds.submit(build).await?;
    Ok("Received successfully")
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{form_post, harness, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use shipyard_core::domain::BuildType;

    #[tokio::test]
    async fn test_registered_project_is_queued() {
        let mut h = harness();
        let request = form_post(
            "/build-complete",
            "project=web&image=registry%2Fweb%3Amain&target=main&type=branch",
        );

        let (status, body) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Received successfully");
        let build = h.builds.try_recv().unwrap();
        assert_eq!(build.project, "web");
        assert_eq!(build.image, "registry/web:main");
        assert_eq!(build.kind, BuildType::Branch);
    }

    #[tokio::test]
    async fn test_unregistered_project_is_rejected() {
        let mut h = harness();
        let request = form_post(
            "/build-complete",
            "project=api&image=registry%2Fapi%3A1&target=1&type=tag",
        );

        let (status, body) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error encountered");
        assert!(h.builds.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_type_is_bad_request() {
        let mut h = harness();
        let request = form_post(
            "/build-complete",
            "project=web&image=registry%2Fweb%3Ax&target=x&type=commit",
        );

        let (status, _) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.builds.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_image_is_bad_request() {
        let mut h = harness();
        let request = form_post("/build-complete", "project=web&target=main&type=branch");

        let (status, _) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.builds.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_query_parameters_are_accepted() {
        let mut h = harness();
        let request = Request::post(
            "/build-complete?project=web&image=registry%2Fweb%3Av2&target=v2&type=TAG",
        )
        .body(Body::empty())
        .unwrap();

        let (status, _) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::OK);
        let build = h.builds.try_recv().unwrap();
        assert_eq!(build.kind, BuildType::Tag);
        assert_eq!(build.target, "v2");
    }
}
