//! Axum integration utilities.
//!
//! [`FieldPermissionsLayer`] resolves the effective field permissions of the
//! request's user once per request. Handlers read them back through the
//! [`EffectivePermissions`] extractor. Upstream middleware (session or token
//! authentication) is expected to insert a [`RequestContext`].

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::cache::Cache;
use crate::engine::Engine;
use crate::error::Error;
use crate::permission::{FieldPermission, PermissionLevel};
use crate::store::Store;
use crate::types::{FieldName, InstanceId, ModelName, UserId};

use ::axum::body::Body;
use ::axum::extract::FromRequestParts;
use ::axum::response::{IntoResponse, Response};
use ::http::request::Parts;
use ::http::{Request, StatusCode};
use ::tower::{Layer, Service};

/// Instance and user a request acts for.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Instance the request targets.
    pub instance: InstanceId,
    /// Authenticated user; `None` for anonymous requests.
    pub user: Option<UserId>,
}

impl RequestContext {
    /// Creates a request context.
    pub fn new(instance: InstanceId, user: Option<UserId>) -> Self {
        Self { instance, user }
    }
}

/// Field permissions resolved for the current request.
#[derive(Debug, Clone)]
pub struct EffectivePermissions {
    permissions: Arc<Vec<FieldPermission>>,
}

impl EffectivePermissions {
    /// Wraps an already resolved permission set.
    pub fn new(permissions: Vec<FieldPermission>) -> Self {
        Self {
            permissions: Arc::new(permissions),
        }
    }

    /// All records, across models.
    pub fn all(&self) -> &[FieldPermission] {
        &self.permissions
    }

    /// Records of one model.
    pub fn for_model<'a>(
        &'a self,
        model_name: &'a ModelName,
    ) -> impl Iterator<Item = &'a FieldPermission> + 'a {
        self.permissions
            .iter()
            .filter(move |perm| &perm.model_name == model_name)
    }

    /// Level on one field; [`PermissionLevel::None`] when no record exists.
    pub fn level(&self, model_name: &ModelName, field_name: &FieldName) -> PermissionLevel {
        self.for_model(model_name)
            .find(|perm| &perm.field_name == field_name)
            .map(|perm| perm.permission_level)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for EffectivePermissions
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<EffectivePermissions>()
            .cloned()
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "field permissions not resolved",
            ))
    }
}

/// Middleware layer that attaches [`EffectivePermissions`] to each request.
#[derive(Debug, Clone)]
pub struct FieldPermissionsLayer<S, C> {
    engine: Arc<Engine<S, C>>,
}

impl<S, C> FieldPermissionsLayer<S, C> {
    /// Creates a new layer backed by `engine`.
    pub fn new(engine: Arc<Engine<S, C>>) -> Self {
        Self { engine }
    }
}

impl<S, C, Inner> Layer<Inner> for FieldPermissionsLayer<S, C>
where
    S: Store,
    C: Cache,
{
    type Service = FieldPermissionsService<Inner, S, C>;

    fn layer(&self, inner: Inner) -> Self::Service {
        FieldPermissionsService {
            inner,
            engine: self.engine.clone(),
        }
    }
}

/// Middleware service that resolves field permissions.
#[derive(Debug, Clone)]
pub struct FieldPermissionsService<Inner, S, C> {
    inner: Inner,
    engine: Arc<Engine<S, C>>,
}

impl<Inner, S, C> Service<Request<Body>> for FieldPermissionsService<Inner, S, C>
where
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
    S: Store + 'static,
    C: Cache + 'static,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let engine = self.engine.clone();

        Box::pin(async move {
            let context = req.extensions().get::<RequestContext>().cloned();
            let Some(context) = context else {
                return Ok((StatusCode::BAD_REQUEST, "missing request context").into_response());
            };

            match engine
                .permissions(context.user.as_ref(), &context.instance, None)
                .await
            {
                Ok(permissions) => {
                    req.extensions_mut()
                        .insert(EffectivePermissions::new(permissions));
                    poll_fn(|cx| inner.poll_ready(cx)).await?;
                    inner.call(req).await
                }
                Err(Error::InstanceNotFound { .. }) => {
                    Ok((StatusCode::NOT_FOUND, "unknown instance").into_response())
                }
                Err(err) => {
                    tracing::warn!(
                        instance = %context.instance,
                        error = %err,
                        "failed to resolve field permissions"
                    );
                    Ok((StatusCode::INTERNAL_SERVER_ERROR, "permission error").into_response())
                }
            }
        })
    }
}
