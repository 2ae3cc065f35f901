//! Authorization at the route boundary.
//!
//! Guards resolve the caller through the identity façade and then read roles
//! and permissions live from the store by user id. The role claim inside a
//! bearer token is never consulted here.

use std::{
    collections::BTreeSet,
    convert::Infallible,
    marker::PhantomData,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Request, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};
use uuid::Uuid;

use super::{Identity, RequiredRole, Role};
use crate::{
    error::AppError,
    middleware::{offer_renewal, set_identity_headers},
    services::rbac_service::RbacService,
    state::AppState,
};

pub const SIGN_IN_PATH: &str = "/sign-in";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    All,
    Any,
}

/// How an anonymous caller is turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// `401 Authentication required`.
    Api,
    /// Redirect to the sign-in page with a `callbackUrl`.
    Browser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    names: Vec<String>,
    mode: MatchMode,
}

impl Clause {
    fn new<I, S>(names: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    /// `Err` carries the names to report: the missing ones for `All`, every
    /// option for `Any`.
    fn check(&self, held: &BTreeSet<String>) -> Result<(), Vec<String>> {
        match self.mode {
            MatchMode::All => {
                let missing: Vec<String> = self
                    .names
                    .iter()
                    .filter(|name| !held.contains(*name))
                    .cloned()
                    .collect();
                if missing.is_empty() { Ok(()) } else { Err(missing) }
            }
            MatchMode::Any => {
                if self.names.is_empty() || self.names.iter().any(|name| held.contains(name)) {
                    Ok(())
                } else {
                    Err(self.names.clone())
                }
            }
        }
    }
}

/// Declarative requirement for a route. Roles are checked before permissions
/// and the first failing clause decides the message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    roles: Option<Clause>,
    permissions: Option<Clause>,
}

impl RoutePolicy {
    /// Any resolved identity passes.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn role(role: Role) -> Self {
        Self::authenticated().with_roles([role.as_str()], MatchMode::All)
    }

    pub fn any_role(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::authenticated().with_roles(roles.into_iter().map(|role| role.as_str()), MatchMode::Any)
    }

    pub fn permission(permission: &str) -> Self {
        Self::authenticated().with_permissions([permission], MatchMode::All)
    }

    pub fn any_permission<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::authenticated().with_permissions(permissions, MatchMode::Any)
    }

    pub fn with_roles<I, S>(mut self, roles: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(Clause::new(roles, mode));
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(Clause::new(permissions, mode));
        self
    }

    pub fn needs_permissions(&self) -> bool {
        self.permissions.is_some()
    }

    /// Pure check against already-loaded sets. `Err` is the 403 message.
    pub fn evaluate(
        &self,
        roles: &BTreeSet<String>,
        permissions: &BTreeSet<String>,
    ) -> Result<(), String> {
        if let Some(clause) = &self.roles {
            clause
                .check(roles)
                .map_err(|names| requirement_message("role", "roles", &names))?;
        }
        if let Some(clause) = &self.permissions {
            clause
                .check(permissions)
                .map_err(|names| requirement_message("permission", "permissions", &names))?;
        }
        Ok(())
    }
}

fn requirement_message(singular: &str, plural: &str, names: &[String]) -> String {
    if names.len() == 1 {
        format!("Required {singular}: {}", names[0])
    } else {
        format!("Required {plural}: {}", names.join(", "))
    }
}

/// Roles and permissions read for an allowed request.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
    pub primary_role: Role,
}

#[derive(Debug)]
pub enum Denial {
    Anonymous,
    Forbidden(String),
    Failed(AppError),
}

impl Denial {
    pub fn respond(self, class: RouteClass, original_uri: &str) -> Response {
        match (self, class) {
            (Denial::Anonymous, RouteClass::Api) => {
                AppError::authentication_required().into_response()
            }
            (Denial::Anonymous, RouteClass::Browser) => {
                Redirect::to(&sign_in_redirect(original_uri)).into_response()
            }
            (Denial::Forbidden(message), _) => AppError::forbidden(message).into_response(),
            (Denial::Failed(err), _) => err.into_response(),
        }
    }
}

pub fn sign_in_redirect(original_uri: &str) -> String {
    format!(
        "{SIGN_IN_PATH}?callbackUrl={}",
        urlencoding::encode(original_uri)
    )
}

/// Resolves the caller and evaluates `policy` with live store lookups.
pub async fn authorize(
    state: &AppState,
    headers: &axum::http::HeaderMap,
    policy: &RoutePolicy,
) -> Result<(Identity, AccessContext), Denial> {
    let identity = state
        .identity
        .resolve(headers)
        .await
        .map_err(Denial::Failed)?
        .ok_or(Denial::Anonymous)?;

    let rbac = state.services().rbac();
    let access = load_access(&rbac, &identity.user_id, policy.needs_permissions())
        .await
        .map_err(Denial::Failed)?;

    if let Err(message) = policy.evaluate(&access.roles, &access.permissions) {
        tracing::info!(user_id = %identity.user_id, reason = %message, "access denied");
        return Err(Denial::Forbidden(message));
    }
    Ok((identity, access))
}

async fn load_access(
    rbac: &RbacService,
    user_id: &Uuid,
    with_permissions: bool,
) -> Result<AccessContext, AppError> {
    let roles = rbac.get_user_roles(user_id).await?;
    let permissions = if with_permissions {
        rbac.get_user_permissions(user_id).await?
    } else {
        BTreeSet::new()
    };
    let primary_role = Role::primary(roles.iter().map(String::as_str));
    Ok(AccessContext {
        roles,
        permissions,
        primary_role,
    })
}

/// Route layer enforcing a [`RoutePolicy`]. On success the request carries
/// [`Identity`] and [`AccessContext`] extensions plus `x-user-*` headers.
#[derive(Clone)]
pub struct RequirePolicyLayer {
    state: Arc<AppState>,
    policy: Arc<RoutePolicy>,
    class: RouteClass,
}

impl RequirePolicyLayer {
    pub fn new(state: Arc<AppState>, policy: RoutePolicy) -> Self {
        Self {
            state,
            policy: Arc::new(policy),
            class: RouteClass::Api,
        }
    }

    pub fn browser(mut self) -> Self {
        self.class = RouteClass::Browser;
        self
    }
}

impl<S> Layer<S> for RequirePolicyLayer {
    type Service = RequirePolicy<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePolicy {
            inner,
            state: Arc::clone(&self.state),
            policy: Arc::clone(&self.policy),
            class: self.class,
        }
    }
}

#[derive(Clone)]
pub struct RequirePolicy<S> {
    inner: S,
    state: Arc<AppState>,
    policy: Arc<RoutePolicy>,
    class: RouteClass,
}

impl<S> Service<Request<Body>> for RequirePolicy<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = Arc::clone(&self.state);
        let policy = Arc::clone(&self.policy);
        let class = self.class;

        Box::pin(async move {
            let outcome = authorize(&state, req.headers(), &policy).await;
            if let Ok((identity, _)) = &outcome {
                offer_renewal(req.extensions(), identity);
            }
            match outcome {
                Ok((identity, access)) => {
                    set_identity_headers(&mut req, &identity, access.primary_role.as_str());
                    req.extensions_mut().insert(identity);
                    req.extensions_mut().insert(access);
                    inner.call(req).await
                }
                Err(denial) => {
                    let uri = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_else(|| req.uri().path().to_string());
                    Ok(denial.respond(class, &uri))
                }
            }
        })
    }
}

/// Any authenticated caller. Reuses the identity a policy layer already
/// resolved for this request.
#[derive(Debug, Clone)]
pub struct AuthGuard(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(Self(identity));
        }

        let identity = state
            .identity
            .resolve(&parts.headers)
            .await?
            .ok_or_else(AppError::authentication_required)?;
        offer_renewal(&parts.extensions, &identity);
        parts.extensions.insert(identity.clone());
        Ok(Self(identity))
    }
}

/// Caller holding role `R`, checked live against the store.
pub struct AuthRoleGuard<R: RequiredRole> {
    pub identity: Identity,
    _marker: PhantomData<R>,
}

impl<R> FromRequestParts<Arc<AppState>> for AuthRoleGuard<R>
where
    R: RequiredRole,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthGuard(identity) = AuthGuard::from_request_parts(parts, state).await?;
        let required = R::required();

        if !state
            .services()
            .rbac()
            .has_role(&identity.user_id, required.as_str())
            .await?
        {
            return Err(AppError::forbidden(format!(
                "Required role: {}",
                required.as_str()
            )));
        }

        Ok(Self {
            identity,
            _marker: PhantomData,
        })
    }
}

/// An administrator may not strip `admin` from themselves.
pub fn ensure_not_self_lockout(
    caller: &Uuid,
    target: &Uuid,
    role_name: &str,
) -> Result<(), AppError> {
    if caller == target && role_name == Role::Admin.as_str() {
        return Err(AppError::bad_request(
            "Cannot remove admin role from yourself",
        ));
    }
    Ok(())
}
