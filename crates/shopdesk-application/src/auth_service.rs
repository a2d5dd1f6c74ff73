//! Login and logout flows.

use crate::resource_service::{ResourceService, tolerate_degraded};
use crate::router::Router;
use shopdesk_api::{Toast, ToastSink};
use shopdesk_core::auth::LoginForm;
use shopdesk_core::navigation::{Navigator, Route};
use shopdesk_core::resource::Resource;
use shopdesk_core::session::Session;
use shopdesk_core::Result;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthService {
    resources: ResourceService,
    router: Arc<Router>,
    toasts: Arc<dyn ToastSink>,
}

impl AuthService {
    pub fn new(resources: ResourceService, router: Arc<Router>, toasts: Arc<dyn ToastSink>) -> Self {
        Self {
            resources,
            router,
            toasts,
        }
    }

    /// Signs in and lands on the default route.
    ///
    /// The form is checked before anything is sent; a validation error comes
    /// back as is so the form can show it next to the field. Request failures
    /// also raise an error toast.
    pub async fn login(&self, form: &LoginForm) -> Result<Session> {
        form.validate()?;
        tracing::info!("[AuthService] Signing in {} to {}", form.email, form.business);

        match self.authenticate(form).await {
            Ok(session) => {
                self.router.navigate(Route::DEFAULT);
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("[AuthService] Sign-in failed: {}", e);
                if !e.is_session_fatal() {
                    self.toasts.push(Toast::error(e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Clears the session and every cached query, then shows the login route.
    pub fn logout(&self) -> Result<()> {
        let result = tolerate_degraded(self.resources.session().logout());
        self.router.hard_redirect(Route::LOGIN);
        result
    }

    async fn authenticate(&self, form: &LoginForm) -> Result<Session> {
        let session = self.resources.session();
        tolerate_degraded(session.set_business(form.business.trim()))?;

        let response = self.resources.api().login(form).await?;
        tolerate_degraded(session.set_auth(
            response.token,
            response.expires_in,
            response.user_id,
            response.role,
        ))?;

        // Never reuse another sign-in's answer.
        self.resources.queries().invalidate(Resource::BusinessInfo);
        self.resources.business_info().await?;

        Ok(session.snapshot())
    }
}
