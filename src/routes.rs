//! Static route map and auth guard.
//!
//! Pages are presentation detail; what the client logic needs is the set of
//! destinations it can send the user to, which of them require a session,
//! and whether the internal admin page exists in this build.

use crate::config::ClientConfig;
use crate::session::SessionStore;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Home,
    Login,
    Register,
    Convert,
    Account,
    Pricing,
    Faq,
    Blog,
    /// Internal page, only routable when `admin_route_enabled` is set.
    Admin,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Home,
        Route::Login,
        Route::Register,
        Route::Convert,
        Route::Account,
        Route::Pricing,
        Route::Faq,
        Route::Blog,
        Route::Admin,
    ];

    /// Path relative to the base path.
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Convert => "/convert",
            Route::Account => "/account",
            Route::Pricing => "/pricing",
            Route::Faq => "/faq",
            Route::Blog => "/blog",
            Route::Admin => "/admin",
        }
    }

    /// Document title.
    pub fn title(self) -> &'static str {
        match self {
            Route::Home => "Sheet2Deck – CSV & Excel to PowerPoint",
            Route::Login => "Log in – Sheet2Deck",
            Route::Register => "Create an account – Sheet2Deck",
            Route::Convert => "Convert a file – Sheet2Deck",
            Route::Account => "My account – Sheet2Deck",
            Route::Pricing => "Pricing – Sheet2Deck",
            Route::Faq => "FAQ – Sheet2Deck",
            Route::Blog => "Blog – Sheet2Deck",
            Route::Admin => "Admin – Sheet2Deck",
        }
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Convert | Route::Account | Route::Admin)
    }
}

/// Something that can move the user to another page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// A navigator that ignores every request.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _route: Route) {}
}

/// Resolves paths against the configured base path and admin flag.
#[derive(Debug, Clone)]
pub struct Router {
    base_path: String,
    admin_enabled: bool,
}

impl Router {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_path: config.base_path.clone(),
            admin_enabled: config.admin_route_enabled,
        }
    }

    /// Full path including the base path.
    pub fn href(&self, route: Route) -> String {
        match route {
            Route::Home if !self.base_path.is_empty() => format!("{}/", self.base_path),
            _ => format!("{}{}", self.base_path, route.path()),
        }
    }

    /// Map a full path back to a route. Unknown paths and a disabled admin
    /// page resolve to `None`.
    pub fn resolve(&self, path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let relative = path.strip_prefix(self.base_path.as_str())?;
        let relative = match relative.trim_end_matches('/') {
            "" => "/",
            r => r,
        };
        Route::ALL
            .into_iter()
            .find(|r| r.path() == relative)
            .filter(|r| *r != Route::Admin || self.admin_enabled)
    }

    /// Redirect protected routes to the login page when logged out.
    pub fn guard(&self, route: Route, session: &SessionStore) -> Route {
        if route.requires_auth() && !session.is_authenticated() {
            Route::Login
        } else {
            route
        }
    }

    /// Guard, then hand the result to the navigator.
    pub fn go(&self, route: Route, session: &SessionStore, navigator: &Arc<dyn Navigator>) -> Route {
        let target = self.guard(route, session);
        navigator.navigate(target);
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserSnapshot;
    use std::sync::Mutex;

    fn router(base: &str, admin: bool) -> Router {
        let config = ClientConfig::builder()
            .base_path(base)
            .admin_route_enabled(admin)
            .build()
            .unwrap();
        Router::new(&config)
    }

    #[test]
    fn href_respects_base_path() {
        let r = router("/app", false);
        assert_eq!(r.href(Route::Login), "/app/login");
        assert_eq!(r.href(Route::Home), "/app/");
        assert_eq!(router("", false).href(Route::Home), "/");
    }

    #[test]
    fn resolve_known_and_unknown_paths() {
        let r = router("/app", false);
        assert_eq!(r.resolve("/app/faq"), Some(Route::Faq));
        assert_eq!(r.resolve("/app/convert/?x=1"), Some(Route::Convert));
        assert_eq!(r.resolve("/app"), Some(Route::Home));
        assert_eq!(r.resolve("/faq"), None);
        assert_eq!(r.resolve("/app/nope"), None);
    }

    #[test]
    fn admin_route_is_feature_flagged() {
        assert_eq!(router("", false).resolve("/admin"), None);
        assert_eq!(router("", true).resolve("/admin"), Some(Route::Admin));
    }

    #[test]
    fn guard_redirects_when_logged_out() {
        let r = router("", false);
        let session = SessionStore::in_memory();
        assert_eq!(r.guard(Route::Convert, &session), Route::Login);
        assert_eq!(r.guard(Route::Faq, &session), Route::Faq);

        session.save_login("t", &UserSnapshot::default()).unwrap();
        assert_eq!(r.guard(Route::Convert, &session), Route::Convert);
    }

    #[test]
    fn go_notifies_navigator() {
        struct Rec(Mutex<Vec<Route>>);
        impl Navigator for Rec {
            fn navigate(&self, route: Route) {
                self.0.lock().unwrap().push(route);
            }
        }
        let rec = Arc::new(Rec(Mutex::new(Vec::new())));
        let nav: Arc<dyn Navigator> = rec.clone();
        let r = router("", false);
        let target = r.go(Route::Account, &SessionStore::in_memory(), &nav);
        assert_eq!(target, Route::Login);
        assert_eq!(*rec.0.lock().unwrap(), vec![Route::Login]);
    }
}
