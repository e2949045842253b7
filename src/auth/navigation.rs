// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route classification and the redirect decision table.
//!
//! | user | auth page | protected | redirect                         |
//! |------|-----------|-----------|----------------------------------|
//! | yes  | yes       | -         | `redirect` query param, else `/` |
//! | yes  | no        | -         | none                             |
//! | no   | -         | yes       | `/login?redirect=<path>`         |
//! | no   | -         | no        | none                             |

/// Paths that require a signed-in user.
pub const PROTECTED_PREFIXES: &[&str] = &["/profile", "/create-bean", "/create-roaster"];

/// Sign-in pages a signed-in user is sent away from.
pub const AUTH_PAGE_PREFIXES: &[&str] = &["/login", "/signup"];

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
/// Where a signed-out visitor lands, with the toast message for the page.
pub const SIGNED_OUT_PATH: &str = "/login?message=signed_out";

/// How a path is treated by the redirect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthPage,
    Public,
}

/// Classify a path by plain string-prefix match.
pub fn classify(path: &str) -> RouteClass {
    if PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        RouteClass::Protected
    } else if AUTH_PAGE_PREFIXES.iter().any(|p| path.starts_with(p)) {
        RouteClass::AuthPage
    } else {
        RouteClass::Public
    }
}

/// A navigable location: path plus raw (still encoded) query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Option<String>,
}

impl Location {
    /// Parse `"/path?query"`.
    pub fn parse(target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => Self {
                path: path.to_string(),
                query: (!query.is_empty()).then(|| query.to_string()),
            },
            None => Self {
                path: target.to_string(),
                query: None,
            },
        }
    }

    /// Path and query as they appear in a URL.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Decoded value of the first query parameter named `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key != name {
                return None;
            }
            let value = value.replace('+', " ");
            urlencoding::decode(&value).ok().map(|v| v.into_owned())
        })
    }
}

/// Login page URL carrying `return_to` as its `redirect` parameter.
pub fn login_redirect(return_to: &str) -> String {
    format!("{}?redirect={}", LOGIN_PATH, urlencoding::encode(return_to))
}

/// Only same-site absolute paths are accepted as post-login destinations,
/// and never an auth page (which would bounce straight back).
fn is_safe_destination(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains('\\')
        && classify(&Location::parse(target).path) != RouteClass::AuthPage
}

/// Destination after signing in: `requested` when it is a safe local path.
pub fn post_login_destination(requested: Option<&str>) -> String {
    requested
        .filter(|target| is_safe_destination(target))
        .unwrap_or(HOME_PATH)
        .to_string()
}

/// Where a visitor at `location` must be sent, if anywhere.
pub fn redirect_for(user_present: bool, location: &Location) -> Option<String> {
    match (user_present, classify(&location.path)) {
        (true, RouteClass::AuthPage) => Some(post_login_destination(
            location.query_param("redirect").as_deref(),
        )),
        (false, RouteClass::Protected) => Some(login_redirect(&location.path_and_query())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("/profile"), RouteClass::Protected);
        assert_eq!(classify("/profile/settings"), RouteClass::Protected);
        assert_eq!(classify("/create-bean"), RouteClass::Protected);
        assert_eq!(classify("/create-roaster"), RouteClass::Protected);
        assert_eq!(classify("/login"), RouteClass::AuthPage);
        assert_eq!(classify("/signup"), RouteClass::AuthPage);
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/beans/1"), RouteClass::Public);
    }

    #[test]
    fn test_logged_out_protected_goes_to_login_with_return_path() {
        for path in ["/profile", "/create-bean", "/create-roaster", "/profile/edit"] {
            let target = redirect_for(false, &Location::parse(path)).unwrap();
            let login = Location::parse(&target);
            assert_eq!(login.path, "/login");
            assert_eq!(login.query_param("redirect").as_deref(), Some(path));
        }
    }

    #[test]
    fn test_return_path_keeps_query_string() {
        let target = redirect_for(false, &Location::parse("/create-bean?roaster=2")).unwrap();
        assert_eq!(target, "/login?redirect=%2Fcreate-bean%3Froaster%3D2");
        assert_eq!(
            Location::parse(&target).query_param("redirect").as_deref(),
            Some("/create-bean?roaster=2")
        );
    }

    #[test]
    fn test_logged_in_auth_page_goes_home_without_redirect_param() {
        for path in ["/login", "/signup", "/login?message=signed_out"] {
            assert_eq!(
                redirect_for(true, &Location::parse(path)).as_deref(),
                Some("/")
            );
        }
    }

    #[test]
    fn test_logged_in_auth_page_follows_redirect_param() {
        let location = Location::parse("/login?redirect=%2Fcreate-bean");
        assert_eq!(
            redirect_for(true, &location).as_deref(),
            Some("/create-bean")
        );
    }

    #[test]
    fn test_unsafe_redirect_param_falls_back_home() {
        for query in [
            "redirect=https%3A%2F%2Fevil.example",
            "redirect=%2F%2Fevil.example",
            "redirect=%2Flogin",
        ] {
            let location = Location::parse(&format!("/login?{query}"));
            assert_eq!(redirect_for(true, &location).as_deref(), Some("/"));
        }
    }

    #[test]
    fn test_no_redirect_cases() {
        assert_eq!(redirect_for(true, &Location::parse("/profile")), None);
        assert_eq!(redirect_for(true, &Location::parse("/beans/1")), None);
        assert_eq!(redirect_for(false, &Location::parse("/login")), None);
        assert_eq!(redirect_for(false, &Location::parse("/")), None);
    }
}
