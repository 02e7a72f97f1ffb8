use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    #[serde(alias = "student")]
    Pupil,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Pupil => "pupil",
        }
    }

    pub fn can_manage_sessions(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_enter_scores(&self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }

    pub fn can_delete_results(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            // Accounts created before the student -> pupil rename.
            "pupil" | "student" => Ok(Role::Pupil),
            _ => Err(ParseRoleError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Dashboard,
    AdminDashboard,
    TeacherDashboard,
    PupilDashboard,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Route> {
        match path.trim_end_matches('/') {
            "" => Some(Route::Home),
            "/login" => Some(Route::Login),
            "/dashboard" => Some(Route::Dashboard),
            "/admin-dashboard" => Some(Route::AdminDashboard),
            "/teacher-dashboard" => Some(Route::TeacherDashboard),
            "/pupil-dashboard" | "/student-dashboard" => Some(Route::PupilDashboard),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::AdminDashboard => "/admin-dashboard",
            Route::TeacherDashboard => "/teacher-dashboard",
            Route::PupilDashboard => "/pupil-dashboard",
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Home | Route::Login)
    }

    /// Landing page after sign-in.
    pub fn dashboard_for(role: Role) -> Route {
        match role {
            Role::Admin => Route::AdminDashboard,
            Role::Teacher => Route::TeacherDashboard,
            Role::Pupil => Route::PupilDashboard,
        }
    }
}

/// Roles allowed on a route. An empty slice places no role restriction.
pub fn allowed_roles(route: Route) -> &'static [Role] {
    match route {
        Route::Home | Route::Login | Route::Dashboard => &[],
        Route::AdminDashboard => &[Role::Admin],
        Route::TeacherDashboard => &[Role::Teacher],
        Route::PupilDashboard => &[Role::Pupil],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    RedirectLogin,
    RedirectHome,
}

pub fn can_access(role: Option<Role>, route: Route) -> Access {
    if !route.requires_auth() {
        return Access::Granted;
    }

    let Some(role) = role else {
        return Access::RedirectLogin;
    };

    let allowed = allowed_roles(route);
    if allowed.is_empty() || allowed.contains(&role) {
        Access::Granted
    } else {
        Access::RedirectHome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_student_role_maps_to_pupil() {
        assert_eq!("student".parse::<Role>(), Ok(Role::Pupil));
        assert_eq!("Pupil".parse::<Role>(), Ok(Role::Pupil));
        assert!("parent".parse::<Role>().is_err());

        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Pupil);
    }

    #[test]
    fn dashboards_are_role_scoped() {
        assert_eq!(can_access(Some(Role::Admin), Route::AdminDashboard), Access::Granted);
        assert_eq!(
            can_access(Some(Role::Teacher), Route::AdminDashboard),
            Access::RedirectHome
        );
        assert_eq!(
            can_access(Some(Role::Pupil), Route::TeacherDashboard),
            Access::RedirectHome
        );
        assert_eq!(can_access(Some(Role::Pupil), Route::PupilDashboard), Access::Granted);
    }

    #[test]
    fn anonymous_users_are_sent_to_login() {
        assert_eq!(can_access(None, Route::Dashboard), Access::RedirectLogin);
        assert_eq!(can_access(None, Route::PupilDashboard), Access::RedirectLogin);
        assert_eq!(can_access(None, Route::Home), Access::Granted);
        assert_eq!(can_access(None, Route::Login), Access::Granted);
    }

    #[test]
    fn shared_dashboard_accepts_every_role() {
        for role in [Role::Admin, Role::Teacher, Role::Pupil] {
            assert_eq!(can_access(Some(role), Route::Dashboard), Access::Granted);
        }
    }

    #[test]
    fn paths_resolve_including_legacy_alias() {
        assert_eq!(Route::from_path("/"), Some(Route::Home));
        assert_eq!(Route::from_path("/student-dashboard"), Some(Route::PupilDashboard));
        assert_eq!(Route::from_path("/admin-dashboard/"), Some(Route::AdminDashboard));
        assert_eq!(Route::from_path("/reports"), None);
        assert_eq!(Route::dashboard_for(Role::Teacher).path(), "/teacher-dashboard");
    }

    #[test]
    fn capabilities_follow_roles() {
        assert!(Role::Admin.can_manage_sessions());
        assert!(!Role::Teacher.can_manage_sessions());
        assert!(Role::Teacher.can_enter_scores());
        assert!(!Role::Pupil.can_enter_scores());
        assert!(!Role::Teacher.can_delete_results());
    }
}
