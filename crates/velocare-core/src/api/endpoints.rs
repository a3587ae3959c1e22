//! Fixed endpoint paths.
//!
//! Auth paths are relative to the auth base URL, resource paths to the API
//! base URL. Trailing slashes match what the backend routes expect; some auth
//! routes have none.

use crate::auth::Role;

/// Token refresh, accepts `{refresh}` and returns `{access}`
pub const TOKEN_REFRESH: &str = "token/refresh";

pub fn login(role: Role) -> &'static str {
    match role {
        Role::User => "token/",
        Role::Owner => "owner/token",
    }
}

pub fn register(role: Role) -> &'static str {
    match role {
        Role::User => "register/",
        Role::Owner => "owner/register/",
    }
}

// ===== Resources =====

pub const VEHICLES: &str = "vehicles/";
pub const COMPONENTS: &str = "components/";
pub const SERVICES: &str = "services/";
pub const ALL_ISSUES: &str = "all_issues/";
pub const REVENUE_DASHBOARD: &str = "services/revenue_dashboard";

pub fn vehicle(vehicle_id: i64) -> String {
    format!("vehicles/{}/", vehicle_id)
}

pub fn vehicle_issues(vehicle_id: i64) -> String {
    format!("vehicles/{}/issues/", vehicle_id)
}

pub fn vehicle_issue(vehicle_id: i64, issue_id: i64) -> String {
    format!("vehicles/{}/issues/{}/", vehicle_id, issue_id)
}

pub fn component(component_id: i64) -> String {
    format!("components/{}/", component_id)
}

pub fn service(service_id: i64) -> String {
    format!("services/{}/", service_id)
}

pub fn service_invoices(service_id: i64) -> String {
    format!("services/{}/invoices/", service_id)
}

pub fn service_invoice(service_id: i64, invoice_id: i64) -> String {
    format!("services/{}/invoices/{}/", service_id, invoice_id)
}

pub fn mark_invoice_paid(service_id: i64, invoice_id: i64) -> String {
    format!("services/{}/invoices/{}/mark_as_paid/", service_id, invoice_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_paths_per_role() {
        assert_eq!(login(Role::User), "token/");
        assert_eq!(login(Role::Owner), "owner/token");
        assert_eq!(register(Role::User), "register/");
        assert_eq!(register(Role::Owner), "owner/register/");
    }

    #[test]
    fn test_nested_resource_paths() {
        assert_eq!(vehicle_issue(3, 9), "vehicles/3/issues/9/");
        assert_eq!(service_invoices(4), "services/4/invoices/");
        assert_eq!(mark_invoice_paid(4, 2), "services/4/invoices/2/mark_as_paid/");
    }
}
