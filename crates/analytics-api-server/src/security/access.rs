use serde::{Deserialize, Serialize};

/// Role hierarchy. Variant order defines privilege: visor < operador < admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Visor,
    Operador,
    Admin,
}

impl Role {
    /// Normalize a caller-supplied role signal. Anything unrecognized or
    /// absent collapses to the most restrictive role.
    pub fn normalize(raw: Option<&str>) -> Role {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Role::Admin,
            Some("operador") | Some("operator") => Role::Operador,
            Some("visor") | Some("viewer") => Role::Visor,
            _ => Role::Visor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Visor => "visor",
            Role::Operador => "operador",
            Role::Admin => "admin",
        }
    }
}

/// Immutable per-request identity: resolved once from request metadata and
/// passed to every resolver, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AccessContext {
    pub role: Role,
    pub allowed_tenants: Vec<String>,
    pub default_tenant: Option<String>,
}

impl AccessContext {
    pub fn resolve(
        role_signal: Option<&str>,
        tenants_signal: Option<&str>,
        default_tenant_signal: Option<&str>,
    ) -> Self {
        let allowed_tenants: Vec<String> = tenants_signal
            .map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let default_tenant = default_tenant_signal
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| allowed_tenants.first().cloned());
        Self {
            role: Role::normalize(role_signal),
            allowed_tenants,
            default_tenant,
        }
    }

    /// Admins see every tenant. Otherwise the requested tenant must be in
    /// the allow-list, or (when the list is empty) match the default tenant.
    pub fn can_access_tenant(&self, tenant_id: &str) -> bool {
        if tenant_id.is_empty() {
            return false;
        }
        if self.role == Role::Admin {
            return true;
        }
        if !self.allowed_tenants.is_empty() {
            return self.allowed_tenants.iter().any(|t| t == tenant_id);
        }
        self.default_tenant.as_deref() == Some(tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_is_ordered() {
        assert!(Role::Visor < Role::Operador);
        assert!(Role::Operador < Role::Admin);
    }

    #[test]
    fn unknown_roles_normalize_to_visor() {
        assert_eq!(Role::normalize(None), Role::Visor);
        assert_eq!(Role::normalize(Some("superuser")), Role::Visor);
        assert_eq!(Role::normalize(Some("")), Role::Visor);
        assert_eq!(Role::normalize(Some(" ADMIN ")), Role::Admin);
        assert_eq!(Role::normalize(Some("operator")), Role::Operador);
    }

    #[test]
    fn default_tenant_falls_back_to_first_allowed() {
        let ctx = AccessContext::resolve(Some("operador"), Some("t1, t2"), None);
        assert_eq!(ctx.default_tenant.as_deref(), Some("t1"));
        assert_eq!(ctx.allowed_tenants, vec!["t1", "t2"]);
    }

    #[test]
    fn admin_bypasses_tenant_scope() {
        let ctx = AccessContext::resolve(Some("admin"), Some("t1"), None);
        assert!(ctx.can_access_tenant("t-anything"));
    }

    #[test]
    fn allow_list_governs_when_present() {
        let ctx = AccessContext::resolve(Some("visor"), Some("t1,t2"), Some("t9"));
        assert!(ctx.can_access_tenant("t2"));
        assert!(!ctx.can_access_tenant("t9"));
    }

    #[test]
    fn default_tenant_governs_when_list_is_empty() {
        let ctx = AccessContext::resolve(Some("visor"), None, Some("t1"));
        assert!(ctx.can_access_tenant("t1"));
        assert!(!ctx.can_access_tenant("t2"));
        assert!(!ctx.can_access_tenant(""));
    }
}
