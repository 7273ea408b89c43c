//! Portal definitions — the authorization scope unit.
//!
//! A portal is one tenant-facing application surface (admin, vms,
//! ams, vendor). The set is fixed and read from configuration once
//! at startup; module ids and privileged role ids live here and
//! nowhere else.

use serde::{Deserialize, Serialize};

use crate::error::{PorticoError, PorticoResult};

/// One portal entry in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portal {
    /// Portal name as it appears in token claims (`domain` /
    /// `allowed_domains`).
    pub name: String,
    /// Store-side module identifier used in grant/request rows.
    pub module_id: u32,
    /// Role ids that satisfy `check_access` for this portal.
    pub privileged_roles: Vec<u32>,
    /// Whether password login is permitted. SSO is mandatory for
    /// staff portals, so this is false for admin/vms/ams.
    pub local_login: bool,
    /// Frontend URL the SSO callback redirects to.
    pub frontend_url: String,
}

/// The configured portal set, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PortalRegistry {
    portals: Vec<Portal>,
}

impl PortalRegistry {
    pub fn new(portals: Vec<Portal>) -> Self {
        Self { portals }
    }

    /// Look up a portal by name; unknown names are an error everywhere
    /// in the system.
    pub fn get(&self, name: &str) -> PorticoResult<&Portal> {
        self.portals
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PorticoError::UnknownPortal {
                portal: name.to_string(),
            })
    }

    pub fn get_by_module(&self, module_id: u32) -> PorticoResult<&Portal> {
        self.portals
            .iter()
            .find(|p| p.module_id == module_id)
            .ok_or_else(|| PorticoError::UnknownPortal {
                portal: format!("module {module_id}"),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.portals.iter().any(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.portals.iter().map(|p| p.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Portal> {
        self.portals.iter()
    }
}

impl Default for PortalRegistry {
    /// The standard four-portal deployment. Module and role ids match
    /// the back-office store schema.
    fn default() -> Self {
        Self::new(vec![
            Portal {
                name: "admin".into(),
                module_id: 1,
                privileged_roles: vec![1, 2],
                local_login: false,
                frontend_url: "https://admin.example.com".into(),
            },
            Portal {
                name: "ams".into(),
                module_id: 3,
                privileged_roles: vec![9, 10],
                local_login: false,
                frontend_url: "https://ams.example.com".into(),
            },
            Portal {
                name: "vms".into(),
                module_id: 4,
                privileged_roles: vec![6, 7],
                local_login: false,
                frontend_url: "https://vms.example.com".into(),
            },
            Portal {
                name: "vendor".into(),
                module_id: 5,
                privileged_roles: vec![3, 4],
                local_login: true,
                frontend_url: "https://vendor.example.com".into(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_lookups() {
        let registry = PortalRegistry::default();
        assert_eq!(registry.get("vms").unwrap().module_id, 4);
        assert_eq!(registry.get_by_module(1).unwrap().name, "admin");
        assert!(registry.contains("vendor"));
    }

    #[test]
    fn unknown_portal_is_error() {
        let registry = PortalRegistry::default();
        let err = registry.get("intranet").unwrap_err();
        assert!(matches!(err, PorticoError::UnknownPortal { .. }));
    }

    #[test]
    fn only_vendor_allows_password_login() {
        let registry = PortalRegistry::default();
        for portal in registry.iter() {
            assert_eq!(portal.local_login, portal.name == "vendor");
        }
    }
}
