mod vpp_admin_tools;

pub use vpp_admin_tools::VppAdminTools;

use crate::config::ServerConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A handler that materializes one mod's configuration fragments. Receives
/// the full resolved config and touches only its own mod's files.
#[async_trait]
pub trait ModConfigurator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn configure(&self, config: &ServerConfig) -> Result<(), String>;
}

/// Static name-to-handler mapping built once at construction. Lookups go
/// through [`normalize_mod_name`] so the raw spellings mod lists use in the
/// wild (`VPPAdminTools`, `@VPPAdminTools`, `vpp-admin-tools`) all land on
/// the same handler.
pub struct ConfiguratorRegistry {
    handlers: HashMap<String, Arc<dyn ModConfigurator>>,
}

impl ConfiguratorRegistry {
    pub fn new() -> Self {
        let mut handlers: HashMap<String, Arc<dyn ModConfigurator>> = HashMap::new();
        let vpp = Arc::new(VppAdminTools);
        for variant in ["VPPAdminTools", "@VPPAdminTools", "vpp-admin-tools"] {
            handlers.insert(normalize_mod_name(variant), vpp.clone());
        }
        Self { handlers }
    }

    pub fn lookup(&self, mod_name: &str) -> Option<&Arc<dyn ModConfigurator>> {
        self.handlers.get(&normalize_mod_name(mod_name))
    }
}

impl Default for ConfiguratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a raw mod name onto its canonical registry key: strip the `@`
/// prefix, drop separators, lowercase.
pub fn normalize_mod_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('@')
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '.'))
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelling_variants_normalize_to_one_key() {
        let variants = ["VPPAdminTools", "@VPPAdminTools", "vpp-admin-tools", "VPP_Admin_Tools"];
        for variant in variants {
            assert_eq!(normalize_mod_name(variant), "vppadmintools");
        }
    }

    #[test]
    fn registry_resolves_all_variants_to_the_same_handler() {
        let registry = ConfiguratorRegistry::new();
        for variant in ["VPPAdminTools", "@VPPAdminTools", "vpp-admin-tools"] {
            let handler = registry.lookup(variant).expect("handler missing");
            assert_eq!(handler.name(), "VPPAdminTools");
        }
    }

    #[test]
    fn unknown_mods_have_no_handler() {
        let registry = ConfiguratorRegistry::new();
        assert!(registry.lookup("@BaseBuildingPlus").is_none());
    }
}
