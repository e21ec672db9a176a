//! Routing variables handed to connection-establishment code.

use std::collections::BTreeMap;

/// Prefix shared by every routing variable name.
pub const ROUTING_VAR_PREFIX: &str = "TWO_TASK";

/// Role a physical database plays for a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingRole {
    Primary,
    Standby,
    ReadOnly,
}

impl RoutingRole {
    fn suffix(&self) -> Option<&'static str> {
        match self {
            RoutingRole::Primary => None,
            RoutingRole::Standby => Some("STANDBY0"),
            RoutingRole::ReadOnly => Some("READ"),
        }
    }

    /// Variable name for this role, optionally shard-qualified.
    ///
    /// `TWO_TASK_3`, `TWO_TASK_STANDBY0_3`, `TWO_TASK_READ`, ...
    pub fn var_name(&self, shard: Option<usize>) -> String {
        let mut name = ROUTING_VAR_PREFIX.to_string();
        if let Some(suffix) = self.suffix() {
            name.push('_');
            name.push_str(suffix);
        }
        if let Some(shard) = shard {
            name.push('_');
            name.push_str(&shard.to_string());
        }
        name
    }
}

/// Environment-style bindings from routing variable name to descriptor entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingVars {
    vars: BTreeMap<String, String>,
}

impl RoutingVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `role` (for `shard`, or unsharded when `None`) to `entry`.
    pub fn set(&mut self, role: RoutingRole, shard: Option<usize>, entry: impl Into<String>) {
        self.vars.insert(role.var_name(shard), entry.into());
    }

    pub fn get(&self, role: RoutingRole, shard: Option<usize>) -> Option<&str> {
        self.vars.get(&role.var_name(shard)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate `(name, entry)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Publish every binding into the process environment.
    ///
    /// Must run during startup before any other thread reads the environment.
    pub fn export(&self) {
        for (name, entry) in &self.vars {
            std::env::set_var(name, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_names() {
        assert_eq!(RoutingRole::Primary.var_name(Some(0)), "TWO_TASK_0");
        assert_eq!(RoutingRole::Standby.var_name(Some(2)), "TWO_TASK_STANDBY0_2");
        assert_eq!(RoutingRole::ReadOnly.var_name(Some(11)), "TWO_TASK_READ_11");
        assert_eq!(RoutingRole::Standby.var_name(None), "TWO_TASK_STANDBY0");
        assert_eq!(RoutingRole::ReadOnly.var_name(None), "TWO_TASK_READ");
    }

    #[test]
    fn test_set_and_get() {
        let mut vars = RoutingVars::new();
        vars.set(RoutingRole::Primary, Some(0), "PAYDBR1_SH0");
        vars.set(RoutingRole::ReadOnly, None, "PAYDBR1_STATE");

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get(RoutingRole::Primary, Some(0)), Some("PAYDBR1_SH0"));
        assert_eq!(vars.get(RoutingRole::ReadOnly, None), Some("PAYDBR1_STATE"));
        assert_eq!(vars.get(RoutingRole::Standby, Some(0)), None);

        let names: Vec<_> = vars.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["TWO_TASK_0", "TWO_TASK_READ"]);
    }

    #[test]
    fn test_export() {
        let mut vars = RoutingVars::new();
        vars.set(RoutingRole::Standby, Some(907), "EXPORTR2_SH907");
        vars.export();

        assert_eq!(
            std::env::var("TWO_TASK_STANDBY0_907").unwrap(),
            "EXPORTR2_SH907"
        );
    }
}
