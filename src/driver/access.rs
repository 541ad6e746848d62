//! Access rule translation
//!
//! Orchestrator access rules become one NFS export rule-string. The whole
//! rule set is rendered every time; the result replaces whatever the
//! filesystem had before.

use crate::domain::share::{AccessRule, ACCESS_LEVEL_RO, ACCESS_LEVEL_RW, ACCESS_TYPE_IP};
use crate::error::{Error, Result};

/// Translate an access level into the array's token
pub fn flashblade_access_level(rule: &AccessRule) -> Result<&'static str> {
    match rule.access_level.as_str() {
        ACCESS_LEVEL_RW => Ok("rw"),
        ACCESS_LEVEL_RO => Ok("ro"),
        other => Err(Error::InvalidAccessLevel(other.to_string())),
    }
}

/// Render the NFS rule-string for a complete rule set.
///
/// Only `ip` rules contribute; user and certificate rules are skipped.
/// An empty result revokes all access.
pub fn render_nfs_rules(rules: &[AccessRule]) -> Result<String> {
    let mut rendered = String::new();
    for rule in rules.iter().filter(|r| r.access_type == ACCESS_TYPE_IP) {
        let level = flashblade_access_level(rule)?;
        rendered.push_str(&rule.access_to);
        rendered.push('(');
        rendered.push_str(level);
        rendered.push_str(",no_root_squash) ");
    }
    Ok(rendered)
}
