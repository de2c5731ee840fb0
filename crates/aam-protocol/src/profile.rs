//! Declared AppArmor profiles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mode a profile is switched into on the worker node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    /// Violations are blocked
    Enforce,
    /// Violations are only logged
    Complain,
}

impl fmt::Display for ProfileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileMode::Enforce => write!(f, "enforce"),
            ProfileMode::Complain => write!(f, "complain"),
        }
    }
}

/// Flags on the `profile` header written by [`Profile::render`]
pub const PROFILE_FLAGS: &str = "attach_disconnected,mediate_deleted";

/// A profile as declared in the `AppArmorProfile` custom resource.
///
/// `rules` is written to the node as is, so it must be a complete profile
/// the AppArmor parser accepts. Resources that only list rule lines (no
/// `profile NAME { }` block) produce a file `aa-enforce` rejects, and that
/// rejection only shows up as a logged warning during sync. Use
/// [`Profile::rendered`] to wrap bare rule lines before syncing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name, also the file name under `/etc/apparmor.d/`
    pub name: String,
    /// Free-form rule text written verbatim to the node
    pub rules: String,
    /// Desired mode: enforce when true, complain otherwise
    pub enforced: bool,
}

impl Profile {
    /// Create a new profile declaration
    pub fn new(name: impl Into<String>, rules: impl Into<String>, enforced: bool) -> Self {
        Self {
            name: name.into(),
            rules: rules.into(),
            enforced,
        }
    }

    /// The mode selected by the `enforced` flag
    pub fn mode(&self) -> ProfileMode {
        if self.enforced {
            ProfileMode::Enforce
        } else {
            ProfileMode::Complain
        }
    }

    /// Wrap the rule lines in a `profile NAME flags=(...) { }` block.
    ///
    /// Blank lines and `#` comments are dropped and every rule line gets a
    /// trailing comma if it lacks one.
    pub fn render(&self) -> String {
        let mut out = format!("profile {} flags=({}) {{\n", self.name, PROFILE_FLAGS);

        for line in self.rules.split('\n') {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            out.push('\t');
            out.push_str(line);
            if !line.ends_with(',') {
                out.push(',');
            }
            out.push('\n');
        }

        out.push('}');
        out
    }

    /// The same profile with its rules replaced by [`Profile::render`]
    pub fn rendered(&self) -> Self {
        Self {
            name: self.name.clone(),
            rules: self.render(),
            enforced: self.enforced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_follows_enforced_flag() {
        assert_eq!(Profile::new("a", "", true).mode(), ProfileMode::Enforce);
        assert_eq!(Profile::new("a", "", false).mode(), ProfileMode::Complain);
    }

    #[test]
    fn test_render_wraps_rule_lines() {
        let profile = Profile::new(
            "tcpdump",
            "capability net_raw,\n\n# for -D\ncapability sys_module\n  @{HOME}/ r,",
            true,
        );

        assert_eq!(
            profile.render(),
            "profile tcpdump flags=(attach_disconnected,mediate_deleted) {\n\
             \tcapability net_raw,\n\
             \tcapability sys_module,\n\
             \t  @{HOME}/ r,\n\
             }"
        );
    }

    #[test]
    fn test_render_empty_rules() {
        let profile = Profile::new("empty", "", false);
        assert_eq!(
            profile.render(),
            "profile empty flags=(attach_disconnected,mediate_deleted) {\n}"
        );
    }

    #[test]
    fn test_rendered_keeps_name_and_mode() {
        let rendered = Profile::new("p", "network,", true).rendered();
        assert_eq!(rendered.name, "p");
        assert!(rendered.enforced);
        assert!(rendered.rules.starts_with("profile p flags="));
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(ProfileMode::Enforce.to_string(), "enforce");
        assert_eq!(ProfileMode::Complain.to_string(), "complain");
    }
}
