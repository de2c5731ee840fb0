//! Shell command catalog
//!
//! Builds the exact command lines executed on worker nodes. The strings are
//! the contract with the AppArmor userspace tools on the node, so their
//! format and order must not drift.
//!
//! Every builder returns commands in execution order. Callers run them one
//! by one over a single SSH session.

use crate::profile::{Profile, ProfileMode};

/// Directory the AppArmor parser loads profiles from
pub const PROFILE_DIR: &str = "/etc/apparmor.d";

/// Directory holding links to profiles that must not be loaded
pub const DISABLE_DIR: &str = "/etc/apparmor.d/disable";

/// Staging directory for profile files before they are moved into place
pub const STAGING_DIR: &str = "/tmp";

/// Prints `Yes` when the AppArmor module is loaded and active
pub const ENABLED_CHECK_COMMAND: &str = "aa-enabled";

/// Dumps loaded profiles and their modes as JSON
pub const STATUS_QUERY_COMMAND: &str = "apparmor_status --json";

/// Privilege elevation prefix
const SUDO: &str = "sudo";

const INSTALL_COMMANDS: [&str; 4] = [
    "apt install -y apparmor-profiles apparmor-utils",
    r#"sed -i -e '/^GRUB_CMDLINE_LINUX_DEFAULT/s/"$/ apparmor=1 security=apparmor"/' /etc/default/grub"#,
    "update-grub",
    "reboot",
];

/// Quote a word for a POSIX shell.
///
/// Words made only of `[A-Za-z0-9._-]` are returned unchanged. Anything else
/// is wrapped in single quotes with embedded single quotes written as `'\''`.
pub fn shell_quote(word: &str) -> String {
    let is_safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if is_safe {
        word.to_string()
    } else {
        single_quote(word)
    }
}

/// Wrap text in single quotes unconditionally
fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Command printing `text` and a newline.
///
/// `echo` reads a lone word like `-n` or `-e` as an option, so such text
/// goes through `printf` instead.
fn print_command(text: &str) -> String {
    if is_echo_option(text) {
        format!("printf '%s\\n' {}", single_quote(text))
    } else {
        format!("echo {}", single_quote(text))
    }
}

fn is_echo_option(text: &str) -> bool {
    text.len() > 1
        && text.starts_with('-')
        && text[1..].chars().all(|c| matches!(c, 'n' | 'e' | 'E'))
}

/// Prefix a command with the privilege elevation invocation
pub fn elevate(command: &str) -> String {
    format!("{} {}", SUDO, command)
}

/// Install the AppArmor packages, turn the module on in the kernel command
/// line and reboot into it.
pub fn install_sequence() -> Vec<String> {
    INSTALL_COMMANDS.iter().map(|c| c.to_string()).collect()
}

/// Write the profile rules to the staging directory, then move the file into
/// the profile directory under the profile's name.
pub fn create_sequence(profile: &Profile) -> Vec<String> {
    let name = shell_quote(&profile.name);

    vec![
        format!(
            "{} > {}/{}",
            print_command(&profile.rules),
            STAGING_DIR,
            name
        ),
        format!("mv {}/{} {}/{}", STAGING_DIR, name, PROFILE_DIR, name),
    ]
}

/// Put the profile into enforce mode
pub fn enforce_sequence(name: &str) -> Vec<String> {
    vec![format!("aa-enforce {}/{}", PROFILE_DIR, shell_quote(name))]
}

/// Put the profile into complain mode
pub fn complain_sequence(name: &str) -> Vec<String> {
    vec![format!("aa-complain {}/{}", PROFILE_DIR, shell_quote(name))]
}

/// Select the mode commands for a profile from its `enforced` flag
pub fn set_mode_sequence(profile: &Profile) -> Vec<String> {
    match profile.mode() {
        ProfileMode::Enforce => enforce_sequence(&profile.name),
        ProfileMode::Complain => complain_sequence(&profile.name),
    }
}

/// Unload the profile and keep it from loading on the next boot
pub fn disable_sequence(name: &str) -> Vec<String> {
    let name = shell_quote(name);

    vec![
        format!("ln -s {}/{} {}/", PROFILE_DIR, name, DISABLE_DIR),
        format!("apparmor_parser -R {}/{}", PROFILE_DIR, name),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_sequence_order() {
        let commands = install_sequence();
        assert_eq!(
            commands,
            vec![
                "apt install -y apparmor-profiles apparmor-utils",
                "sed -i -e '/^GRUB_CMDLINE_LINUX_DEFAULT/s/\"$/ apparmor=1 security=apparmor\"/' /etc/default/grub",
                "update-grub",
                "reboot",
            ]
        );
    }

    #[test]
    fn test_create_sequence() {
        let profile = Profile::new("k8s-nginx", "file,\nnetwork inet tcp,", true);
        let commands = create_sequence(&profile);

        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0],
            "echo 'file,\nnetwork inet tcp,' > /tmp/k8s-nginx"
        );
        assert_eq!(commands[1], "mv /tmp/k8s-nginx /etc/apparmor.d/k8s-nginx");
    }

    #[test]
    fn test_create_sequence_escapes_single_quotes() {
        let profile = Profile::new("quoted", "deny /home/*/it's/** rw,", false);
        let commands = create_sequence(&profile);

        assert_eq!(
            commands[0],
            r"echo 'deny /home/*/it'\''s/** rw,' > /tmp/quoted"
        );
    }

    #[test]
    fn test_create_sequence_quotes_unsafe_names() {
        let profile = Profile::new("a b;reboot", "", false);
        let commands = create_sequence(&profile);

        assert_eq!(commands[0], "echo '' > /tmp/'a b;reboot'");
        assert_eq!(
            commands[1],
            "mv /tmp/'a b;reboot' /etc/apparmor.d/'a b;reboot'"
        );
    }

    #[test]
    fn test_create_sequence_rules_that_look_like_echo_options() {
        for rules in ["-n", "-e", "-neE"] {
            let commands = create_sequence(&Profile::new("p", rules, true));
            assert_eq!(
                commands[0],
                format!(r"printf '%s\n' '{}' > /tmp/p", rules)
            );
        }

        // Only a lone option word is affected
        let commands = create_sequence(&Profile::new("p", "-n file,", true));
        assert_eq!(commands[0], "echo '-n file,' > /tmp/p");
    }

    #[test]
    fn test_create_sequence_rendered_profile() {
        let profile = Profile::new("p", "file", true).rendered();
        assert_eq!(
            create_sequence(&profile)[0],
            "echo 'profile p flags=(attach_disconnected,mediate_deleted) {\n\tfile,\n}' > /tmp/p"
        );
    }

    #[test]
    fn test_set_mode_sequence_selects_one_mode() {
        let enforced = Profile::new("p", "", true);
        let complain = Profile::new("p", "", false);

        assert_eq!(
            set_mode_sequence(&enforced),
            vec!["aa-enforce /etc/apparmor.d/p"]
        );
        assert_eq!(
            set_mode_sequence(&complain),
            vec!["aa-complain /etc/apparmor.d/p"]
        );
    }

    #[test]
    fn test_disable_sequence() {
        assert_eq!(
            disable_sequence("p"),
            vec![
                "ln -s /etc/apparmor.d/p /etc/apparmor.d/disable/",
                "apparmor_parser -R /etc/apparmor.d/p",
            ]
        );
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain-name_1.0"), "plain-name_1.0");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$(id)"), "'$(id)'");
    }

    #[test]
    fn test_elevate() {
        assert_eq!(elevate(ENABLED_CHECK_COMMAND), "sudo aa-enabled");
    }
}
