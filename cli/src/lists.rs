//! Allow/deny list files read from the working directory.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use msg2capnp_compiler::PolicySet;
use tracing::{debug, info};

pub const WHITELIST_FILE: &str = "whitelist";
pub const BLACKLIST_FILE: &str = "blacklist";

/// One entry per line; blank lines and `#` comments are ignored.
pub fn parse_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Reads `path` if it exists. A missing file yields `None`.
pub fn read_list(path: &Path) -> std::io::Result<Option<Vec<String>>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(parse_list(&text))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Builds the run's policy: the builtin denials, the command line entries,
/// then whatever the list files in `dir` add.
pub fn load_policy(dir: &Path, allow: &[String], deny: &[String]) -> std::io::Result<PolicySet> {
    let mut policy = PolicySet::with_builtin_denials();
    policy.extend_allow(allow.iter().cloned());
    policy.extend_deny(deny.iter().cloned());

    let mut found_file = false;
    if let Some(entries) = read_list(&dir.join(WHITELIST_FILE))? {
        info!("Using whitelist file ({} entries)", entries.len());
        policy.extend_allow(entries);
        found_file = true;
    }
    if let Some(entries) = read_list(&dir.join(BLACKLIST_FILE))? {
        info!("Using blacklist file ({} entries)", entries.len());
        policy.extend_deny(entries);
        found_file = true;
    }
    if !found_file {
        debug!("No whitelist or blacklist file in {}", dir.display());
    }

    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msg2capnp_schema::QualifiedType;

    fn ty(s: &str) -> QualifiedType {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_list() {
        let entries = parse_list("sensor_msgs\n\n  Imu  \n# comment\nrosgraph_msgs\r\n");
        assert_eq!(entries, vec!["sensor_msgs", "Imu", "rosgraph_msgs"]);
    }

    #[test]
    fn test_load_policy_merges_files() {
        let dir = std::env::temp_dir().join(format!("msg2capnp-lists-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(WHITELIST_FILE), "Imu\n").unwrap();
        fs::write(dir.join(BLACKLIST_FILE), "sensor_msgs\n").unwrap();

        let policy = load_policy(&dir, &[], &["rosgraph_msgs".to_string()]).unwrap();
        assert!(policy.is_denied(&ty("rosgraph_msgs/Log")));
        assert!(policy.is_denied(&ty("sensor_msgs/Image")));
        assert!(!policy.is_denied(&ty("sensor_msgs/Imu")));
        assert!(policy.is_denied(&ty("std_msgs/Bool")));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_files_are_ignored() {
        let dir = std::env::temp_dir().join(format!("msg2capnp-nolists-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let policy = load_policy(&dir, &[], &[]).unwrap();
        assert!(!policy.is_denied(&ty("nav_msgs/Odometry")));

        fs::remove_dir_all(&dir).unwrap();
    }
}
