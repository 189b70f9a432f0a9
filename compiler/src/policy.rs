use std::collections::BTreeSet;

use msg2capnp_schema::QualifiedType;
use serde::Serialize;
use tracing::warn;

use crate::mapping::target_scalar_names;

/// Allow/deny lists matched against both package names and short type names.
///
/// An entry on the allow list always wins over the deny list. A type named by
/// neither list is generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicySet {
    allow: BTreeSet<String>,
    deny:  BTreeSet<String>,
}

impl PolicySet {
    pub fn new() -> Self {
        PolicySet::default()
    }

    /// A policy whose deny list already holds the Cap'n Proto scalar names,
    /// so a message called `Bool` or `Text` is never generated on request.
    pub fn with_builtin_denials() -> Self {
        let mut policy = PolicySet::new();
        policy.extend_deny(target_scalar_names());
        policy
    }

    pub fn allow(&mut self, entry: impl Into<String>) {
        self.allow.insert(entry.into());
    }

    pub fn deny(&mut self, entry: impl Into<String>) {
        self.deny.insert(entry.into());
    }

    pub fn extend_allow<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow.extend(entries.into_iter().map(Into::into));
    }

    pub fn extend_deny<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny.extend(entries.into_iter().map(Into::into));
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allow.iter().map(String::as_str)
    }

    pub fn denied(&self) -> impl Iterator<Item = &str> {
        self.deny.iter().map(String::as_str)
    }

    fn matches(set: &BTreeSet<String>, ty: &QualifiedType) -> bool {
        set.contains(ty.package()) || set.contains(ty.name())
    }

    pub fn is_denied(&self, ty: &QualifiedType) -> bool {
        !PolicySet::matches(&self.allow, ty) && PolicySet::matches(&self.deny, ty)
    }

    /// Drops denied root-level requests, keeping order and removing repeats.
    pub fn filter_seeds<I>(&self, seeds: I) -> Vec<QualifiedType>
    where
        I: IntoIterator<Item = QualifiedType>,
    {
        let mut kept: Vec<QualifiedType> = Vec::new();
        for ty in seeds {
            if self.is_denied(&ty) {
                warn!("Skipping {}: denied by the type policy", ty);
                continue;
            }
            if !kept.contains(&ty) {
                kept.push(ty);
            }
        }
        kept
    }
}
