//! Transitive discovery of the message types a seed set depends on.
//!
//! The resolver walks the field lists returned by a [`MetadataProvider`],
//! following every field whose element type is a nested message. A registry
//! keyed by qualified type name guarantees each type is expanded once, so
//! cyclic graphs terminate.

use std::collections::HashSet;

use msg2capnp_schema::QualifiedType;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{error::CompileError, policy::PolicySet, traits::MetadataProvider};

/// A dependency that the policy denies but a generated type requires. The
/// dependency is still generated so that every import resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigConflict {
    pub dependency:  QualifiedType,
    pub required_by: QualifiedType,
}

/// Types discovered during one resolution pass, in discovery order.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    order: Vec<QualifiedType>,
    seen:  HashSet<QualifiedType>,
}

impl TypeRegistry {
    /// Returns `false` when `ty` was already registered.
    pub fn insert(&mut self, ty: QualifiedType) -> bool {
        if self.seen.contains(&ty) {
            return false;
        }
        self.seen.insert(ty.clone());
        self.order.push(ty);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_types(self) -> Vec<QualifiedType> {
        self.order
    }
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub types:     Vec<QualifiedType>,
    pub conflicts: Vec<ConfigConflict>,
}

pub struct Resolver<'a, P: MetadataProvider + ?Sized> {
    provider:        &'a P,
    policy:          &'a PolicySet,
    expand_subtypes: bool,
}

impl<'a, P: MetadataProvider + ?Sized> Resolver<'a, P> {
    pub fn new(provider: &'a P, policy: &'a PolicySet) -> Self {
        Resolver {
            provider,
            policy,
            expand_subtypes: true,
        }
    }

    /// With expansion disabled, `resolve` returns the seeds unchanged.
    pub fn expand_subtypes(mut self, expand: bool) -> Self {
        self.expand_subtypes = expand;
        self
    }

    pub fn resolve<I>(&self, seed: I) -> Result<Resolution, CompileError>
    where
        I: IntoIterator<Item = QualifiedType>,
    {
        let mut registry = TypeRegistry::default();
        for ty in seed {
            registry.insert(ty);
        }

        if !self.expand_subtypes {
            warn!("Subtype expansion disabled; generating only the requested types");
            return Ok(Resolution {
                types:     registry.into_types(),
                conflicts: Vec::new(),
            });
        }

        info!("Gathering subtypes for {} message types", registry.len());

        let mut conflicts = Vec::new();
        let mut worklist: Vec<QualifiedType> = registry.order.iter().rev().cloned().collect();

        while let Some(ty) = worklist.pop() {
            let fields = self.provider.fields(&ty)?;
            let mut discovered = Vec::new();

            for field in &fields {
                let dependency = match field.message_type()? {
                    Some(dep) => dep,
                    None => continue,
                };

                if self.policy.is_denied(&dependency) {
                    warn!(
                        "{} is denied by the type policy but is required by {}",
                        dependency, ty
                    );
                    let conflict = ConfigConflict {
                        dependency:  dependency.clone(),
                        required_by: ty.clone(),
                    };
                    if !conflicts.contains(&conflict) {
                        conflicts.push(conflict);
                    }
                }

                if registry.insert(dependency.clone()) {
                    debug!("Adding type {} to processing list (required by {})", dependency, ty);
                    discovered.push(dependency);
                }
            }

            // depth-first, in field order
            worklist.extend(discovered.into_iter().rev());
        }

        info!("Total number of types (recursively) used: {}", registry.len());

        Ok(Resolution {
            types: registry.into_types(),
            conflicts,
        })
    }
}

/// Closes `seed` over nested message dependencies.
pub fn resolve<P, I>(seed: I, policy: &PolicySet, provider: &P) -> Result<Resolution, CompileError>
where
    P: MetadataProvider + ?Sized,
    I: IntoIterator<Item = QualifiedType>,
{
    Resolver::new(provider, policy).resolve(seed)
}
