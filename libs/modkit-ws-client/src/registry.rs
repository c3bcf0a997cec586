use crate::di::TypeKey;
use crate::error::ClientFactoryError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Records which wrapper type owns each client name.
///
/// Named configuration is keyed by name only, so two different typed clients sharing a
/// name would silently share one configuration chain. Registrations that opt into
/// validation are checked here at setup time.
#[derive(Debug, Default)]
pub struct ClientMappingRegistry {
    named_registrations: RwLock<HashMap<String, TypeKey>>,
}

impl ClientMappingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for `type_key`.
    ///
    /// With `validate == false` this is a pass-through that neither checks nor records.
    /// With `validate == true` the first claim is recorded; a later claim by the same type
    /// succeeds, a claim by a different type fails.
    ///
    /// # Errors
    /// `ClientFactoryError::NameConflict` naming both types and the client name.
    pub fn reserve(
        &self,
        name: &str,
        type_key: TypeKey,
        validate: bool,
    ) -> Result<(), ClientFactoryError> {
        if !validate {
            return Ok(());
        }

        let mut registrations = self.named_registrations.write();
        if let Some(existing) = registrations.get(name) {
            if *existing != type_key {
                return Err(ClientFactoryError::NameConflict {
                    name: name.to_owned(),
                    existing_type: existing.name(),
                    existing_short: existing.short_name(),
                    requested_type: type_key.name(),
                });
            }
            return Ok(());
        }

        tracing::debug!(client = name, r#type = type_key.name(), "Reserved client name");
        registrations.insert(name.to_owned(), type_key);
        Ok(())
    }

    /// The type that claimed `name` through a validated registration.
    #[must_use]
    pub fn owner_of(&self, name: &str) -> Option<TypeKey> {
        self.named_registrations.read().get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.named_registrations.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.named_registrations.read().is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    struct Foo;
    struct Bar;

    #[test]
    fn same_type_may_claim_a_name_twice() {
        let registry = ClientMappingRegistry::new();
        registry.reserve("X", TypeKey::of::<Foo>(), true).unwrap();
        registry.reserve("X", TypeKey::of::<Foo>(), true).unwrap();

        assert_eq!(registry.owner_of("X"), Some(TypeKey::of::<Foo>()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_type_conflicts_when_validated() {
        let registry = ClientMappingRegistry::new();
        registry.reserve("X", TypeKey::of::<Foo>(), true).unwrap();

        let err = registry
            .reserve("X", TypeKey::of::<Bar>(), true)
            .unwrap_err();
        match err {
            ClientFactoryError::NameConflict {
                name,
                existing_type,
                requested_type,
                ..
            } => {
                assert_eq!(name, "X");
                assert!(existing_type.ends_with("Foo"));
                assert!(requested_type.ends_with("Bar"));
            }
            other => panic!("expected NameConflict, got {other:?}"),
        }
        assert_eq!(registry.owner_of("X"), Some(TypeKey::of::<Foo>()));
    }

    #[test]
    fn unvalidated_claims_never_fail_and_are_not_recorded() {
        let registry = ClientMappingRegistry::new();
        registry.reserve("X", TypeKey::of::<Foo>(), false).unwrap();
        registry.reserve("X", TypeKey::of::<Bar>(), false).unwrap();

        assert!(registry.is_empty());
        assert!(registry.owner_of("X").is_none());
    }

    #[test]
    fn unvalidated_claim_does_not_disturb_an_existing_owner() {
        let registry = ClientMappingRegistry::new();
        registry.reserve("X", TypeKey::of::<Foo>(), true).unwrap();
        registry.reserve("X", TypeKey::of::<Bar>(), false).unwrap();

        assert_eq!(registry.owner_of("X"), Some(TypeKey::of::<Foo>()));
    }
}
