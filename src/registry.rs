//! The extension registry: ordered, unique-name storage for registered
//! [`Extension`] descriptors.

use std::collections::HashMap;

use crate::error::RegistrationError;
use crate::extension::{Extension, ExtensionKind};

/// Holds registered extensions in insertion order and rejects malformed or
/// duplicate registrations. Extensions are added once, before any offer or
/// response is produced.
#[derive(Default)]
pub struct Registry {
    by_name: HashMap<String, usize>,
    in_order: Vec<Extension>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension.
    ///
    /// Validates the name is non-empty, the kind is the one recognized
    /// discriminator, and the name is not already registered. A rejected
    /// registration leaves the registry's state untouched. This is a
    /// programming-error class (see [`RegistrationError`]), not a
    /// negotiation-time failure.
    pub fn add(&mut self, extension: Extension) -> Result<(), RegistrationError> {
        if extension.name().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if extension.kind() != ExtensionKind::PerMessage {
            return Err(RegistrationError::WrongKind {
                name: extension.name().to_string(),
            });
        }
        if self.by_name.contains_key(extension.name()) {
            return Err(RegistrationError::DuplicateName {
                name: extension.name().to_string(),
            });
        }

        self.by_name
            .insert(extension.name().to_string(), self.in_order.len());
        self.in_order.push(extension);
        Ok(())
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.in_order.len()
    }

    /// True if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.in_order.is_empty()
    }

    /// Iterate registered extensions in registration (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.in_order.iter()
    }

    /// Look up a registered extension by name.
    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.by_name.get(name).map(|&idx| &self.in_order[idx])
    }
}
