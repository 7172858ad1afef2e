//! Admission checks for pending commands.

use crate::context::Context;

/// Result of checking a command against the context registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Every required context exists, is enabled and is free
    Ready,
    /// Contexts exist but some are held or switched off
    Blocked {
        /// Required contexts held by an active command
        busy: Vec<String>,
        /// Required contexts that are disabled
        disabled: Vec<String>,
    },
    /// Some required contexts are not registered at all
    Missing(Vec<String>),
}

impl Admission {
    /// Whether the command may start now.
    pub fn is_ready(&self) -> bool {
        matches!(self, Admission::Ready)
    }
}

/// Look a context up by name.
pub(crate) fn find<'a>(registry: &'a [Box<dyn Context>], name: &str) -> Option<&'a dyn Context> {
    registry
        .iter()
        .find(|c| c.name() == name)
        .map(|c| &**c)
}

/// Check `required` against `registry`.
///
/// Missing contexts win over busy or disabled ones: a command that names
/// an unregistered context can never start, whatever else holds.
pub fn check(registry: &[Box<dyn Context>], required: &[String]) -> Admission {
    let mut missing = Vec::new();
    let mut busy = Vec::new();
    let mut disabled = Vec::new();

    for name in required {
        match find(registry, name) {
            None => missing.push(name.clone()),
            Some(context) => {
                if !context.is_enabled() {
                    disabled.push(name.clone());
                }
                if context.is_busy() {
                    busy.push(name.clone());
                }
            }
        }
    }

    if !missing.is_empty() {
        Admission::Missing(missing)
    } else if busy.is_empty() && disabled.is_empty() {
        Admission::Ready
    } else {
        Admission::Blocked { busy, disabled }
    }
}

/// Required contexts that are not registered.
pub fn missing(registry: &[Box<dyn Context>], required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| find(registry, name).is_none())
        .cloned()
        .collect()
}
