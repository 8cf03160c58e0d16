//! Explicit widget registry, owned by the application and handed to the
//! layout builder. There is no process-wide registration.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::builtin;
use crate::schema::{SchemaError, WidgetDefinition};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("widget `{namespace}.{type_name}` is already registered")]
    AlreadyRegistered { namespace: String, type_name: String },
    #[error("unknown widget `{0}`")]
    UnknownWidget(String),
    #[error("widget name `{name}` is ambiguous: registered in namespaces {namespaces:?}")]
    AmbiguousWidget { name: String, namespaces: Vec<String> },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Widget definitions keyed by `(namespace, type_name)`.
#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    widgets: BTreeMap<(String, String), Arc<WidgetDefinition>>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the bundled slider widgets.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for decl in builtin::WIDGETS {
            registry.register(WidgetDefinition::from_decl(decl)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, def: WidgetDefinition) -> Result<Arc<WidgetDefinition>, RegistryError> {
        let key = (def.namespace().to_string(), def.type_name().to_string());
        if self.widgets.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered { namespace: key.0, type_name: key.1 });
        }
        log::debug!("registered widget {}.{} v{}", key.0, key.1, def.version());
        let def = Arc::new(def);
        self.widgets.insert(key, Arc::clone(&def));
        Ok(def)
    }

    pub fn get(&self, namespace: &str, type_name: &str) -> Option<&Arc<WidgetDefinition>> {
        self.widgets.get(&(namespace.to_string(), type_name.to_string()))
    }

    /// Look a widget up by bare type name, or by `namespace.Type`.
    pub fn resolve(&self, name: &str) -> Result<&Arc<WidgetDefinition>, RegistryError> {
        if let Some((namespace, type_name)) = name.split_once('.') {
            return self
                .get(namespace, type_name)
                .ok_or_else(|| RegistryError::UnknownWidget(name.to_string()));
        }

        let mut matches = self.widgets.iter().filter(|((_, ty), _)| ty == name);
        match (matches.next(), matches.next()) {
            (Some((_, def)), None) => Ok(def),
            (None, _) => Err(RegistryError::UnknownWidget(name.to_string())),
            (Some(_), Some(_)) => Err(RegistryError::AmbiguousWidget {
                name: name.to_string(),
                namespaces: self
                    .widgets
                    .keys()
                    .filter(|(_, ty)| ty == name)
                    .map(|(ns, _)| ns.clone())
                    .collect(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WidgetDefinition>> {
        self.widgets.values()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PropKind, PropertySpec};

    fn widget(ns: &str, ty: &str) -> WidgetDefinition {
        WidgetDefinition::builder(ns, ty)
            .prop(PropertySpec::new("id", PropKind::String))
            .build()
            .unwrap()
    }

    #[test]
    fn builtins_resolve_by_bare_and_qualified_name() {
        let reg = WidgetRegistry::with_builtins().unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.resolve("DashSwiper").unwrap().namespace(), "dash_swiper");
        assert_eq!(reg.resolve("dash_swiper.DashCarousel").unwrap().type_name(), "DashCarousel");
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut reg = WidgetRegistry::new();
        reg.register(widget("a", "W")).unwrap();
        assert!(matches!(
            reg.register(widget("a", "W")),
            Err(RegistryError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn ambiguous_and_unknown_names() {
        let mut reg = WidgetRegistry::new();
        reg.register(widget("a", "W")).unwrap();
        reg.register(widget("b", "W")).unwrap();
        match reg.resolve("W") {
            Err(RegistryError::AmbiguousWidget { namespaces, .. }) => assert_eq!(namespaces, ["a", "b"]),
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert!(reg.resolve("b.W").is_ok());
        assert!(matches!(reg.resolve("Nope"), Err(RegistryError::UnknownWidget(_))));
    }
}
