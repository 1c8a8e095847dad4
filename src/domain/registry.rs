//! Named collection of declared model types.

use std::rc::Rc;

use tracing::instrument;

use crate::domain::error::ConfigurationError;
use crate::domain::model::ModelType;

#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<Rc<ModelType>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding only the root entity type.
    pub fn new() -> Self {
        Self {
            types: vec![ModelType::entity()],
        }
    }

    pub fn register(&mut self, model: Rc<ModelType>) -> Result<(), ConfigurationError> {
        if self.get(model.name()).is_some() {
            return Err(ConfigurationError::DuplicateModel {
                model: model.name().to_string(),
            });
        }
        self.types.push(model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Rc<ModelType>> {
        self.types.iter().find(|t| t.name() == name)
    }

    /// Types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<ModelType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The whole registered subclass tree below `model`.
    ///
    /// No ordering guarantee is provided within the list.
    #[instrument(level = "debug", skip(self, model), fields(model = %model.name()))]
    pub fn subclasses_of(&self, model: &ModelType) -> Vec<Rc<ModelType>> {
        let mut all = Vec::new();
        for subclass in self
            .types
            .iter()
            .filter(|t| t.base().is_some_and(|b| std::ptr::eq(b.as_ref(), model)))
        {
            all.push(Rc::clone(subclass));
            all.extend(self.subclasses_of(subclass));
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::builder::ModelTypeBuilder;

    #[test]
    fn test_subclasses_of_walks_whole_tree() {
        let mut registry = TypeRegistry::new();
        let page = ModelTypeBuilder::new("Page").build().unwrap();
        let login = ModelTypeBuilder::new("LoginPage").extends(&page).build().unwrap();
        let sso = ModelTypeBuilder::new("SsoLoginPage").extends(&login).build().unwrap();
        let other = ModelTypeBuilder::new("Widget").build().unwrap();
        for ty in [&page, &login, &sso, &other] {
            registry.register(Rc::clone(ty)).unwrap();
        }

        let mut names: Vec<_> = registry
            .subclasses_of(&page)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["LoginPage", "SsoLoginPage"]);

        let entity = ModelType::entity();
        assert_eq!(registry.subclasses_of(&entity).len(), 4);
        assert!(registry.subclasses_of(&sso).is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_names() {
        let mut registry = TypeRegistry::new();
        let a = ModelTypeBuilder::new("Page").build().unwrap();
        let b = ModelTypeBuilder::new("Page").build().unwrap();
        registry.register(a).unwrap();
        assert!(matches!(
            registry.register(b),
            Err(ConfigurationError::DuplicateModel { .. })
        ));
    }
}
