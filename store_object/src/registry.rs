//! Metadata registry
//!
//! Resolves entity shapes to validated [`EntityMetadata`] once and caches the result per
//! registry instance. Concurrent first use of a shape may build the metadata more than
//! once; the first value stored wins and the others are dropped.

use crate::errors::MappingError;
use crate::metadata::{EntityDescriptor, EntityMetadata};
use crate::traits::TableMetadata;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Identity of an entity shape plus the function describing it
#[derive(Clone, Copy)]
pub struct EntityShape {
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> EntityDescriptor,
}

impl EntityShape {
    pub fn of<T: TableMetadata>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: T::descriptor,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for EntityShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityShape").field(&self.type_name).finish()
    }
}

#[derive(Default)]
pub struct EntityRegistry {
    cache: RwLock<HashMap<TypeId, Arc<EntityMetadata>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<T: TableMetadata>(&self) -> Result<Arc<EntityMetadata>, MappingError> {
        self.resolve_shape(EntityShape::of::<T>())
    }

    pub fn resolve_shape(&self, shape: EntityShape) -> Result<Arc<EntityMetadata>, MappingError> {
        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&shape.type_id)
        {
            return Ok(Arc::clone(found));
        }

        let built = match EntityMetadata::build((shape.describe)()) {
            Ok(meta) => Arc::new(meta),
            Err(err) => {
                tracing::error!(entity = shape.type_name, error = %err, "Invalid entity metadata");
                return Err(err);
            }
        };
        crate::debug_log!("Resolved metadata for {} (table {})", shape.type_name, built.table());

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(shape.type_id).or_insert(built)))
    }

    pub fn contains<T: TableMetadata>(&self) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnDescriptor;
    use std::thread;
    use type_mapping::{LogicalType, RowView, SqlValue, ValueError};

    struct Lecturer;

    impl TableMetadata for Lecturer {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("t_lecturer")
                .column(ColumnDescriptor::new("id", "id", LogicalType::Number).primary_key())
        }

        fn column_values(&self) -> Result<Vec<SqlValue>, ValueError> {
            Ok(vec![SqlValue::Null])
        }

        fn from_row(_row: &RowView<'_>) -> Result<Self, ValueError> {
            Ok(Lecturer)
        }

        fn set_generated_key(&mut self, _key: &SqlValue) -> Result<(), ValueError> {
            Ok(())
        }
    }

    struct Keyless;

    impl TableMetadata for Keyless {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("t_keyless")
                .column(ColumnDescriptor::new("name", "name", LogicalType::String))
        }

        fn column_values(&self) -> Result<Vec<SqlValue>, ValueError> {
            Ok(vec![SqlValue::Null])
        }

        fn from_row(_row: &RowView<'_>) -> Result<Self, ValueError> {
            Ok(Keyless)
        }

        fn set_generated_key(&mut self, _key: &SqlValue) -> Result<(), ValueError> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_caches_per_type() {
        let registry = EntityRegistry::new();
        let first = registry.resolve::<Lecturer>().unwrap();
        let second = registry.resolve::<Lecturer>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let registry = EntityRegistry::new();
        assert!(registry.resolve::<Keyless>().is_err());
        assert!(!registry.contains::<Keyless>());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_resolution_agrees() {
        let registry = Arc::new(EntityRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.resolve::<Lecturer>().unwrap())
            })
            .collect();

        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let cached = registry.resolve::<Lecturer>().unwrap();
        assert!(resolved.iter().all(|m| **m == *cached));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registries_are_independent() {
        let a = EntityRegistry::new();
        let b = EntityRegistry::new();
        a.resolve::<Lecturer>().unwrap();
        assert!(a.contains::<Lecturer>());
        assert!(!b.contains::<Lecturer>());
    }
}
