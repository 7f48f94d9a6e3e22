use super::DbHelper;
use crate::errors::StoreError;
use crate::query_builder::sql_generation::primary_key_value;
use crate::query_builder::{QueryBuilder, SqlGenerator, UpdateSet, COUNT_COLUMN};
use crate::traits::{DatabaseSession, TableMetadata};
use type_mapping::SqlValue;

impl<S: DatabaseSession> DbHelper<S> {
    /// Insert `entity` and write the generated primary key back into it
    pub async fn insert<T: TableMetadata>(&self, entity: &mut T) -> Result<SqlValue, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::insert(&meta, &entity.column_values()?)?;
        let rows = self.executor().fetch(&statement).await?;

        let key = rows
            .first()
            .and_then(|row| row.get(&meta.primary_key().name))
            .cloned()
            .unwrap_or(SqlValue::Null);
        if !key.is_null() {
            entity.set_generated_key(&key)?;
        }
        crate::debug_log!("Inserted into {} with key {:?}", meta.table(), key);
        Ok(key)
    }

    pub async fn get_by_key<T: TableMetadata>(
        &self,
        key: impl Into<SqlValue>,
    ) -> Result<Option<T>, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::select_by_key(&meta, key.into())?;
        let rows = self.executor().fetch(&statement).await?;
        Ok(rows.first().map(|row| T::from_row(&row.view())).transpose()?)
    }

    pub async fn get_all<T: TableMetadata>(&self, query: QueryBuilder) -> Result<Vec<T>, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::select(&meta, &query)?;
        let rows = self.executor().fetch(&statement).await?;
        rows.iter()
            .map(|row| T::from_row(&row.view()).map_err(StoreError::from))
            .collect()
    }

    /// First matching entity
    pub async fn get_one<T: TableMetadata>(&self, query: QueryBuilder) -> Result<Option<T>, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::select_first(&meta, &query)?;
        let rows = self.executor().fetch(&statement).await?;
        Ok(rows.first().map(|row| T::from_row(&row.view())).transpose()?)
    }

    pub async fn get_count<T: TableMetadata>(&self, query: QueryBuilder) -> Result<i64, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::count(&meta, &query)?;
        self.run_count(&statement).await
    }

    pub(crate) async fn run_count(
        &self,
        statement: &crate::query_builder::Statement,
    ) -> Result<i64, StoreError> {
        let rows = self.executor().fetch(statement).await?;
        match rows.first() {
            Some(row) => Ok(row.decode::<i64>(COUNT_COLUMN)?),
            None => Ok(0),
        }
    }

    /// Update a live row by primary key. Null fields, readonly columns and the soft-delete
    /// flag are left untouched; nothing is executed when no column remains.
    pub async fn update<T: TableMetadata>(&self, entity: &T) -> Result<u64, StoreError> {
        let meta = self.metadata::<T>()?;
        match SqlGenerator::update_by_key(&meta, &entity.column_values()?)? {
            Some(statement) => self.executor().execute(&statement).await,
            None => Ok(0),
        }
    }

    /// Apply `set` to every live row matched by `query`; a condition is required
    pub async fn update_where<T: TableMetadata>(
        &self,
        set: UpdateSet,
        query: QueryBuilder,
    ) -> Result<u64, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::update_where(&meta, &set, &query)?;
        self.executor().execute(&statement).await
    }

    /// Delete every row matched by `query`; soft-delete entities are flagged instead of
    /// removed. A condition is required.
    pub async fn delete<T: TableMetadata>(&self, query: QueryBuilder) -> Result<u64, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::delete_where(&meta, &query)?;
        self.executor().execute(&statement).await
    }

    pub async fn delete_by_key<T: TableMetadata>(&self, key: impl Into<SqlValue>) -> Result<u64, StoreError> {
        let meta = self.metadata::<T>()?;
        let statement = SqlGenerator::delete_by_key(&meta, key.into())?;
        self.executor().execute(&statement).await
    }

    pub async fn delete_entity<T: TableMetadata>(&self, entity: &T) -> Result<u64, StoreError> {
        let meta = self.metadata::<T>()?;
        let key = primary_key_value(&meta, &entity.column_values()?)?;
        let statement = SqlGenerator::delete_by_key(&meta, key)?;
        self.executor().execute(&statement).await
    }
}
