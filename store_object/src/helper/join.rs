use super::DbHelper;
use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, SqlGenerator};
use crate::traits::{DatabaseSession, JoinedEntity};

impl<S: DatabaseSession> DbHelper<S> {
    /// Run a joined select and fold the rows into one `J` per root entity
    pub async fn get_all_joined<J: JoinedEntity>(&self, query: QueryBuilder) -> Result<Vec<J>, StoreError> {
        let plan = J::join_spec().resolve(&self.registry)?;
        let statement = SqlGenerator::select_joined(&plan, &query)?;
        let rows = self.executor().fetch(&statement).await?;

        let groups = plan.fold(&rows)?;
        crate::debug_log!("Folded {} joined rows into {} results", rows.len(), groups.len());
        groups.iter().map(J::assemble).collect()
    }

    /// First composite of a joined select
    pub async fn get_one_joined<J: JoinedEntity>(&self, query: QueryBuilder) -> Result<Option<J>, StoreError> {
        Ok(self.get_all_joined(query).await?.into_iter().next())
    }
}
