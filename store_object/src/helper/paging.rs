use super::DbHelper;
use crate::errors::StoreError;
use crate::query_builder::{PageData, PageWindow, QueryBuilder, SqlGenerator};
use crate::traits::{DatabaseSession, TableMetadata};

impl<S: DatabaseSession> DbHelper<S> {
    /// One page of `T` plus the total number of matching rows.
    ///
    /// The page size is clamped to the configured maximum.
    pub async fn get_page<T: TableMetadata>(
        &self,
        page: i64,
        page_size: i64,
        query: QueryBuilder,
    ) -> Result<PageData<T>, StoreError> {
        let meta = self.metadata::<T>()?;
        let window = PageWindow::new(page, page_size, self.max_page_size());
        let select = SqlGenerator::select_page(&meta, &query, &window)?;
        let count = SqlGenerator::count(&meta, &query)?;

        let total = self.run_count(&count).await?;
        let data = if total > 0 && window.limit > 0 {
            let rows = self.executor().fetch(&select).await?;
            rows.iter()
                .map(|row| T::from_row(&row.view()))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok(PageData {
            total,
            page_size: window.page_size,
            data,
            total_counted: true,
        })
    }

    /// Like [`DbHelper::get_page`] without the count query; `total` is the number of rows
    /// returned
    pub async fn get_page_without_count<T: TableMetadata>(
        &self,
        page: i64,
        page_size: i64,
        query: QueryBuilder,
    ) -> Result<PageData<T>, StoreError> {
        let meta = self.metadata::<T>()?;
        let window = PageWindow::new(page, page_size, self.max_page_size());
        let select = SqlGenerator::select_page(&meta, &query, &window)?;

        let rows = self.executor().fetch(&select).await?;
        let data = rows
            .iter()
            .map(|row| T::from_row(&row.view()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageData {
            total: data.len() as i64,
            page_size: window.page_size,
            data,
            total_counted: false,
        })
    }
}
