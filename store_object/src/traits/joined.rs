use crate::errors::StoreError;
use crate::query_builder::join::{JoinGroup, JoinSpec};

/// Composite result assembled from several entities joined in one query.
///
/// Usually derived with `#[derive(JoinedEntity)]`:
/// ```ignore
/// #[derive(Debug, JoinedEntity)]
/// pub struct StudentWithSchool {
///     #[join(alias = "t1")]
///     pub student: Student,
///     #[join(alias = "t2", on = "t1.school_id = t2.id", kind = "left")]
///     pub school: Option<School>,
/// }
/// ```
pub trait JoinedEntity: Sized + Send + Sync + 'static {
    fn join_spec() -> JoinSpec;

    /// Build one composite from the rows sharing a root primary key
    fn assemble(group: &JoinGroup<'_>) -> Result<Self, StoreError>;
}
