use crate::error::GroupError;
use crate::types::{GroupId, MemberInfo};
use chrono::{DateTime, Utc};

pub trait GroupRepository {
    /// Current project-context text for the group, if any has been set.
    fn context(&self, id: &GroupId) -> Result<Option<String>, GroupError>;
    /// Full replacement of the group context. Latest write wins.
    fn set_context(
        &self,
        id: &GroupId,
        context: &str,
        at: DateTime<Utc>,
    ) -> Result<(), GroupError>;
    fn members(&self, id: &GroupId) -> Result<Vec<MemberInfo>, GroupError>;
    fn put_member(&self, id: &GroupId, member: MemberInfo) -> Result<(), GroupError>;
}
