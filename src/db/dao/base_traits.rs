//! Hooks implemented by `#[base_entity]` so `DaoBase` can stamp ids and
//! timestamps without knowing the concrete table. Junction tables opt out of
//! the id and `updated_at` hooks and are written directly by their DAO.

use sea_orm::entity::prelude::DateTimeWithTimeZone;

pub trait HasCreatedAtColumn: sea_orm::EntityTrait {
    /// Default ordering for `find_all`.
    fn created_at_column() -> Self::Column;
}

pub trait HasIdActiveModel {
    fn set_id(&mut self, id: uuid::Uuid);
}

pub trait TimestampedActiveModel {
    fn set_created_at(&mut self, ts: DateTimeWithTimeZone);
}

pub trait UpdatableActiveModel {
    fn set_updated_at(&mut self, ts: DateTimeWithTimeZone);
}
