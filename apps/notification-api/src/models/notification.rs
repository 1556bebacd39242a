use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::notifications;

/// One inbox entry. `is_new` flips to false the first time the owner fetches it.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotificationRow<'a> {
    pub user_id: i64,
    pub message: &'a str,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a penguin_common::NewNotification> for NewNotificationRow<'a> {
    fn from(n: &'a penguin_common::NewNotification) -> Self {
        Self {
            user_id: n.user_id,
            message: &n.message,
            is_new: n.is_new,
            created_at: n.timestamp,
        }
    }
}
