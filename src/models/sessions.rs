// ============================================================================
// MODÈLE : SESSIONS
// ============================================================================
//
// Description:
//   Sessions côté serveur portées par le cookie session_token. Table sessions.
//
// Workflow:
//   1. Login réussi → insertion d'une ligne (token + csrf_token UUID v4)
//   2. Chaque requête authentifiée → lookup par token via l'extracteur AuthUser
//   3. Logout → suppression de la ligne
//   4. Changement de mot de passe → rotation (suppression puis réinsertion)
//
// Points d'attention:
//   - Une session expire 24 heures après sa création
//   - Le csrf_token doit être renvoyé en header X-CSRF-Token sur les
//     méthodes modifiantes (double-submit)
//   - ON DELETE CASCADE: si le user est supprimé, ses sessions aussi
//
// ============================================================================

use chrono::{NaiveDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Durée de vie d'une session, en heures
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub token: String,

    pub csrf_token: String,

    pub created_at: DateTime,

    pub expires_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().naive_utc())
    }

    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_session_expiry_window() {
        let created = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let session = Model {
            id: 1,
            user_id: 1,
            token: "t".to_string(),
            csrf_token: "c".to_string(),
            created_at: created,
            expires_at: created + Duration::hours(SESSION_TTL_HOURS),
        };

        assert!(!session.is_expired_at(created + Duration::hours(23)));
        assert!(!session.is_expired_at(created + Duration::hours(24)));
        assert!(session.is_expired_at(created + Duration::hours(24) + Duration::seconds(1)));
    }
}
