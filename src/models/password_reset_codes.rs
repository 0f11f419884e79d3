// ============================================================================
// MODÈLE : PASSWORD RESET CODES
// ============================================================================
//
// Description:
//   Codes à usage unique envoyés par email pour la réinitialisation du mot
//   de passe. Table password_reset_codes.
//
// Workflow:
//   1. User demande un code via POST /api/password-reset/request
//   2. Backend marque les anciens codes non utilisés comme utilisés
//   3. Backend génère un code à 6 chiffres et l'insère dans cette table
//   4. Backend envoie le code par email
//   5. Frontend vérifie le code via POST /api/password-reset/verify
//   6. Frontend confirme via POST /api/password-reset/confirm
//   7. Backend change le mot de passe et met is_used = true
//
// Points d'attention:
//   - Un code expire 5 minutes après sa création
//   - Au plus un code actif par utilisateur (les précédents sont invalidés)
//   - La vérification ne consomme pas le code, la confirmation oui
//   - Les codes ne sont jamais supprimés, sauf cascade si le user l'est
//
// ============================================================================

use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Durée de validité d'un code, en minutes
pub const CODE_TTL_MINUTES: i64 = 5;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_reset_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub code: String,

    pub email: String,

    pub created_at: DateTime,

    pub is_used: bool,
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
    /// Génère un code aléatoire à 6 chiffres
    pub fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        (0..6).map(|_| rng.gen_range(0..10).to_string()).collect()
    }

    /// Un code est valide s'il n'a pas servi et a moins de 5 minutes
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now().naive_utc())
    }

    pub fn is_valid_at(&self, now: NaiveDateTime) -> bool {
        !self.is_used && now <= self.created_at + Duration::minutes(CODE_TTL_MINUTES)
    }
}

/// Condition SQL : email égal, insensible à la casse
pub fn email_eq_insensitive(email: &str) -> sea_orm::sea_query::SimpleExpr {
    use sea_orm::sea_query::{Expr, Func};

    Expr::expr(Func::lower(Expr::col(Column::Email))).eq(email.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn code_created_at(created_at: NaiveDateTime) -> Model {
        Model {
            id: 1,
            user_id: 1,
            code: "123456".to_string(),
            email: "jean@example.com".to_string(),
            created_at,
            is_used: false,
        }
    }

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..50 {
            let code = Model::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_code_valid_just_before_expiry() {
        let created = base_time();
        let code = code_created_at(created);
        // 4 minutes 59 secondes après la création
        assert!(code.is_valid_at(created + Duration::seconds(299)));
    }

    #[test]
    fn test_code_valid_exactly_at_expiry() {
        let created = base_time();
        let code = code_created_at(created);
        assert!(code.is_valid_at(created + Duration::minutes(5)));
    }

    #[test]
    fn test_code_invalid_after_expiry() {
        let created = base_time();
        let code = code_created_at(created);
        // 5 minutes 1 seconde après la création
        assert!(!code.is_valid_at(created + Duration::seconds(301)));
    }

    #[test]
    fn test_used_code_is_invalid_even_if_recent() {
        let created = base_time();
        let mut code = code_created_at(created);
        code.is_used = true;
        assert!(!code.is_valid_at(created + Duration::seconds(10)));
    }
}
