use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Rôles autorisés avec leur libellé d'affichage
pub const ROLE_CHOICES: [(&str, &str); 6] = [
    ("super_admin", "Super Administrateur"),
    ("responsable", "Responsable Pédagogique"),
    ("assistante", "Assistante"),
    ("entreprise", "Entreprise Partenaire"),
    ("formateur", "Formateur"),
    ("etudiant", "Étudiant"),
];

pub fn is_valid_role(role: &str) -> bool {
    ROLE_CHOICES.iter().any(|(value, _)| *value == role)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String, // Format: pbkdf2_sha256$iterations$salt$hash
    // Mot de passe en clair, stocké uniquement pour affichage dans l'interface admin
    #[serde(skip_serializing)]
    pub password_plain: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: String,
    pub is_active: bool,
    pub is_superuser: bool, // Indicateur d'élévation hérité, replié sur role au login
    pub email_verified: bool, // Réservé : aucun flux ne le passe à true pour l'instant
    pub date_joined: DateTime,
    pub last_login: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::password_reset_codes::Entity")]
    PasswordResetCodes,

    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
}

impl Related<super::password_reset_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PasswordResetCodes.def()
    }
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Équivalent de auto_now : updated_at suit chaque écriture
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        self.updated_at = Set(Utc::now().naive_utc());
        Ok(self)
    }
}

impl Model {
    /// Vérification de capacité pure : seul le super admin gère les comptes.
    /// L'indicateur is_superuser hérité donne le même droit tant que le rôle
    /// n'a pas encore été replié (voir la migration faite au login).
    pub fn is_super_admin(&self) -> bool {
        self.role == "super_admin" || self.is_superuser
    }

    pub fn role_display(&self) -> &str {
        ROLE_CHOICES
            .iter()
            .find(|(value, _)| *value == self.role)
            .map(|(_, label)| *label)
            .unwrap_or(self.role.as_str())
    }

    /// Nom affiché : prénom + nom, sinon le username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Initiales pour l'avatar : première lettre du prénom et du nom,
    /// sinon les deux premiers caractères du username
    pub fn initials(&self) -> String {
        let first = self.first_name.trim().chars().next();
        let last = self.last_name.trim().chars().next();

        match (first, last) {
            (Some(f), Some(l)) => format!("{}{}", f, l).to_uppercase(),
            _ => self.username.chars().take(2).collect::<String>().to_uppercase(),
        }
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

    fn user(first_name: &str, last_name: &str, username: &str) -> Model {
        let now = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        Model {
            id: 1,
            username: username.to_string(),
            password: String::new(),
            password_plain: None,
            email: "test@example.com".to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: String::new(),
            role: "etudiant".to_string(),
            is_active: true,
            is_superuser: false,
            email_verified: false,
            date_joined: now,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let u = user("Jean", "Dupont", "jeandupont");
        assert_eq!(u.display_name(), "Jean Dupont");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let u = user("", "  ", "jdupont");
        assert_eq!(u.display_name(), "jdupont");
    }

    #[test]
    fn test_initials_from_names() {
        let u = user("jean", "dupont", "x");
        assert_eq!(u.initials(), "JD");
    }

    #[test]
    fn test_initials_fall_back_to_username_prefix() {
        let u = user("Jean", "", "marie");
        assert_eq!(u.initials(), "MA");
    }

    #[test]
    fn test_is_super_admin_by_role() {
        let mut u = user("A", "B", "ab");
        u.role = "super_admin".to_string();
        assert!(u.is_super_admin());
    }

    #[test]
    fn test_is_super_admin_by_legacy_flag() {
        let mut u = user("A", "B", "ab");
        u.is_superuser = true;
        assert_eq!(u.role, "etudiant");
        assert!(u.is_super_admin());
    }

    #[test]
    fn test_regular_role_is_not_admin() {
        let u = user("A", "B", "ab");
        assert!(!u.is_super_admin());
    }

    #[test]
    fn test_role_display() {
        let mut u = user("A", "B", "ab");
        assert_eq!(u.role_display(), "Étudiant");
        u.role = "responsable".to_string();
        assert_eq!(u.role_display(), "Responsable Pédagogique");
        u.role = "inconnu".to_string();
        assert_eq!(u.role_display(), "inconnu");
    }

    #[test]
    fn test_role_validation() {
        assert!(is_valid_role("formateur"));
        assert!(is_valid_role("super_admin"));
        assert!(!is_valid_role("admin"));
        assert!(!is_valid_role(""));
    }
}
