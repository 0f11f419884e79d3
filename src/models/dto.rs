// Projections renvoyées aux clients API (jamais le hash du mot de passe)
use chrono::NaiveDateTime;
use serde::Serialize;

use super::users;

/// Profil public renvoyé au login et par /me
#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone: String,
}

impl UserPublic {
    pub fn from_model(user: &users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// Ligne du tableau de gestion des comptes
#[derive(Debug, Serialize)]
pub struct UserListItem {
    pub id: i32,
    pub numero: String,
    pub code: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub initials: String,
    pub role: String,
    pub role_display: String,
    pub phone: String,
    pub is_active: bool,
}

impl UserListItem {
    /// `position` est l'index 0-based dans la liste triée par id
    pub fn from_model(user: &users::Model, position: usize) -> Self {
        Self {
            id: user.id,
            numero: format!("{:02}", position + 1),
            code: user_code(user.id),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            display_name: user.display_name(),
            initials: user.initials(),
            role: user.role.clone(),
            role_display: user.role_display().to_string(),
            phone: user.phone.clone(),
            is_active: user.is_active,
        }
    }
}

/// Fiche complète réservée au super admin
#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub id: i32,
    pub code: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub initials: String,
    pub role: String,
    pub role_display: String,
    pub phone: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub date_joined: String,
    pub last_login: String,
    // Miroir en clair du mot de passe, exigence produit pour l'interface admin
    pub password: String,
}

impl UserDetail {
    pub fn from_model(user: &users::Model) -> Self {
        Self {
            id: user.id,
            code: user_code(user.id),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            display_name: user.display_name(),
            initials: user.initials(),
            role: user.role.clone(),
            role_display: user.role_display().to_string(),
            phone: user.phone.clone(),
            is_active: user.is_active,
            email_verified: user.email_verified,
            date_joined: format_datetime_fr(&user.date_joined),
            last_login: user
                .last_login
                .as_ref()
                .map(format_datetime_fr)
                .unwrap_or_else(|| "Jamais".to_string()),
            password: user
                .password_plain
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Code d'affichage du compte : #USR-007
pub fn user_code(id: i32) -> String {
    format!("#USR-{:03}", id)
}

/// Format français DD/MM/YYYY à HH:MM
pub fn format_datetime_fr(dt: &NaiveDateTime) -> String {
    dt.format("%d/%m/%Y à %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_user() -> users::Model {
        let joined = NaiveDate::from_ymd_opt(2025, 2, 3)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        users::Model {
            id: 7,
            username: "jeandupont".to_string(),
            password: "pbkdf2_sha256$600000$x$y".to_string(),
            password_plain: None,
            email: "jean@x.com".to_string(),
            first_name: "Jean".to_string(),
            last_name: "Dupont".to_string(),
            phone: "0601020304".to_string(),
            role: "etudiant".to_string(),
            is_active: true,
            is_superuser: false,
            email_verified: false,
            date_joined: joined,
            last_login: None,
            created_at: joined,
            updated_at: joined,
        }
    }

    #[test]
    fn test_user_code_is_zero_padded() {
        assert_eq!(user_code(7), "#USR-007");
        assert_eq!(user_code(42), "#USR-042");
        assert_eq!(user_code(1234), "#USR-1234");
    }

    #[test]
    fn test_list_item_numero_is_one_based_and_padded() {
        let user = sample_user();
        assert_eq!(UserListItem::from_model(&user, 0).numero, "01");
        assert_eq!(UserListItem::from_model(&user, 11).numero, "12");
    }

    #[test]
    fn test_detail_formats_dates_in_french() {
        let user = sample_user();
        let detail = UserDetail::from_model(&user);
        assert_eq!(detail.date_joined, "03/02/2025 à 09:05");
        assert_eq!(detail.last_login, "Jamais");
    }

    #[test]
    fn test_detail_password_placeholder_when_unset() {
        let mut user = sample_user();
        let detail = UserDetail::from_model(&user);
        assert_eq!(detail.password, "-");

        user.password_plain = Some("secret123".to_string());
        let detail = UserDetail::from_model(&user);
        assert_eq!(detail.password, "secret123");
    }
}
