// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - users : Comptes utilisateurs (rôles, statut, miroir du mot de passe)
//   - password_reset_codes : Codes de réinitialisation à 6 chiffres (expire 5 min)
//   - sessions : Sessions serveur portées par cookie (expire 24h)
//   - dto : Projections renvoyées par l'API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les relations entre tables sont définies dans chaque modèle
//
// ============================================================================

pub mod dto;
pub mod health;
pub mod password_reset_codes;
pub mod sessions;
pub mod users;
