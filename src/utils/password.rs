use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "pbkdf2_sha256";
const ITERATIONS: u32 = 600_000;
const SALT_LENGTH: usize = 22;
const KEY_LENGTH: usize = 32;

/// Hash un mot de passe au format Django (compatible avec la base existante)
/// Utilise PBKDF2-HMAC-SHA256 avec 600000 itérations et un salt alphanumérique
pub fn hash_password(password: &str) -> Result<String, String> {
    // Salt alphanumérique de 22 caractères, comme get_random_string
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt.as_bytes(), ITERATIONS, &mut key)
        .map_err(|e| format!("PBKDF2 hash generation failed: {}", e))?;

    // Format: pbkdf2_sha256$iterations$salt$hash_base64
    Ok(format!(
        "{}${}${}${}",
        ALGORITHM,
        ITERATIONS,
        salt,
        STANDARD.encode(key)
    ))
}

/// Vérifie un mot de passe contre un hash au format Django
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    // Parser le format: pbkdf2_sha256$iterations$salt$hash
    let parts: Vec<&str> = stored_hash.split('$').collect();
    if parts.len() != 4 {
        return Err("Invalid hash format".to_string());
    }

    if parts[0] != ALGORITHM {
        return Err(format!("Unsupported algorithm: {}", parts[0]));
    }

    let iterations = parts[1]
        .parse::<u32>()
        .map_err(|_| "Invalid iterations".to_string())?;
    let salt = parts[2];
    let expected_hash = STANDARD
        .decode(parts[3])
        .map_err(|e| format!("Base64 decode failed: {}", e))?;

    // Recalculer le hash avec le même salt et les mêmes itérations
    let mut computed = vec![0u8; expected_hash.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut computed)
        .map_err(|e| format!("PBKDF2 hash verification failed: {}", e))?;

    Ok(computed == expected_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_roundtrip() {
        let hash = hash_password("motdepasse123").unwrap();
        assert!(verify_password("motdepasse123", &hash).unwrap());
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let hash = hash_password("motdepasse123").unwrap();
        assert!(!verify_password("autremotdepasse", &hash).unwrap());
    }

    #[test]
    fn test_hash_uses_django_format() {
        let hash = hash_password("abc12345").unwrap();
        let parts: Vec<&str> = hash.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2_sha256");
        assert_eq!(parts[1], "600000");
        assert_eq!(parts[2].len(), SALT_LENGTH);
    }

    #[test]
    fn test_two_hashes_of_same_password_differ() {
        let first = hash_password("abc12345").unwrap();
        let second = hash_password("abc12345").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("x", "pas-un-hash").is_err());
        assert!(verify_password("x", "md5$1$salt$hash").is_err());
    }
}
