//! Password hashing for the user/password login.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

/// Fixed salt expected by the user-login endpoint.
const PASSWORD_SALT: &[u8] = b"MUBASHER";

/// PBKDF2 iteration count.
const PASSWORD_ITERATIONS: u32 = 10_000;

/// Derived key length in bytes (512 bits).
const PASSWORD_HASH_LEN: usize = 64;

/// Value of `encryptionType` sent alongside a hashed password.
pub const PASSWORD_ENCRYPTION_TYPE: u8 = 2;

/// Hash a password with PBKDF2-HMAC-SHA512 and return lowercase hex.
///
/// Deterministic: the same password always yields the same digest.
///
/// # Example
///
/// ```
/// use gtn_rs::auth::hash_password;
///
/// let digest = hash_password("secret");
/// assert_eq!(digest.len(), 128);
/// assert_eq!(digest, hash_password("secret"));
/// ```
pub fn hash_password(password: &str) -> String {
    let mut derived = [0u8; PASSWORD_HASH_LEN];
    pbkdf2_hmac::<Sha512>(
        password.as_bytes(),
        PASSWORD_SALT,
        PASSWORD_ITERATIONS,
        &mut derived,
    );
    hex::encode(derived)
}
