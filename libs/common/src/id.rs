use rand::Rng;
use ulid::Ulid;

/// Alphabet used for server-chosen room codes (lowercase base-36).
const ROOM_CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = relay_common::id::prefixed_ulid("mbr");
/// assert!(id.starts_with("mbr_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Generates a random lowercase alphanumeric room code of `len` characters.
///
/// # Examples
/// ```
/// let code = relay_common::id::room_code(6);
/// assert_eq!(code.len(), 6);
/// ```
pub fn room_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const MEMBER: &str = "mbr";
    pub const CONNECTION: &str = "conn";
}
