use xxhash_rust::xxh3::xxh3_64;

/// Scope id for a file: the first eight hex digits of the xxh3 hash of its
/// filename. Depends on nothing but the filename.
pub fn scope_id(filename: &str) -> String {
    let hex = format!("{:016x}", xxh3_64(filename.as_bytes()));
    hex[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_id_is_stable_per_filename() {
        let a = scope_id("src/A.vue");
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, scope_id("src/A.vue"));
        assert_ne!(a, scope_id("src/B.vue"));
    }
}
