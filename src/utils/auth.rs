/// Compare a provided API key against the configured one in constant time,
/// so response timing does not leak how many leading characters matched.
pub fn verify_api_key(provided: &str, expected: &str) -> bool {
    provided.as_bytes().len() == expected.as_bytes().len()
        && provided
            .as_bytes()
            .iter()
            .zip(expected.as_bytes().iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
