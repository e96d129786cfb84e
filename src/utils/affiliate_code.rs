use rand::Rng;

pub const AFFILIATE_CODE_LEN: usize = 8;

/// Random code in Crockford base32 (no I, L, O, U), so codes survive being
/// read aloud or typed from a flyer.
pub fn generate_affiliate_code() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: [u8; 5] = rng.gen();

    // 40 bits encode to exactly 8 characters
    base32::encode(base32::Alphabet::Crockford, &random_bytes)
        .chars()
        .take(AFFILIATE_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

fn crockford_lookalike(c: char) -> char {
    match c {
        'O' => '0',
        'I' | 'L' => '1',
        _ => c,
    }
}

/// Canonical form of a referral code typed or pasted by a shopper: uppercase,
/// separators dropped, ambiguous letters folded onto their digits.
pub fn normalize_affiliate_code(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| crockford_lookalike(c.to_ascii_uppercase()))
        .collect()
}
