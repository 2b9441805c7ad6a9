// src/utils/certificate_number.rs

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

static CERTIFICATE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CERT-[0-9A-Z]+-[0-9A-Z]{4}$").expect("valid regex"));

/// Generates a display number of the form `CERT-<base36 millis>-<4 random base36>`.
///
/// Not guaranteed unique: two numbers generated in the same millisecond can
/// collide. Uniqueness per (user, module) is enforced on the certificate row.
pub fn generate() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    generate_at(millis, &mut rand::rng())
}

pub fn generate_at<R: Rng + ?Sized>(millis: u64, rng: &mut R) -> String {
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("CERT-{}-{}", to_base36(millis), suffix)
}

pub fn is_well_formed(number: &str) -> bool {
    CERTIFICATE_NUMBER.is_match(number)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
