//! Unique values for payloads that must not collide across runs.

use rand::Rng;

pub const PRODUCT_NAME_MAX: usize = 30;

fn random_digits(count: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..4].to_string()
}

/// `<base>_<unix millis>_<4 hex>@test.com`
pub fn unique_email(base: &str) -> String {
    format!(
        "{}_{}_{}@test.com",
        base,
        chrono::Utc::now().timestamp_millis(),
        short_id()
    )
}

/// Bangladesh mobile number, `+88017` and eight digits.
pub fn unique_phone() -> String {
    format!("+88017{}", random_digits(8))
}

/// Pakistan number, `+92` and nine digits.
pub fn unique_pk_phone() -> String {
    format!("+92{}", random_digits(9))
}

/// Pakistan mobile number, `+923XX` with XX in 00..=39 and seven digits.
pub fn unique_pk_mobile() -> String {
    let operator = rand::thread_rng().gen_range(0..40u8);
    format!("+923{:02}{}", operator, random_digits(7))
}

/// Product name with a timestamp suffix, never longer than the API's limit.
pub fn unique_product_name(base: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let name = format!("{} {}-{}", base, timestamp, short_id());
    let name = if name.chars().count() > PRODUCT_NAME_MAX {
        let prefix: String = base.chars().take(15).collect();
        format!("{} {}", prefix, timestamp)
    } else {
        name
    };
    name.chars().take(PRODUCT_NAME_MAX).collect()
}

/// `n` copies of `c`.
pub fn repeat_char(c: char, n: usize) -> String {
    std::iter::repeat(c).take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_unique_email_shape() {
        let re = Regex::new(r"^artisan_\d{13}_[0-9a-f]{4}@test\.com$").unwrap();
        let first = unique_email("artisan");
        let second = unique_email("artisan");
        assert!(re.is_match(&first), "{}", first);
        assert_ne!(first, second);
    }

    #[test]
    fn test_phone_shapes() {
        let bd = Regex::new(r"^\+88017\d{8}$").unwrap();
        let pk = Regex::new(r"^\+92\d{9}$").unwrap();
        let pk_mobile = Regex::new(r"^\+923[0-3]\d\d{7}$").unwrap();
        for _ in 0..20 {
            assert!(bd.is_match(&unique_phone()));
            assert!(pk.is_match(&unique_pk_phone()));
            assert!(pk_mobile.is_match(&unique_pk_mobile()));
        }
    }

    #[test]
    fn test_product_name_limit() {
        let short = unique_product_name("Vase");
        assert!(short.starts_with("Vase "));
        assert!(short.chars().count() <= PRODUCT_NAME_MAX);

        let long = unique_product_name("Test Product");
        assert!(long.chars().count() <= PRODUCT_NAME_MAX);
        assert!(long.starts_with("Test Product"));

        let very_long = unique_product_name("Handwoven Ceremonial Basket");
        assert!(very_long.starts_with("Handwoven Cerem "));
        assert!(very_long.chars().count() <= PRODUCT_NAME_MAX);
    }

    #[test]
    fn test_repeat_char() {
        assert_eq!(repeat_char('A', 3), "AAA");
        assert_eq!(repeat_char('x', 0), "");
    }
}
