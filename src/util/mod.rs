#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Formats an amount the way `id-ID` renders IDR: `Rp 20.000,00`.
pub fn format_rupiah(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("Rp {grouped},00")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rupiah_groups_thousands() {
        assert_eq!(format_rupiah(0), "Rp 0,00");
        assert_eq!(format_rupiah(999), "Rp 999,00");
        assert_eq!(format_rupiah(20_000), "Rp 20.000,00");
        assert_eq!(format_rupiah(123_456_789), "Rp 123.456.789,00");
    }

    #[test]
    fn test_now_ms_is_after_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
