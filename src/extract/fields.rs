//! Field formatting rules of the layout: digit padding, length clipping and
//! cleanup of text that went through one charset conversion too many.

/// Repairs applied after the re-decode pass, in order. The composed
/// sequences first so the single-character ones do not break them up.
const MOJIBAKE_REPAIRS: &[(&str, &str)] = &[
    ("SÃ£O", "SÃO"),
    ("SÃƒO", "SÃO"),
    ("SÃ\u{83}O", "SÃO"),
    ("Ã ", "À"),
    ("Ã¡", "á"),
    ("Ã¢", "â"),
    ("Ã£", "ã"),
    ("Ã¤", "ä"),
    ("Ã§", "ç"),
    ("Ã©", "é"),
    ("Ãª", "ê"),
    ("Ã\u{ad}", "í"),
    ("Ã³", "ó"),
    ("Ã´", "ô"),
    ("Ãµ", "õ"),
    ("Ãº", "ú"),
    ("Ã¼", "ü"),
];

pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// CEP: digits only, left-padded with zeros to 8.
pub fn format_cep(value: &str) -> String {
    padded_digits(value, 8)
}

/// CNPJ: digits only, left-padded with zeros to 14.
pub fn format_cnpj(value: &str) -> String {
    padded_digits(value, 14)
}

/// CPF: digits only, left-padded with zeros to 11.
pub fn format_cpf(value: &str) -> String {
    padded_digits(value, 11)
}

/// Phone: digits only, clipped to 11 (DDD + number).
pub fn format_phone(value: &str) -> String {
    only_digits(value).chars().take(11).collect()
}

/// Undo double-encoded latin-1/UTF-8 text and collapse whitespace runs.
pub fn clean_text(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let mut text = repair_double_encoding(value);
    for (broken, fixed) in MOJIBAKE_REPAIRS {
        if text.contains(broken) {
            text = text.replace(broken, fixed);
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned text truncated to `max_chars` characters, the layout's field cap.
pub fn clip(value: &str, max_chars: usize) -> String {
    clean_text(value).chars().take(max_chars).collect()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn padded_digits(value: &str, width: usize) -> String {
    if value.is_empty() {
        return String::new();
    }
    let digits = only_digits(value);
    let padded = format!("{:0>width$}", digits, width = width);
    padded.chars().take(width).collect()
}

fn repair_double_encoding(text: &str) -> String {
    let looks_broken = text
        .chars()
        .any(|c| c == '\u{FFFD}' || (c as u32) > 1000);
    if !looks_broken {
        return text.to_string();
    }

    // The mirror sometimes stores UTF-8 bytes that were read back as
    // latin-1. Re-encode each char as its latin-1 byte and decode again,
    // dropping whatever does not survive either direction.
    let bytes: Vec<u8> = text
        .chars()
        .filter(|&c| (c as u32) <= 0xFF)
        .map(|c| c as u8)
        .collect();

    String::from_utf8_lossy(&bytes)
        .chars()
        .filter(|&c| c != '\u{FFFD}')
        .collect()
}
