use phf::phf_map;
use unicode_normalization::UnicodeNormalization;

static ND_CHARMAP: phf::Map<char, &'static str> = phf_map! {
    'Æ' => "AE",
    'æ' => "ae",
    'Ð' => "D",
    'ð' => "d",
    'Ø' => "O",
    'ø' => "o",
    'Þ' => "Th",
    'þ' => "th",
    'ß' => "s",
    'Đ' => "D",
    'đ' => "d",
    'Ħ' => "H",
    'ħ' => "h",
    'ı' => "i",
    'ĸ' => "k",
    'Ł' => "L",
    'ł' => "l",
    'Ŋ' => "N",
    'ŋ' => "n",
    'Œ' => "Oe",
    'œ' => "oe",
    'Ŧ' => "T",
    'ŧ' => "t",
};

fn remove_diacritics(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.nfkd() {
        if let Some(mapped) = ND_CHARMAP.get(&c) {
            result.extend(mapped.chars());
        } else if c.is_ascii() {
            result.push(c);
        } else if c.is_alphabetic() {
            result.push(' ');
        }
    }

    result
}

/// Derives a URL slug from a group title: diacritics folded to ASCII,
/// lowercased, anything non-alphanumeric collapsed to single dashes.
pub fn slugify(title: &str) -> String {
    let folded = remove_diacritics(title).to_lowercase();
    let mut slug = String::with_capacity(folded.len());
    let mut pending_dash = false;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_diacritics() {
        assert_eq!(remove_diacritics("Æ"), "AE");
        assert_eq!(remove_diacritics("æ"), "ae");
        assert_eq!(remove_diacritics("Œ"), "Oe");
        assert_eq!(remove_diacritics("œ"), "oe");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Žluťoučký kůň"), "zlutoucky-kun");
        assert_eq!(slugify("  Rust --- Users!  "), "rust-users");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("CamelCase 42"), "camelcase-42");
        assert_eq!(slugify("***"), "");
    }
}
