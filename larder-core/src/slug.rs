//! Slug derivation for recipes and tags.

use rand::distr::{Alphanumeric, SampleString};

/// Longest base slug kept before a suffix is appended.
const MAX_BASE_LEN: usize = 60;

/// Length of the random suffix on recipe slug candidates.
const SUFFIX_LEN: usize = 6;

/// Fallback base when a recipe name has no sluggable characters.
const FALLBACK_BASE: &str = "recipe";

/// Convert a name into a lowercase, hyphen-separated ASCII slug.
///
/// Case and common Latin diacritics are folded, so "Crème Brûlée" and
/// "creme brulee" produce the same slug. Returns an empty string when nothing
/// sluggable remains.
/// e.g., "  Chicken Tikka   Masala! " -> "chicken-tikka-masala"
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let folded = fold_diacritic(c);
        let mut pushed = false;
        for ch in folded.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(ch);
                pushed = true;
            }
        }
        if !pushed {
            pending_dash = true;
        }
    }

    truncate_on_boundary(slug, MAX_BASE_LEN)
}

/// A base slug for `name` with a short random suffix, so that concurrent imports
/// of similarly named recipes rarely contend for the same slug.
pub fn recipe_slug_candidate(name: &str) -> String {
    let base = slugify(name);
    let base = if base.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        base
    };
    format!("{}-{}", base, random_suffix())
}

pub fn random_suffix() -> String {
    Alphanumeric
        .sample_string(&mut rand::rng(), SUFFIX_LEN)
        .to_ascii_lowercase()
}

fn truncate_on_boundary(slug: String, max: usize) -> String {
    if slug.len() <= max {
        return slug;
    }
    // Slug is ASCII, so byte indexing is char indexing.
    slug[..max].trim_end_matches('-').to_string()
}

fn fold_diacritic(c: char) -> String {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' | 'ľ' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'þ' => "th",
        '&' => "and",
        other => return other.to_string(),
    };
    folded.to_string()
}
