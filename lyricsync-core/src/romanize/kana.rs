//! Hepburn romanization of hiragana and katakana.
//!
//! Kanji have no reading without a dictionary and pass through unchanged, as
//! does any other non-kana character.

const SOKUON: char = 'っ';
const LONG_VOWEL_MARK: char = 'ー';

/// Katakana to the matching hiragana; other characters unchanged.
fn to_hiragana(c: char) -> char {
    match c {
        // ァ..ヶ map 1:1 onto ぁ..ゖ
        '\u{30A1}'..='\u{30F6}' => char::from_u32(u32::from(c) - 0x60).unwrap_or(c),
        _ => c,
    }
}

fn base_romaji(c: char) -> Option<&'static str> {
    let romaji = match c {
        'あ' | 'ぁ' => "a",
        'い' | 'ぃ' => "i",
        'う' | 'ぅ' => "u",
        'え' | 'ぇ' => "e",
        'お' | 'ぉ' | 'を' => "o",
        'か' | 'ゕ' => "ka",
        'き' => "ki",
        'く' => "ku",
        'け' | 'ゖ' => "ke",
        'こ' => "ko",
        'が' => "ga",
        'ぎ' => "gi",
        'ぐ' => "gu",
        'げ' => "ge",
        'ご' => "go",
        'さ' => "sa",
        'し' => "shi",
        'す' => "su",
        'せ' => "se",
        'そ' => "so",
        'ざ' => "za",
        'じ' | 'ぢ' => "ji",
        'ず' | 'づ' => "zu",
        'ぜ' => "ze",
        'ぞ' => "zo",
        'た' => "ta",
        'ち' => "chi",
        'つ' => "tsu",
        'て' => "te",
        'と' => "to",
        'だ' => "da",
        'で' => "de",
        'ど' => "do",
        'な' => "na",
        'に' => "ni",
        'ぬ' => "nu",
        'ね' => "ne",
        'の' => "no",
        'は' => "ha",
        'ひ' => "hi",
        'ふ' => "fu",
        'へ' => "he",
        'ほ' => "ho",
        'ば' => "ba",
        'び' => "bi",
        'ぶ' => "bu",
        'べ' => "be",
        'ぼ' => "bo",
        'ぱ' => "pa",
        'ぴ' => "pi",
        'ぷ' => "pu",
        'ぺ' => "pe",
        'ぽ' => "po",
        'ま' => "ma",
        'み' => "mi",
        'む' => "mu",
        'め' => "me",
        'も' => "mo",
        'や' | 'ゃ' => "ya",
        'ゆ' | 'ゅ' => "yu",
        'よ' | 'ょ' => "yo",
        'ら' => "ra",
        'り' => "ri",
        'る' => "ru",
        'れ' => "re",
        'ろ' => "ro",
        'わ' | 'ゎ' => "wa",
        'ゐ' => "i",
        'ゑ' => "e",
        'ん' => "n",
        'ゔ' => "vu",
        'ヷ' => "va",
        'ヸ' => "vi",
        'ヹ' => "ve",
        'ヺ' => "vo",
        _ => return None,
    };
    Some(romaji)
}

/// Merge a syllable with a following small kana (きゃ → kya, ファ → fa).
fn combine(syllable: &str, next: char) -> Option<String> {
    match next {
        'ゃ' | 'ゅ' | 'ょ' => {
            let stem = syllable.strip_suffix('i').filter(|stem| !stem.is_empty())?;
            let glide = base_romaji(next)?;
            if stem.ends_with("sh") || stem.ends_with("ch") || stem.ends_with('j') {
                Some(format!("{stem}{}", &glide[1..]))
            } else {
                Some(format!("{stem}{glide}"))
            }
        }
        'ぁ' | 'ぃ' | 'ぅ' | 'ぇ' | 'ぉ' => {
            let vowel = base_romaji(next)?;
            let stem = syllable.strip_suffix(is_vowel)?;
            let stem = match (stem, syllable) {
                (stem, _) if !stem.is_empty() => stem,
                (_, "u") => "w",
                (_, "i") => "y",
                _ => return None,
            };
            Some(format!("{stem}{vowel}"))
        }
        _ => None,
    }
}

fn punctuation(c: char) -> Option<char> {
    match c {
        '\u{3000}' => Some(' '),
        '、' => Some(','),
        '。' => Some('.'),
        '「' | '」' | '『' | '』' => Some('"'),
        '！' => Some('!'),
        '？' => Some('?'),
        _ => None,
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'i' | 'u' | 'e' | 'o')
}

/// Romanize the kana in `text`.
pub fn romanize_kana(text: &str) -> String {
    let chars: Vec<char> = text.chars().map(to_hiragana).collect();
    let mut out = String::with_capacity(text.len());
    let mut geminate = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;

        if c == SOKUON {
            geminate = true;
            continue;
        }

        if c == LONG_VOWEL_MARK {
            if let Some(vowel) = out.chars().last().filter(|&v| is_vowel(v)) {
                out.push(vowel);
            }
            geminate = false;
            continue;
        }

        let Some(base) = base_romaji(c) else {
            geminate = false;
            out.push(punctuation(c).unwrap_or(c));
            continue;
        };

        let mut syllable = base.to_string();
        if let Some(combined) = chars.get(i).and_then(|&next| combine(&syllable, next)) {
            syllable = combined;
            i += 1;
        }

        if c == 'ん' {
            let before_vowel = chars
                .get(i)
                .and_then(|&next| base_romaji(next))
                .and_then(|next| next.chars().next())
                .is_some_and(|first| is_vowel(first) || first == 'y');
            if before_vowel {
                syllable.push('\'');
            }
        }

        if std::mem::take(&mut geminate) {
            if syllable.starts_with("ch") {
                out.push('t');
            } else if let Some(first) = syllable.chars().next().filter(|&f| !is_vowel(f)) {
                out.push(first);
            }
        }

        out.push_str(&syllable);
    }

    out
}
