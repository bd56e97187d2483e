//! Revised Romanization of Hangul syllables.
//!
//! Covers syllable decomposition, final-consonant liaison into a following
//! silent `ㅇ`, and `ㄹㄹ → ll`. Other sound-change rules (nasalization,
//! aspiration) are not applied.

const SYLLABLE_BASE: u32 = 0xAC00;
const SYLLABLE_LAST: u32 = 0xD7A3;
const MEDIAL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;

const SILENT_INITIAL: usize = 11;
const RIEUL_INITIAL: usize = 5;
const RIEUL_FINAL: usize = 8;

const INITIALS: [&str; 19] = [
    "g", "kk", "n", "d", "tt", "r", "m", "b", "pp", "s", "ss", "", "j", "jj", "ch", "k", "t", "p",
    "h",
];

const MEDIALS: [&str; 21] = [
    "a", "ae", "ya", "yae", "eo", "e", "yeo", "ye", "o", "wa", "wae", "oe", "yo", "u", "wo", "we",
    "wi", "yu", "eu", "ui", "i",
];

/// Final consonants at the end of a word or before another consonant.
const FINALS: [&str; 28] = [
    "", "k", "k", "k", "n", "n", "n", "t", "l", "k", "m", "l", "l", "l", "p", "l", "m", "p", "p",
    "t", "t", "ng", "t", "t", "k", "t", "p", "t",
];

/// Sound a final consonant carries into a following syllable that starts with
/// the silent `ㅇ`. `None` keeps the plain final (compound finals, `ㅇ`).
const LIAISON: [Option<&str>; 28] = [
    None,
    Some("g"),
    Some("kk"),
    None,
    Some("n"),
    None,
    None,
    Some("d"),
    Some("r"),
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    Some("m"),
    Some("b"),
    None,
    Some("s"),
    Some("ss"),
    None,
    Some("j"),
    Some("ch"),
    Some("k"),
    Some("t"),
    Some("p"),
    Some(""),
];

#[derive(Debug, Clone, Copy)]
struct Syllable {
    initial: usize,
    medial: usize,
    final_: usize,
}

impl Syllable {
    fn decompose(c: char) -> Option<Self> {
        let code = u32::from(c);
        if !(SYLLABLE_BASE..=SYLLABLE_LAST).contains(&code) {
            return None;
        }
        let index = code - SYLLABLE_BASE;
        let to_usize = |n: u32| usize::try_from(n).ok();
        Some(Self {
            initial: to_usize(index / (MEDIAL_COUNT * FINAL_COUNT))?,
            medial: to_usize((index % (MEDIAL_COUNT * FINAL_COUNT)) / FINAL_COUNT)?,
            final_: to_usize(index % FINAL_COUNT)?,
        })
    }
}

/// Romanize the Hangul syllables in `text`; everything else passes through.
pub fn romanize_hangul(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() * 2);
    let mut carried: Option<&str> = None;

    for (i, &c) in chars.iter().enumerate() {
        let Some(syllable) = Syllable::decompose(c) else {
            carried = None;
            out.push(c);
            continue;
        };

        out.push_str(carried.take().unwrap_or(INITIALS[syllable.initial]));
        out.push_str(MEDIALS[syllable.medial]);

        let next = chars.get(i + 1).and_then(|&n| Syllable::decompose(n));
        match next {
            Some(next) if next.initial == SILENT_INITIAL && LIAISON[syllable.final_].is_some() => {
                carried = LIAISON[syllable.final_];
            }
            Some(next) if syllable.final_ == RIEUL_FINAL && next.initial == RIEUL_INITIAL => {
                out.push('l');
                carried = Some("l");
            }
            _ => out.push_str(FINALS[syllable.final_]),
        }
    }

    out
}
