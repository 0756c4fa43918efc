//! Contextual shaping for Arabic-script letters.
//!
//! Font rasterizers that do not run a shaping engine draw every letter in its
//! isolated form. Replacing letters with their presentation forms (isolated,
//! final, initial, medial) beforehand makes the joined glyphs come out right.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Joins only to the preceding letter (alef, dal, reh, waw...).
    Right,
    /// Joins on both sides.
    Dual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Isolated,
    Final,
    Initial,
    Medial,
}

/// Presentation forms of one letter. The forms are laid out consecutively in
/// the Unicode tables starting at `isolated`.
#[derive(Debug, Clone, Copy)]
struct Forms {
    joining: Joining,
    isolated: u32,
}

impl Forms {
    const fn right(isolated: u32) -> Self {
        Forms {
            joining: Joining::Right,
            isolated,
        }
    }

    const fn dual(isolated: u32) -> Self {
        Forms {
            joining: Joining::Dual,
            isolated,
        }
    }

    fn glyph(self, form: Form, fallback: char) -> char {
        let offset = match (self.joining, form) {
            (_, Form::Isolated) => 0,
            (_, Form::Final) => 1,
            (Joining::Dual, Form::Initial) => 2,
            (Joining::Dual, Form::Medial) => 3,
            (Joining::Right, _) => 0,
        };
        char::from_u32(self.isolated + offset).unwrap_or(fallback)
    }
}

fn forms(c: char) -> Option<Forms> {
    let forms = match c {
        '\u{0622}' => Forms::right(0xFE81),
        '\u{0623}' => Forms::right(0xFE83),
        '\u{0624}' => Forms::right(0xFE85),
        '\u{0625}' => Forms::right(0xFE87),
        '\u{0626}' => Forms::dual(0xFE89),
        '\u{0627}' => Forms::right(0xFE8D),
        '\u{0628}' => Forms::dual(0xFE8F),
        '\u{0629}' => Forms::right(0xFE93),
        '\u{062A}' => Forms::dual(0xFE95),
        '\u{062B}' => Forms::dual(0xFE99),
        '\u{062C}' => Forms::dual(0xFE9D),
        '\u{062D}' => Forms::dual(0xFEA1),
        '\u{062E}' => Forms::dual(0xFEA5),
        '\u{062F}' => Forms::right(0xFEA9),
        '\u{0630}' => Forms::right(0xFEAB),
        '\u{0631}' => Forms::right(0xFEAD),
        '\u{0632}' => Forms::right(0xFEAF),
        '\u{0633}' => Forms::dual(0xFEB1),
        '\u{0634}' => Forms::dual(0xFEB5),
        '\u{0635}' => Forms::dual(0xFEB9),
        '\u{0636}' => Forms::dual(0xFEBD),
        '\u{0637}' => Forms::dual(0xFEC1),
        '\u{0638}' => Forms::dual(0xFEC5),
        '\u{0639}' => Forms::dual(0xFEC9),
        '\u{063A}' => Forms::dual(0xFECD),
        '\u{0641}' => Forms::dual(0xFED1),
        '\u{0642}' => Forms::dual(0xFED5),
        '\u{0643}' => Forms::dual(0xFED9),
        '\u{0644}' => Forms::dual(0xFEDD),
        '\u{0645}' => Forms::dual(0xFEE1),
        '\u{0646}' => Forms::dual(0xFEE5),
        '\u{0647}' => Forms::dual(0xFEE9),
        '\u{0648}' => Forms::right(0xFEED),
        '\u{0649}' => Forms::right(0xFEEF),
        '\u{064A}' => Forms::dual(0xFEF1),
        '\u{067E}' => Forms::dual(0xFB56),
        '\u{0686}' => Forms::dual(0xFB7A),
        '\u{0698}' => Forms::right(0xFB8A),
        '\u{06A9}' => Forms::dual(0xFB8E),
        '\u{06AF}' => Forms::dual(0xFB92),
        '\u{06C0}' => Forms::right(0xFBA4),
        '\u{06CC}' => Forms::dual(0xFBFC),
        _ => return None,
    };
    Some(forms)
}

/// Lam-alef ligature (isolated form) for the alef following a lam.
fn lam_alef(alef: char) -> Option<u32> {
    match alef {
        '\u{0622}' => Some(0xFEF5),
        '\u{0623}' => Some(0xFEF7),
        '\u{0625}' => Some(0xFEF9),
        '\u{0627}' => Some(0xFEFB),
        _ => None,
    }
}

const LAM: char = '\u{0644}';

/// Marks that sit on a letter without affecting how it joins.
fn is_transparent(c: char) -> bool {
    matches!(c, '\u{0610}'..='\u{061A}' | '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06DC}')
}

/// Tatweel and the zero-width joiner force joining on both sides.
fn is_join_causing(c: char) -> bool {
    matches!(c, '\u{0640}' | '\u{200D}')
}

fn connects_forward(c: char) -> bool {
    is_join_causing(c) || forms(c).is_some_and(|f| f.joining == Joining::Dual)
}

fn accepts_backward(c: char) -> bool {
    is_join_causing(c) || forms(c).is_some()
}

/// Replaces Arabic-script letters with the presentation form matching their
/// position in the word. Everything else passes through unchanged.
pub fn reshape(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + text.len() / 2);

    let neighbour = |from: usize, forward: bool| -> Option<char> {
        if forward {
            chars[from + 1..].iter().copied().find(|&c| !is_transparent(c))
        } else {
            chars[..from].iter().rev().copied().find(|&c| !is_transparent(c))
        }
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let Some(letter) = forms(c) else {
            out.push(c);
            i += 1;
            continue;
        };

        let joins_prev = neighbour(i, false).is_some_and(connects_forward);

        if c == LAM {
            if let Some(ligature) = chars.get(i + 1).copied().and_then(lam_alef) {
                let code = if joins_prev { ligature + 1 } else { ligature };
                out.push(char::from_u32(code).unwrap_or(c));
                i += 2;
                continue;
            }
        }

        let joins_next =
            letter.joining == Joining::Dual && neighbour(i, true).is_some_and(accepts_backward);

        let form = match (joins_prev, joins_next) {
            (true, true) => Form::Medial,
            (true, false) => Form::Final,
            (false, true) => Form::Initial,
            (false, false) => Form::Isolated,
        };
        out.push(letter.glyph(form, c));
        i += 1;
    }

    out
}
