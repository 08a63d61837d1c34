/// Small English helpers shared by the evaluator, templates and kernels:
/// articles, verb inflection, list joining and name humanizing.

const IRREGULAR_PAST: &[(&str, &str)] = &[
    ("be", "was"), ("begin", "began"), ("bring", "brought"), ("buy", "bought"),
    ("catch", "caught"), ("choose", "chose"), ("come", "came"), ("draw", "drew"),
    ("drink", "drank"), ("drive", "drove"), ("eat", "ate"), ("fall", "fell"),
    ("feed", "fed"), ("feel", "felt"), ("find", "found"), ("fly", "flew"),
    ("forget", "forgot"), ("freeze", "froze"), ("get", "got"), ("give", "gave"),
    ("go", "went"), ("grow", "grew"), ("have", "had"), ("hear", "heard"),
    ("hide", "hid"), ("hit", "hit"), ("hold", "held"), ("hurt", "hurt"),
    ("keep", "kept"), ("know", "knew"), ("lead", "led"), ("leave", "left"),
    ("let", "let"), ("lose", "lost"), ("make", "made"), ("meet", "met"),
    ("put", "put"), ("read", "read"), ("ride", "rode"), ("rise", "rose"),
    ("run", "ran"), ("say", "said"), ("see", "saw"), ("seek", "sought"),
    ("send", "sent"), ("shake", "shook"), ("shine", "shone"), ("sing", "sang"),
    ("sit", "sat"), ("sleep", "slept"), ("speak", "spoke"), ("spend", "spent"),
    ("stand", "stood"), ("steal", "stole"), ("swim", "swam"), ("take", "took"),
    ("teach", "taught"), ("tell", "told"), ("think", "thought"), ("throw", "threw"),
    ("understand", "understood"), ("wake", "woke"), ("wear", "wore"), ("win", "won"),
    ("write", "wrote"),
];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// "a" or "an" for the word that follows.
pub fn article(word: &str) -> &'static str {
    match word.trim().chars().next() {
        Some(c) if is_vowel(c.to_ascii_lowercase()) => "an",
        _ => "a",
    }
}

/// `word` prefixed with its indefinite article.
pub fn with_article(word: &str) -> String {
    format!("{} {}", article(word), word)
}

/// Simple past tense of a verb.
pub fn past_tense(verb: &str) -> String {
    let verb = verb.to_lowercase();
    if let Some((_, past)) = IRREGULAR_PAST.iter().find(|(base, _)| *base == verb) {
        return past.to_string();
    }
    let chars: Vec<char> = verb.chars().collect();
    let n = chars.len();
    if verb.ends_with('e') {
        return format!("{}d", verb);
    }
    if n > 1 && chars[n - 1] == 'y' && !is_vowel(chars[n - 2]) {
        return format!("{}ied", &verb[..verb.len() - 1]);
    }
    if n > 2
        && !is_vowel(chars[n - 1])
        && !matches!(chars[n - 1], 'w' | 'x' | 'y')
        && is_vowel(chars[n - 2])
        && !is_vowel(chars[n - 3])
    {
        return format!("{}{}ed", verb, chars[n - 1]);
    }
    format!("{}ed", verb)
}

/// The `-ing` form of a verb.
pub fn present_participle(verb: &str) -> String {
    let verb = verb.to_lowercase();
    let chars: Vec<char> = verb.chars().collect();
    let n = chars.len();
    if verb.ends_with("ie") {
        return format!("{}ying", &verb[..verb.len() - 2]);
    }
    if verb.ends_with('e') && !verb.ends_with("ee") {
        return format!("{}ing", &verb[..verb.len() - 1]);
    }
    if n > 2
        && !is_vowel(chars[n - 1])
        && !matches!(chars[n - 1], 'w' | 'x' | 'y')
        && is_vowel(chars[n - 2])
        && !is_vowel(chars[n - 3])
    {
        return format!("{}{}ing", verb, chars[n - 1]);
    }
    format!("{}ing", verb)
}

pub fn pluralize(word: &str) -> String {
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("sh") || word.ends_with("ch") {
        return format!("{}es", word);
    }
    let chars: Vec<char> = word.chars().collect();
    let n = chars.len();
    if n > 1 && chars[n - 1] == 'y' && !is_vowel(chars[n - 2]) {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    format!("{}s", word)
}

/// "a", "a and b", "a, b, and c".
pub fn join_list<S: AsRef<str>>(items: &[S], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [a, b] => format!("{} {} {}", a.as_ref(), conjunction, b.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|s| s.as_ref()).collect();
            format!("{}, {} {}", head.join(", "), conjunction, last.as_ref())
        }
    }
}

/// Turn a kernel or category name into lowercase words: `HappyEnd` and
/// `happy_end` both become "happy end". Names without any lowercase letter
/// (labels such as `B` or `ATU`) are kept verbatim.
pub fn humanize(name: &str) -> String {
    if !name.chars().any(|c| c.is_lowercase()) {
        return name.replace('_', " ");
    }
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' {
            out.push(' ');
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A number as a story would print it: integers without a fractional part.
pub fn number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Uppercase the first character.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
