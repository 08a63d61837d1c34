use serde::{Deserialize, Serialize};

/// Default salience of a freshly generated fragment.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Characters that end a sentence.
pub const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?'];

/// A minimal unit of generated text carrying a salience weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub weight: f64,
    /// Name of the kernel that produced the text, empty for plain words.
    pub kernel: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>, kernel: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: DEFAULT_WEIGHT,
            kernel: kernel.into(),
        }
    }

    /// A fragment with no originating kernel.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, "")
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// A copy of this fragment with its weight divided by `divisor`.
    pub fn diluted(&self, divisor: f64) -> Self {
        Self {
            text: self.text.clone(),
            weight: self.weight / divisor,
            kernel: self.kernel.clone(),
        }
    }

    /// Text with trailing sentence punctuation removed, for embedding inside
    /// a larger sentence.
    pub fn phrase(&self) -> &str {
        self.text.trim().trim_end_matches(TERMINAL_PUNCTUATION)
    }
}

/// Append `next` to `buf` as a new sentence. A single space separates the
/// two when `buf` already ends in terminal punctuation, otherwise `". "`.
pub fn join_sentence(buf: &mut String, next: &str) {
    let next = next.trim();
    if next.is_empty() {
        return;
    }
    let trimmed_len = buf.trim_end().len();
    buf.truncate(trimmed_len);
    if !buf.is_empty() {
        if !buf.ends_with(TERMINAL_PUNCTUATION) {
            buf.push('.');
        }
        buf.push(' ');
    }
    buf.push_str(next);
}

/// An ordered sequence of fragments produced by the `+` operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    parts: Vec<Fragment>,
}

impl Composition {
    /// Compose two part lists, left first. Empty parts are dropped.
    pub fn join(left: Vec<Fragment>, right: Vec<Fragment>) -> Self {
        let parts = left
            .into_iter()
            .chain(right)
            .filter(|f| !f.is_empty())
            .collect();
        Self { parts }
    }

    pub fn parts(&self) -> &[Fragment] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Fragment> {
        self.parts
    }

    /// Parts joined as consecutive sentences.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            join_sentence(&mut out, &part.text);
        }
        out
    }

    /// The weight of the most salient part, 0 for an empty composition.
    pub fn weight(&self) -> f64 {
        self.parts.iter().map(|f| f.weight).fold(0.0, f64::max)
    }

    /// Divide the weight of every part.
    pub fn diluted(&self, divisor: f64) -> Self {
        Self {
            parts: self.parts.iter().map(|f| f.diluted(divisor)).collect(),
        }
    }

    /// Collapse the composition into a single fragment.
    pub fn to_fragment(&self) -> Fragment {
        Fragment::new(self.text(), "+").with_weight(self.weight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_inserts_period_when_missing() {
        let mut s = String::from("Tim ran");
        join_sentence(&mut s, "Tim fell.");
        assert_eq!(s, "Tim ran. Tim fell.");
    }

    #[test]
    fn join_keeps_existing_punctuation() {
        let mut s = String::from("What a surprise!  ");
        join_sentence(&mut s, "Tim laughed.");
        assert_eq!(s, "What a surprise! Tim laughed.");
    }

    #[test]
    fn join_into_empty_buffer() {
        let mut s = String::new();
        join_sentence(&mut s, "  Hello.");
        assert_eq!(s, "Hello.");
        join_sentence(&mut s, "   ");
        assert_eq!(s, "Hello.");
    }

    #[test]
    fn composition_weight_is_max_not_sum() {
        let c = Composition::join(
            vec![Fragment::plain("a").with_weight(0.4)],
            vec![Fragment::plain("b").with_weight(0.9)],
        );
        assert_eq!(c.weight(), 0.9);
        assert_eq!(c.text(), "a. b");
        assert_eq!(c.to_fragment().weight, 0.9);
    }

    #[test]
    fn composition_drops_empty_parts() {
        let c = Composition::join(vec![Fragment::plain("")], vec![Fragment::plain("b.")]);
        assert_eq!(c.parts().len(), 1);
        assert_eq!(c.text(), "b.");
    }

    #[test]
    fn dilution_divides_every_part() {
        let c = Composition::join(
            vec![Fragment::plain("a")],
            vec![Fragment::plain("b").with_weight(0.5)],
        )
        .diluted(2.0);
        assert_eq!(c.parts()[0].weight, 0.5);
        assert_eq!(c.parts()[1].weight, 0.25);
    }

    #[test]
    fn phrase_strips_terminal_punctuation() {
        assert_eq!(Fragment::plain("Tim was brave!").phrase(), "Tim was brave");
    }
}
