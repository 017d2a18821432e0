use super::hypothesis::Hypothesis;

/// Turns growing partial hypotheses into individual, settled words.
///
/// Recognizers revise the tail of a partial result as more audio arrives,
/// so a word is only emitted once two consecutive partials agree on it and
/// on every word before it. A final hypothesis settles the whole utterance.
/// Each word position is emitted at most once per sentence, always in
/// utterance order.
#[derive(Debug, Default)]
pub struct WordDebouncer {
    previous: Vec<String>,
    emitted: usize,
}

/// Words released by one hypothesis.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Debounced {
    pub words: Vec<String>,
    pub end_of_sentence: bool,
}

impl WordDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, hypothesis: &Hypothesis) -> Debounced {
        match hypothesis {
            Hypothesis::Partial(text) => Debounced {
                words: self.accept_partial(text),
                end_of_sentence: false,
            },
            Hypothesis::Final(text) => Debounced {
                words: self.accept_final(text),
                end_of_sentence: true,
            },
        }
    }

    fn accept_partial(&mut self, text: &str) -> Vec<String> {
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let stable = self
            .previous
            .iter()
            .zip(&words)
            .take_while(|(a, b)| a == b)
            .count();

        let released = if stable > self.emitted {
            words[self.emitted..stable].to_vec()
        } else {
            Vec::new()
        };
        self.emitted = self.emitted.max(stable);
        self.previous = words;
        released
    }

    fn accept_final(&mut self, text: &str) -> Vec<String> {
        let released = text
            .split_whitespace()
            .skip(self.emitted)
            .map(str::to_string)
            .collect();
        self.reset();
        released
    }

    /// Forget the sentence in progress.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.emitted = 0;
    }

    /// Number of words of the current sentence already emitted.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}
