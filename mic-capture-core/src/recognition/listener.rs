use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Observer of recognized words.
///
/// Called from the recognition worker thread, in utterance order.
pub trait WordListener: Send + Sync {
    fn on_word(&self, word: &str);

    fn on_end_of_sentence(&self) {}

    fn on_error(&self, message: &str) {
        log::warn!("Recognition error: {}", message);
    }

    /// The word stream restarts, e.g. at the beginning of a session.
    fn on_reset(&self) {}
}

/// Word pipeline events, as delivered by [`ChannelWordListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordEvent {
    Word(String),
    EndOfSentence,
    Error(String),
    Reset,
}

/// `WordListener` that forwards events into a bounded channel.
///
/// There is no backpressure towards the recognizer: when the channel is
/// full the event is dropped with a warning.
pub struct ChannelWordListener {
    sender: Sender<WordEvent>,
}

/// Create a listener and the receiving end of its channel.
pub fn word_channel(capacity: usize) -> (ChannelWordListener, Receiver<WordEvent>) {
    let (sender, receiver) = bounded(capacity);
    (ChannelWordListener { sender }, receiver)
}

impl ChannelWordListener {
    fn send(&self, event: WordEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::warn!("Word channel full; dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Word channel closed; event discarded");
            }
        }
    }
}

impl WordListener for ChannelWordListener {
    fn on_word(&self, word: &str) {
        self.send(WordEvent::Word(word.to_string()));
    }

    fn on_end_of_sentence(&self) {
        self.send(WordEvent::EndOfSentence);
    }

    fn on_error(&self, message: &str) {
        self.send(WordEvent::Error(message.to_string()));
    }

    fn on_reset(&self) {
        self.send(WordEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_events_in_order() {
        let (listener, rx) = word_channel(8);
        listener.on_reset();
        listener.on_word("hello");
        listener.on_end_of_sentence();
        listener.on_error("timeout");

        let events: Vec<WordEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                WordEvent::Reset,
                WordEvent::Word("hello".into()),
                WordEvent::EndOfSentence,
                WordEvent::Error("timeout".into()),
            ]
        );
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (listener, rx) = word_channel(1);
        listener.on_word("one");
        listener.on_word("two");

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![WordEvent::Word("one".into())]);
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (listener, rx) = word_channel(1);
        drop(rx);
        listener.on_word("nobody");
    }
}
