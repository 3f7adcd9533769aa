/// Receives the one-line status messages produced by state operations,
/// e.g. "State 3 saved". Usually forwarded to an on-screen notification.
pub trait MessageHandler {
    fn show_message(&mut self, message: &str);
}

impl<F: FnMut(&str)> MessageHandler for F {
    fn show_message(&mut self, message: &str) {
        self(message)
    }
}

/// Default handler. Writes messages to the log.
#[derive(Debug, Default)]
pub struct LogMessages;

impl MessageHandler for LogMessages {
    fn show_message(&mut self, message: &str) {
        log::info!("{}", message);
    }
}
