use crate::agents::Message;

/// Shared message bus: the full history plus what is waiting for the next
/// round.
#[derive(Debug, Default)]
pub struct MessageBus {
    history: Vec<Message>,
    pending: Vec<Message>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, message: Message) {
        self.history.push(message.clone());
        self.pending.push(message);
    }

    /// Everything posted since the previous call. Messages published after
    /// this returns land in the next snapshot.
    pub fn take_snapshot(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.pending)
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_partition_the_history() {
        let mut bus = MessageBus::new();
        bus.publish(Message::requirement("a"));
        let first = bus.take_snapshot();
        bus.publish(Message::requirement("b"));

        assert_eq!(first.len(), 1);
        assert!(bus.has_pending());
        assert_eq!(bus.take_snapshot()[0].content, "b");
        assert!(bus.take_snapshot().is_empty());
        assert_eq!(bus.history().len(), 2);
    }
}
