use super::Message;
use crate::actions::ActionKind;

/// An agent's private, append-only message log
#[derive(Debug, Clone, Default)]
pub struct Memory {
    messages: Vec<Message>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The last `k` messages, oldest first.
    pub fn recent(&self, k: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(k);
        &self.messages[start..]
    }

    /// Most recent message produced by `kind`.
    pub fn latest_by(&self, kind: ActionKind) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.produced_by == kind)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Role;

    #[test]
    fn lookups_see_newest_first() {
        let mut memory = Memory::new();
        memory.push(Message::requirement("sort"));
        memory.push(Message::new("v1", ActionKind::WriteTestCase, Role::TestDesigner));
        memory.push(Message::new("code", ActionKind::FixCCode, Role::CodeProgrammer));
        memory.push(Message::new("v2", ActionKind::WriteTestCase, Role::TestDesigner));

        assert_eq!(memory.last().unwrap().content, "v2");
        assert_eq!(memory.latest_by(ActionKind::WriteTestCase).unwrap().content, "v2");
        assert_eq!(memory.recent(2)[0].content, "code");
        assert_eq!(memory.recent(10).len(), 4);
        assert!(memory.latest_by(ActionKind::RunCode).is_none());
    }
}
