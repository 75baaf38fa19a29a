use crate::domain::ChatEvent;

/// Consumer of decoded chat events.
///
/// Called synchronously from the connection loop for every accepted event,
/// so implementations must return quickly (enqueue, print, forward).
pub trait ChatListener: Send + Sync {
    fn on_chat(&self, event: &ChatEvent);
}

impl<F> ChatListener for F
where
    F: Fn(&ChatEvent) + Send + Sync,
{
    fn on_chat(&self, event: &ChatEvent) {
        self(event);
    }
}
