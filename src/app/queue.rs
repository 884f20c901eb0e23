use crate::app::command::Command;
use crate::errors::{Result, StrataError};
use crate::renderer::context::RenderContext;

/// Bounded FIFO carrying [`Command`]s from client threads to the render
/// thread.
///
/// Enqueueing never blocks: a full queue is reported to the caller, who
/// decides whether to retry or drop. The render thread drains the queue once
/// per frame, before any pass is rendered.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: flume::Sender<Command>,
    rx: flume::Receiver<Command>,
    capacity: usize,
}

impl CommandQueue {
    /// Creates a queue holding at most `capacity` commands (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = flume::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Pushes a command, handing it back if the queue is full.
    pub fn try_push(&self, command: Command) -> std::result::Result<(), Command> {
        self.tx.try_send(command).map_err(|err| match err {
            flume::TrySendError::Full(command) | flume::TrySendError::Disconnected(command) => {
                command
            }
        })
    }

    /// Pushes a command, failing with [`StrataError::QueueFull`] if there is
    /// no room.
    pub fn enqueue(&self, command: Command) -> Result<()> {
        self.try_push(command).map_err(|_| StrataError::QueueFull {
            capacity: self.capacity,
        })
    }

    /// Executes every command queued when the drain started, in FIFO order.
    ///
    /// Commands pushed while draining wait for the next drain. A failing
    /// command is logged and counted; the remaining commands still run.
    /// Returns the number of commands executed.
    pub fn drain(&self, ctx: &mut RenderContext) -> usize {
        let pending = self.rx.len();
        let mut executed = 0;
        for command in self.rx.try_iter().take(pending) {
            let label = command.label();
            match command.apply(ctx) {
                Ok(()) => ctx.stats.commands_applied += 1,
                Err(err) => {
                    ctx.stats.commands_failed += 1;
                    ctx.logger.error(&format!("queued {label} failed: {err}"));
                }
            }
            executed += 1;
        }
        if executed > 0 {
            ctx.release_pending();
        }
        executed
    }

    /// Drops every queued command without executing it.
    pub fn discard(&self) -> usize {
        self.rx.drain().count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_hands_command_back() {
        let queue = CommandQueue::new(2);
        queue.enqueue(Command::AddObject("a".into())).unwrap();
        queue.enqueue(Command::AddObject("b".into())).unwrap();

        let rejected = queue.try_push(Command::AddObject("c".into())).unwrap_err();
        assert_eq!(rejected.label(), "add_object");
        assert!(matches!(
            queue.enqueue(Command::AddObject("c".into())),
            Err(StrataError::QueueFull { capacity: 2 })
        ));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn discard_empties_queue() {
        let queue = CommandQueue::new(4);
        queue.enqueue(Command::RemoveAllObjects).unwrap();
        queue.enqueue(Command::AddPassToBack("pass1".into())).unwrap();
        assert_eq!(queue.discard(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(CommandQueue::new(0).capacity(), 1);
    }
}
