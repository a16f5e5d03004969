//! Command channel from map widgets (popups) back into the session.

use tokio::sync::mpsc;

use crate::store::ShapeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    /// The edit button of a shape's popup was pressed.
    RequestEdit(ShapeId),
    /// The popup's close button was pressed.
    ClosePopup,
}

/// Cloneable handle given to widgets that want to talk to the session.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<EditorCommand>,
}

impl CommandSender {
    /// Queue `command`. Returns false once the session is gone.
    pub fn send(&self, command: EditorCommand) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(command = ?e.0, "Editor session closed, dropping command");
                false
            }
        }
    }

    pub fn request_edit(&self, id: ShapeId) -> bool {
        self.send(EditorCommand::RequestEdit(id))
    }
}

#[derive(Debug)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<EditorCommand>,
    rx: mpsc::UnboundedReceiver<EditorCommand>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl CommandQueue {
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every queued command without waiting.
    pub fn drain(&mut self) -> Vec<EditorCommand> {
        let mut out = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            out.push(command);
        }
        out
    }
}
