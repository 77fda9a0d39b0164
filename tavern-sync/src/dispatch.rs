// The message dispatch table: one handler per message kind, invoked
// synchronously as frames arrive off the connection. Registration is
// last-write-wins so feature code can override a default binding;
// kinds with no handler are dropped silently, since legacy message
// types are deliberately left unbound.

use std::collections::HashMap;

use log::trace;
use tavern_msg::{Message, MessageKind};

use crate::insert;
use crate::platform::{ConnEvent, Connection, Platform};
use crate::{Session, SyncError};

pub type Handler<P, C> = Box<dyn FnMut(&mut Session<P, C>, Message) -> Result<(), SyncError>>;

pub struct Dispatcher<P: Platform, C: Connection> {
    handlers: HashMap<MessageKind, Handler<P, C>>,
}

impl<P: Platform + 'static, C: Connection + 'static> Dispatcher<P, C> {
    /// An empty table: every frame is dropped until handlers register.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The table with the standard handler bindings.
    pub fn init() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(MessageKind::Invalid, Box::new(on_invalid::<P, C>));
        dispatcher.register(MessageKind::InsertPost, Box::new(on_insert_post::<P, C>));
        dispatcher.register(MessageKind::DeletePost, Box::new(on_delete_post::<P, C>));
        dispatcher.register(MessageKind::Redirect, Box::new(on_redirect::<P, C>));
        dispatcher.register(MessageKind::SmilesUpdate, Box::new(on_smiles_update::<P, C>));
        dispatcher
    }

    /// Associate a handler with a message kind, replacing any previous
    /// handler for that kind.
    pub fn register(&mut self, kind: MessageKind, handler: Handler<P, C>) {
        self.handlers.insert(kind, handler);
    }

    /// Run the handler for one frame, synchronously, on the calling
    /// thread. Only a protocol violation escapes as an error.
    pub fn dispatch(
        &mut self,
        session: &mut Session<P, C>,
        message: Message,
    ) -> Result<(), SyncError> {
        let kind = message.kind();
        match self.handlers.get_mut(&kind) {
            Some(handler) => handler(session, message),
            None => {
                trace!("no handler for {:?}, dropping frame", kind);
                Ok(())
            }
        }
    }
}

impl<P: Platform + 'static, C: Connection + 'static> Default for Dispatcher<P, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A malformed server message is a protocol violation: surface it,
/// force the connection into its error state, then fail loudly.
fn on_invalid<P: Platform, C: Connection>(
    session: &mut Session<P, C>,
    message: Message,
) -> Result<(), SyncError> {
    if let Message::Invalid(text) = message {
        session.platform.alert(&text);
        session.connection.feed(ConnEvent::Error);
        return Err(SyncError::Protocol(text));
    }
    Ok(())
}

fn on_insert_post<P: Platform, C: Connection>(
    session: &mut Session<P, C>,
    message: Message,
) -> Result<(), SyncError> {
    if let Message::InsertPost(data) = message {
        insert::insert_post(session, data)?;
    }
    Ok(())
}

/// Deletion tombstones the model in place; ids the client never
/// loaded are ignored, the post may belong to a page we don't hold.
fn on_delete_post<P: Platform, C: Connection>(
    session: &mut Session<P, C>,
    message: Message,
) -> Result<(), SyncError> {
    if let Message::DeletePost(id) = message {
        let Session {
            store, views, tree, ..
        } = session;
        match store.get_mut(id) {
            Some(post) => {
                post.set_deleted();
                if let Some(view) = views.get_mut(&id) {
                    view.render_deleted(tree);
                }
            }
            None => trace!("delete for unknown post {}, ignoring", id),
        }
    }
    Ok(())
}

fn on_redirect<P: Platform, C: Connection>(
    session: &mut Session<P, C>,
    message: Message,
) -> Result<(), SyncError> {
    if let Message::Redirect(board) = message {
        session.platform.navigate(&format!("/{}/", board));
    }
    Ok(())
}

fn on_smiles_update<P: Platform, C: Connection>(
    session: &mut Session<P, C>,
    message: Message,
) -> Result<(), SyncError> {
    if let Message::SmilesUpdate(update) = message {
        session.platform.refresh_board_smiles(&update.board);
    }
    Ok(())
}
