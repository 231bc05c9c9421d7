//! Consumer callback slots.
//!
//! Four named slots, fixed at client creation: `on_message` (required),
//! `on_error`, `on_open`, `on_close`. All of them run on the client's driver
//! task, one at a time, in the order the connection produced the events.

use crate::error::ClientError;
use crate::state::CloseInfo;

type Slot<T> = Box<dyn FnMut(T) + Send + 'static>;

/// Callbacks invoked by the event client.
pub struct ClientCallbacks<E> {
    on_message: Slot<E>,
    on_error: Option<Slot<ClientError>>,
    on_open: Option<Box<dyn FnMut() + Send + 'static>>,
    on_close: Option<Slot<CloseInfo>>,
}

impl<E> ClientCallbacks<E> {
    /// Callbacks with a message handler and no other slots filled.
    pub fn new(on_message: impl FnMut(E) + Send + 'static) -> Self {
        Self {
            on_message: Box::new(on_message),
            on_error: None,
            on_open: None,
            on_close: None,
        }
    }

    /// Receive transport errors and the terminal reconnect failure.
    #[must_use]
    pub fn with_error(mut self, on_error: impl FnMut(ClientError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Observe every successful open.
    #[must_use]
    pub fn with_open(mut self, on_open: impl FnMut() + Send + 'static) -> Self {
        self.on_open = Some(Box::new(on_open));
        self
    }

    /// Observe every close, including failed connection attempts.
    #[must_use]
    pub fn with_close(mut self, on_close: impl FnMut(CloseInfo) + Send + 'static) -> Self {
        self.on_close = Some(Box::new(on_close));
        self
    }

    pub(crate) fn message(&mut self, event: E) {
        (self.on_message)(event);
    }

    pub(crate) fn error(&mut self, error: ClientError) {
        if let Some(on_error) = self.on_error.as_mut() {
            on_error(error);
        }
    }

    pub(crate) fn opened(&mut self) {
        if let Some(on_open) = self.on_open.as_mut() {
            on_open();
        }
    }

    pub(crate) fn closed(&mut self, close: CloseInfo) {
        if let Some(on_close) = self.on_close.as_mut() {
            on_close(close);
        }
    }
}

impl<E> std::fmt::Debug for ClientCallbacks<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCallbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}
