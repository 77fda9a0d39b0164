// Collaborator seams. The engine never owns a connection or a browser
// shell; it signals into the connection state machine and queries the
// shell through these traits, so the whole core runs headless under
// test and in the replay binary.

use tavern_dom::NodeId;

/// Events fed into the connection state machine. This core only ever
/// signals; reconnection policy lives with the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnEvent {
    Connected,
    Error,
    Redirect,
}

pub trait Connection {
    fn feed(&mut self, event: ConnEvent);
}

/// Browser-shell queries and effects the engine needs around an
/// insertion. Queries are pure; effects are fire-and-forget.
pub trait Platform {
    fn alert(&mut self, text: &str);
    fn at_bottom(&self) -> bool;
    fn scroll_to_bottom(&mut self);
    fn visible(&self) -> bool;
    fn hover_active(&self) -> bool;
    fn navigate(&mut self, url: &str);
    fn refresh_board_smiles(&mut self, board: &str);
    fn observe_post(&mut self, node: NodeId);
    fn now(&self) -> f64;
}

/// Headless shell for replay runs and tests. Records every effect and
/// answers queries from plain fields.
#[derive(Debug)]
pub struct Headless {
    pub alerts: Vec<String>,
    pub navigations: Vec<String>,
    pub refreshed_boards: Vec<String>,
    pub observed: Vec<NodeId>,
    pub scrolls: usize,
    pub clock: f64,
    pub at_bottom: bool,
    pub visible: bool,
    pub hovering: bool,
}

impl Default for Headless {
    fn default() -> Self {
        Self {
            alerts: Vec::new(),
            navigations: Vec::new(),
            refreshed_boards: Vec::new(),
            observed: Vec::new(),
            scrolls: 0,
            clock: 0.0,
            at_bottom: true,
            visible: true,
            hovering: false,
        }
    }
}

impl Platform for Headless {
    fn alert(&mut self, text: &str) {
        self.alerts.push(text.to_string());
    }

    fn at_bottom(&self) -> bool {
        self.at_bottom
    }

    fn scroll_to_bottom(&mut self) {
        self.scrolls += 1;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn hover_active(&self) -> bool {
        self.hovering
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
    }

    fn refresh_board_smiles(&mut self, board: &str) {
        self.refreshed_boards.push(board.to_string());
    }

    fn observe_post(&mut self, node: NodeId) {
        self.observed.push(node);
    }

    fn now(&self) -> f64 {
        self.clock
    }
}

/// Connection stub that records what the engine fed it.
#[derive(Debug, Default)]
pub struct RecordedConnection {
    pub events: Vec<ConnEvent>,
}

impl Connection for RecordedConnection {
    fn feed(&mut self, event: ConnEvent) {
        self.events.push(event);
    }
}
