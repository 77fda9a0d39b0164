// Client-side sync engine for the discussion board: keeps the
// in-memory post model consistent with the server's mutation stream,
// and the live tree consistent with the model.
//
// Everything is single-threaded and event-loop driven. The connection
// collaborator delivers frames one at a time; each dispatch runs to
// completion before the next begins, so the server's delivery order
// is the effective application order for same-post mutations. The
// only suspension points are the deferred tasks in the queue, and
// nothing in dispatch waits on them.

pub mod dispatch;
mod insert;
pub mod platform;

use std::collections::HashMap;

use tavern_dom::{DomError, NodeId, Tree};
use tavern_model::{PageContext, Store};
use tavern_msg::PostData;
use tavern_view::tasks::{run_pending, TaskQueue};
use tavern_view::{PostView, ViewError, ViewOptions};
use thiserror::Error as ThisError;

pub use dispatch::Dispatcher;
pub use platform::{ConnEvent, Connection, Headless, Platform, RecordedConnection};

#[derive(Debug, ThisError)]
pub enum SyncError {
    #[error("Protocol violation from server: {0}")]
    Protocol(String),
    #[error("View error, cause: {0}")]
    View(#[from] ViewError),
    #[error("Dom error, cause: {0}")]
    Dom(#[from] DomError),
}

/// One page-session worth of state: the post registry, the live tree
/// and the collaborators. Built per page load and injected into the
/// dispatcher; nothing here is ambient.
pub struct Session<P: Platform, C: Connection> {
    pub page: PageContext,
    pub store: Store,
    pub tree: Tree,
    pub views: HashMap<u64, PostView>,
    pub tasks: TaskQueue,
    pub options: ViewOptions,
    pub platform: P,
    pub connection: C,
    /// Document root of the tree.
    pub root: NodeId,
    /// Thread container posts are appended into. None when the view
    /// no longer matches this thread.
    pub container: Option<NodeId>,
}

impl<P: Platform, C: Connection> Session<P, C> {
    pub fn new(page: PageContext, platform: P, connection: C) -> Self {
        let mut tree = Tree::new();
        let root = tree.create_element("body");
        Session {
            page,
            store: Store::new(),
            tree,
            views: HashMap::new(),
            tasks: TaskQueue::new(),
            options: ViewOptions::default(),
            platform,
            connection,
            root,
            container: None,
        }
    }

    /// Create the thread container posts are appended into.
    pub fn init_container(&mut self, thread: Option<u64>) -> NodeId {
        let section = self.tree.create_element("section");
        self.tree.add_class(section, "thread");
        if let Some(op) = thread {
            self.tree.set_attr(section, "id", &format!("thread{}", op));
        }
        self.tree.append_child(self.root, section);
        self.container = Some(section);
        section
    }

    /// Attach client behaviour to posts the server already rendered
    /// into the page.
    pub fn hydrate(&mut self, posts: &[PostData]) -> Result<(), SyncError> {
        for data in posts {
            insert::hydrate_post(self, data)?;
        }
        Ok(())
    }

    /// Drain deferred work scheduled by earlier dispatches. Called
    /// once per scheduler tick by the embedding shell.
    pub fn run_deferred(&mut self) {
        run_pending(&mut self.tree, &mut self.tasks);
    }

    pub fn view(&self, id: u64) -> Option<&PostView> {
        self.views.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavern_msg::{Message, PostData, SmileReact};
    use tavern_view::post_id_of;

    type TestSession = Session<Headless, RecordedConnection>;

    fn post_data(id: u64) -> PostData {
        PostData {
            id,
            op: None,
            board: None,
            time: 1683000000.0,
            name: None,
            body: format!("post {}", id),
            links: Vec::new(),
            reacts: Vec::new(),
        }
    }

    fn thread_session() -> (TestSession, Dispatcher<Headless, RecordedConnection>) {
        let mut session = Session::new(
            PageContext::thread_page("b", 1),
            Headless::default(),
            RecordedConnection::default(),
        );
        session.init_container(Some(1));
        (session, Dispatcher::init())
    }

    fn dom_order(session: &TestSession) -> Vec<u64> {
        let container = session.container.unwrap();
        session
            .tree
            .children(container)
            .iter()
            .filter_map(|&node| post_id_of(&session.tree, node))
            .collect()
    }

    #[test]
    fn test_inserts_in_message_order_match_id_order() {
        let (mut session, mut dispatcher) = thread_session();
        for id in [1, 2, 3] {
            dispatcher
                .dispatch(&mut session, Message::InsertPost(post_data(id)))
                .unwrap();
        }

        assert_eq!(dom_order(&session), vec![1, 2, 3]);
        assert_eq!(session.store.len(), 3);
    }

    #[test]
    fn test_duplicate_insert_keeps_one_entity_and_one_node() {
        let (mut session, mut dispatcher) = thread_session();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(2)))
            .unwrap();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(2)))
            .unwrap();

        assert_eq!(session.store.len(), 1);
        assert_eq!(dom_order(&session), vec![2]);
    }

    #[test]
    fn test_delete_tombstones_without_reordering() {
        let (mut session, mut dispatcher) = thread_session();
        for id in [1, 2, 3] {
            dispatcher
                .dispatch(&mut session, Message::InsertPost(post_data(id)))
                .unwrap();
        }
        dispatcher
            .dispatch(&mut session, Message::DeletePost(2))
            .unwrap();

        assert_eq!(dom_order(&session), vec![1, 2, 3]);
        assert!(session.store.get(2).unwrap().deleted);
        let view = session.view(2).unwrap();
        assert!(session.tree.has_class(view.root, "deleted"));
    }

    #[test]
    fn test_reaction_after_delete_does_not_fail() {
        let (mut session, mut dispatcher) = thread_session();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(1)))
            .unwrap();
        dispatcher
            .dispatch(&mut session, Message::DeletePost(1))
            .unwrap();

        let Session {
            views, tree, tasks, ..
        } = &mut session;
        let view = views.get_mut(&1).unwrap();
        let react = SmileReact {
            smile_name: "heart".to_string(),
            count: 1,
        };
        view.render_reaction(tree, &react, tasks).unwrap();
        assert!(view.badge("heart").is_some());
    }

    #[test]
    fn test_insert_without_container_keeps_the_entity() {
        let mut session = Session::new(
            PageContext::thread_page("b", 1),
            Headless::default(),
            RecordedConnection::default(),
        );
        let mut dispatcher = Dispatcher::init();

        let result = dispatcher.dispatch(&mut session, Message::InsertPost(post_data(5)));

        assert!(result.is_ok());
        assert!(session.store.contains(5));
        assert!(session.view(5).is_none());
    }

    #[test]
    fn test_insert_into_detached_container_is_silent() {
        let (mut session, mut dispatcher) = thread_session();
        let container = session.container.unwrap();
        session.tree.detach(container);

        let result = dispatcher.dispatch(&mut session, Message::InsertPost(post_data(5)));

        assert!(result.is_ok());
        assert!(session.store.contains(5));
        assert!(session.view(5).is_none());
    }

    #[test]
    fn test_payload_reacts_apply_on_insert() {
        let (mut session, mut dispatcher) = thread_session();
        let mut data = post_data(1);
        data.reacts.push(SmileReact {
            smile_name: "heart".to_string(),
            count: 2,
        });
        dispatcher
            .dispatch(&mut session, Message::InsertPost(data))
            .unwrap();

        let view = session.view(1).unwrap();
        let badge = view.badge("heart").unwrap();
        assert!(session
            .tree
            .has_class(badge, tavern_view::CLASS_REACT_MINIMIZED));

        session.run_deferred();
        assert!(!session
            .tree
            .has_class(badge, tavern_view::CLASS_REACT_MINIMIZED));
    }

    #[test]
    fn test_links_propagate_backlinks_to_live_targets() {
        let (mut session, mut dispatcher) = thread_session();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(1)))
            .unwrap();

        let mut reply = post_data(2);
        reply.links.push((1, 1));
        dispatcher
            .dispatch(&mut session, Message::InsertPost(reply))
            .unwrap();

        let target = session.store.get(1).unwrap();
        assert_eq!(target.backlinks.get(&2), Some(&1));

        let target_view = session.view(1).unwrap();
        let strip = session
            .tree
            .find_by_class(target_view.root, "post-backlinks")
            .unwrap();
        assert_eq!(session.tree.text_content(strip), "replies: >>2");
    }

    #[test]
    fn test_link_to_unloaded_post_is_ignored() {
        let (mut session, mut dispatcher) = thread_session();
        let mut reply = post_data(2);
        reply.links.push((999, 7));

        assert!(dispatcher
            .dispatch(&mut session, Message::InsertPost(reply))
            .is_ok());
        assert!(!session.store.contains(999));
    }

    #[test]
    fn test_auto_scroll_only_from_the_bottom() {
        let (mut session, mut dispatcher) = thread_session();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(1)))
            .unwrap();
        assert_eq!(session.platform.scrolls, 1);

        session.platform.at_bottom = false;
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(2)))
            .unwrap();
        assert_eq!(session.platform.scrolls, 1);
    }

    #[test]
    fn test_no_auto_scroll_while_hovering_or_hidden() {
        let (mut session, mut dispatcher) = thread_session();
        session.platform.hovering = true;
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(1)))
            .unwrap();
        assert_eq!(session.platform.scrolls, 0);

        session.platform.hovering = false;
        session.platform.visible = false;
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(2)))
            .unwrap();
        assert_eq!(session.platform.scrolls, 0);
    }

    #[test]
    fn test_new_root_is_registered_with_observers() {
        let (mut session, mut dispatcher) = thread_session();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(1)))
            .unwrap();

        let view = session.view(1).unwrap();
        assert_eq!(session.platform.observed, vec![view.root]);
    }

    #[test]
    fn test_smile_offset_classifies_deferred() {
        let (mut session, mut dispatcher) = thread_session();
        // a body that renders a paragraph with no text at all
        let mut data = post_data(1);
        data.body = "![](smile-sprite.png)".to_string();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(data))
            .unwrap();

        let view = session.view(1).unwrap();
        let message = session
            .tree
            .find_by_class(view.root, "post-message")
            .unwrap();
        let paragraph = session.tree.find_by_tag(message, "p").unwrap();
        assert!(!session.tree.has_class(paragraph, "smiles-offset"));

        session.run_deferred();
        assert!(session.tree.has_class(paragraph, "smiles-offset"));
    }

    #[test]
    fn test_hydrated_posts_are_marked_seen() {
        let (mut session, _dispatcher) = thread_session();
        session.hydrate(&[post_data(1), post_data(2)]).unwrap();

        assert_eq!(dom_order(&session), vec![1, 2]);
        assert!(session.store.get(1).unwrap().seen_once);
        // hydrated views never animate
        let view = session.view(1).unwrap();
        assert!(!session.tree.has_class(view.root, "should-anim"));
    }

    #[test]
    fn test_hydrate_propagates_links() {
        let (mut session, _dispatcher) = thread_session();
        let mut reply = post_data(2);
        reply.links.push((1, 1));
        session.hydrate(&[post_data(1), reply]).unwrap();

        assert_eq!(session.store.get(1).unwrap().backlinks.get(&2), Some(&1));
        let target_view = session.view(1).unwrap();
        let strip = session
            .tree
            .find_by_class(target_view.root, "post-backlinks")
            .unwrap();
        assert_eq!(session.tree.text_content(strip), "replies: >>2");
    }

    #[test]
    fn test_hydration_then_live_insert_share_one_pipeline() {
        let (mut session, mut dispatcher) = thread_session();
        session.hydrate(&[post_data(1)]).unwrap();
        dispatcher
            .dispatch(&mut session, Message::InsertPost(post_data(2)))
            .unwrap();

        assert_eq!(dom_order(&session), vec![1, 2]);
        let live = session.view(2).unwrap();
        assert!(session.tree.has_class(live.root, "should-anim"));
        assert!(session.tree.has_class(live.root, "post_loaded"));
    }
}
