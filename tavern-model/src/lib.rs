// In-memory model of the page: the post registry and the page context.
//
// The store owns every Post the client knows about. Entities are only
// ever removed by full page navigation; deletion tombstones a post in
// place so later messages addressed to its id still find a target.

use std::collections::HashMap;

use log::warn;
use tavern_msg::PostData;

/// One post in a discussion thread.
#[derive(Clone, Debug)]
pub struct Post {
    pub id: u64,
    /// Id of the owning thread, stamped from page context at creation.
    pub op: u64,
    pub board: String,
    pub time: f64,
    pub name: Option<String>,
    pub body: String,
    /// Posts this post links to: (post id, that post's thread id).
    pub links: Vec<(u64, u64)>,
    /// Posts linking to this post: referencing post id -> its thread id.
    /// Grows monotonically.
    pub backlinks: HashMap<u64, u64>,
    pub deleted: bool,
    pub closed: bool,
    /// True when the view was hydrated from markup already present in
    /// the document rather than created from a live insertion.
    pub seen_once: bool,
}

impl Post {
    pub fn from_data(data: &PostData, op: u64, board: &str) -> Self {
        Self {
            id: data.id,
            op,
            board: board.to_string(),
            time: data.time,
            name: data.name.clone(),
            body: data.body.clone(),
            links: data.links.clone(),
            backlinks: HashMap::new(),
            deleted: false,
            closed: false,
            seen_once: false,
        }
    }

    pub fn set_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn set_closed(&mut self) {
        self.closed = true;
    }

    /// Record that `from` (in thread `from_op`) links to this post.
    /// Returns true when the backlink was not known before.
    pub fn add_backlink(&mut self, from: u64, from_op: u64) -> bool {
        self.backlinks.insert(from, from_op).is_none()
    }
}

/// Registry of all posts on the current page, keyed by id.
#[derive(Debug, Default)]
pub struct Store {
    posts: HashMap<u64, Post>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a post. A duplicate id replaces the existing entity
    /// rather than creating a second instance: servers replay inserts
    /// after a reconnect backfill.
    pub fn insert(&mut self, post: Post) {
        if self.posts.contains_key(&post.id) {
            warn!("replacing existing post {} on duplicate insert", post.id);
        }
        self.posts.insert(post.id, post);
    }

    pub fn get(&self, id: u64) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Post> {
        self.posts.get_mut(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.posts.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Where the client currently is: which board, and which thread if any.
#[derive(Clone, Debug)]
pub struct PageContext {
    /// None on board pages, the thread id on thread pages.
    pub thread: Option<u64>,
    pub board: String,
}

impl PageContext {
    pub fn board_page(board: &str) -> Self {
        Self {
            thread: None,
            board: board.to_string(),
        }
    }

    pub fn thread_page(board: &str, thread: u64) -> Self {
        Self {
            thread: Some(thread),
            board: board.to_string(),
        }
    }

    /// The aggregate page showing every board at once.
    pub fn is_all(&self) -> bool {
        self.board == "all"
    }

    /// Whether a post in thread `op` is shown outside its own thread
    /// page (board index rendering mode).
    pub fn is_index_for(&self, op: u64) -> bool {
        self.thread != Some(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64) -> Post {
        Post {
            id,
            op: 1,
            board: "b".to_string(),
            time: 0.0,
            name: None,
            body: String::new(),
            links: Vec::new(),
            backlinks: HashMap::new(),
            deleted: false,
            closed: false,
            seen_once: false,
        }
    }

    #[test]
    fn test_duplicate_insert_keeps_one_instance() {
        let mut store = Store::new();
        store.insert(post(7));
        let mut replacement = post(7);
        replacement.body = "newer".to_string();
        store.insert(replacement);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(7).unwrap().body, "newer");
    }

    #[test]
    fn test_delete_is_a_tombstone() {
        let mut store = Store::new();
        store.insert(post(7));
        store.get_mut(7).unwrap().set_deleted();

        assert!(store.contains(7));
        assert!(store.get(7).unwrap().deleted);
    }

    #[test]
    fn test_backlinks_grow_monotonically() {
        let mut target = post(1);
        assert!(target.add_backlink(2, 1));
        assert!(!target.add_backlink(2, 1));
        assert!(target.add_backlink(3, 9));

        assert_eq!(target.backlinks.len(), 2);
        assert_eq!(target.backlinks[&3], 9);
    }

    #[test]
    fn test_page_context_flags() {
        let board = PageContext::board_page("all");
        assert!(board.is_all());
        assert!(board.is_index_for(1));

        let thread = PageContext::thread_page("b", 1);
        assert!(!thread.is_all());
        assert!(!thread.is_index_for(1));
        assert!(thread.is_index_for(2));
    }
}
