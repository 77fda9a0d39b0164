// Post views: the live-rendered representation of one post and the
// incremental patches the sync engine applies to it. A view owns its
// root node in the tree and the badge nodes of its reaction strip;
// everything else is re-derived from the model on each repaint.

pub mod embed;
pub mod tasks;
pub mod templates;
pub mod time;

use std::collections::HashMap;

use itertools::Itertools;
use log::trace;
use tavern_dom::{DomError, NodeId, Tree};
use tavern_model::{PageContext, Post};
use tavern_msg::SmileReact;
use thiserror::Error as ThisError;

use tasks::{Task, TaskQueue};

pub const CLASS_REACT_MINIMIZED: &str = "post-react--minimized";
pub const CLASS_REACT_MAXIMIZED: &str = "post-react--maximized";

#[derive(Debug, ThisError)]
pub enum ViewError {
    #[error("Dom error, cause: {0}")]
    Dom(#[from] DomError),
    #[error("Post {1} markup is missing its {0} node")]
    MissingNode(&'static str, u64),
}

/// Lifecycle of a view. `Hydrating -> Ready` happens exactly once via
/// `after_render`; `Deleted` and `Removed` are terminal states, and
/// nothing leaves `Removed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    Hydrating,
    Ready,
    Deleted,
    Removed,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ViewOptions {
    pub relative_time: bool,
}

#[derive(Debug)]
pub struct PostView {
    pub post_id: u64,
    pub root: NodeId,
    /// True when created from a live insertion rather than hydrated
    /// from markup already present in the document.
    pub animate: bool,
    state: ViewState,
    badges: HashMap<String, NodeId>,
}

impl PostView {
    /// Render fresh markup for a post.
    pub fn render(tree: &mut Tree, page: &PageContext, post: &Post, animate: bool) -> Self {
        let root = templates::render_post(tree, page, post);
        if animate {
            tree.add_class(root, "should-anim");
        }
        PostView {
            post_id: post.id,
            root,
            animate,
            state: ViewState::Hydrating,
            badges: HashMap::new(),
        }
    }

    /// Attach a view to markup already present in the tree, picking up
    /// any badge nodes the server rendered.
    pub fn hydrate(tree: &Tree, post: &Post, root: NodeId) -> Self {
        let mut badges = HashMap::new();
        for badge in tree.find_all_by_class(root, "post-react") {
            if let Some(name) = tree.data(badge, "smile-name") {
                badges.insert(name.to_string(), badge);
            }
        }
        PostView {
            post_id: post.id,
            root,
            animate: false,
            state: ViewState::Hydrating,
            badges,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    fn advance(&mut self, next: ViewState) -> bool {
        use ViewState::*;
        let allowed = matches!(
            (self.state, next),
            (Hydrating, Ready) | (Ready, Deleted) | (Ready, Removed) | (Deleted, Removed)
        );
        if allowed {
            self.state = next;
        }
        allowed
    }

    /// Client-only adjustments, applied the same way to hydrated and
    /// freshly rendered markup. Safe to run more than once.
    pub fn after_render(
        &mut self,
        tree: &mut Tree,
        post: &Post,
        options: &ViewOptions,
        tasks: &mut TaskQueue,
        now: f64,
    ) -> Result<(), ViewError> {
        self.render_time(tree, post, options, now)?;
        if self.animate {
            tree.add_class(self.root, "post_loaded");
        }
        tasks.push(Task::RenderEmbeds(self.root));
        self.advance(ViewState::Ready);
        Ok(())
    }

    /// Time element text: absolute, or relative with the absolute text
    /// kept in the title attribute.
    pub fn render_time(
        &self,
        tree: &mut Tree,
        post: &Post,
        options: &ViewOptions,
        now: f64,
    ) -> Result<(), ViewError> {
        let el = tree
            .find_by_tag(self.root, "time")
            .ok_or(ViewError::MissingNode("time", self.post_id))?;
        let text = time::readable_time(post.time);
        if options.relative_time {
            tree.set_attr(el, "title", &text);
            tree.set_inner_text(el, &time::relative_time(post.time, now));
        } else {
            tree.set_inner_text(el, &text);
        }
        Ok(())
    }

    /// Re-render the strip of links to posts linking here.
    pub fn render_backlinks(
        &self,
        tree: &mut Tree,
        post: &Post,
        page: &PageContext,
    ) -> Result<(), ViewError> {
        if post.backlinks.is_empty() {
            return Ok(());
        }
        let container = tree
            .find_by_class(self.root, "post-backlinks")
            .ok_or(ViewError::MissingNode("post-backlinks", self.post_id))?;
        tree.clear_children(container);
        let label = tree.create_text("replies: ");
        tree.append_child(container, label);

        for (&from, &from_op) in post.backlinks.iter().sorted_by_key(|entry| *entry.0) {
            let cross = from_op != post.op;
            let anchor = tree.create_element("a");
            tree.add_class(anchor, "post-link");
            let href = if cross {
                format!("/{}/{}#p{}", post.board, from_op, from)
            } else {
                format!("#p{}", from)
            };
            tree.set_attr(anchor, "href", &href);
            let text = if cross {
                format!(">>{} ➡", from)
            } else {
                format!(">>{}", from)
            };
            tree.set_inner_text(anchor, &text);
            tree.append_child(container, anchor);
        }
        Ok(())
    }

    /// Merge one incoming reaction snapshot into the badge strip. The
    /// displayed count for a given reaction only ever grows; events
    /// carrying a lower or equal count are stale and are dropped.
    pub fn render_reaction(
        &mut self,
        tree: &mut Tree,
        react: &SmileReact,
        tasks: &mut TaskQueue,
    ) -> Result<(), ViewError> {
        let (badge, created) = self.react_badge(tree, &react.smile_name)?;

        if created {
            tree.add_class(badge, &format!("react-{}", react.smile_name));
            tree.add_class(badge, "post-react");
            tree.add_class(badge, "trigger-react-post");
            // pop-in: minimized now, settled once the clear task runs
            tree.add_class(badge, CLASS_REACT_MINIMIZED);

            let icon = tree.create_element("i");
            tree.add_class(icon, "smile");
            tree.add_class(icon, &format!("smile-{}", react.smile_name));
            tree.set_attr(icon, "title", &react.smile_name);
            tree.append_child(badge, icon);

            let counter = tree.create_element("span");
            tree.add_class(counter, "post-react__count");
            tree.set_inner_text(counter, &react.count.to_string());
            tree.append_child(badge, counter);

            tree.set_data(badge, "post-id", &self.post_id.to_string());
            tree.set_data(badge, "smile-name", &react.smile_name);
        } else {
            let counter = tree
                .find_by_class(badge, "post-react__count")
                .ok_or(ViewError::MissingNode("post-react__count", self.post_id))?;
            let displayed: u32 = tree.text_content(counter).trim().parse().unwrap_or(0);
            if react.count > displayed {
                tree.set_inner_text(counter, &react.count.to_string());
                tree.add_class(badge, CLASS_REACT_MAXIMIZED);
            } else {
                trace!(
                    "dropping stale {} reaction on post {}: {} <= {}",
                    react.smile_name,
                    self.post_id,
                    react.count,
                    displayed
                );
            }
        }

        // animation classes always come off on the same short delay,
        // whatever arrived in the meantime
        tasks.push(Task::ClearReactAnim(badge));
        Ok(())
    }

    /// Lookup-or-create the badge node for a reaction name. Never
    /// creates a second badge for the same name.
    fn react_badge(&mut self, tree: &mut Tree, smile_name: &str) -> Result<(NodeId, bool), ViewError> {
        if let Some(&badge) = self.badges.get(smile_name) {
            return Ok((badge, false));
        }
        let strip = tree
            .find_by_class(self.root, "post-reacts")
            .ok_or(ViewError::MissingNode("post-reacts", self.post_id))?;
        let divider = tree
            .find_by_class(strip, "post-reacts__divider")
            .ok_or(ViewError::MissingNode("post-reacts__divider", self.post_id))?;
        let badge = tree.create_element("div");
        tree.insert_before(badge, divider)?;
        self.badges.insert(smile_name.to_string(), badge);
        Ok((badge, true))
    }

    pub fn badge(&self, smile_name: &str) -> Option<NodeId> {
        self.badges.get(smile_name).copied()
    }

    /// Tombstone repaint. The node stays in the document.
    pub fn render_deleted(&mut self, tree: &mut Tree) {
        if self.state == ViewState::Deleted {
            return;
        }
        if !self.advance(ViewState::Deleted) {
            return;
        }
        tree.add_class(self.root, "deleted");
    }

    pub fn render_closed(&self, tree: &mut Tree) {
        tree.add_class(self.root, "closed");
    }

    /// Put the node back into id order inside its thread. Used on the
    /// resync path when backfill delivered a post out of band; the
    /// normal insertion path is append-only.
    pub fn reposition(&self, tree: &mut Tree, thread: NodeId) -> Result<(), ViewError> {
        for sibling in tree.children(thread).to_vec() {
            match tree.tag(sibling) {
                Some("article") => {
                    if post_id_of(tree, sibling).unwrap_or(0) > self.post_id {
                        tree.insert_before(self.root, sibling)?;
                        return Ok(());
                    }
                }
                // thread-list summary nodes always sort after posts
                Some("aside") => {
                    tree.insert_before(self.root, sibling)?;
                    return Ok(());
                }
                _ => {}
            }
        }
        // this post is the last in the thread, or the thread is empty
        tree.append_child(thread, self.root);
        Ok(())
    }

    /// Detach the enclosing thread subtree. Terminal.
    pub fn remove_thread(&mut self, tree: &mut Tree) {
        if !self.advance(ViewState::Removed) {
            return;
        }
        let mut node = self.root;
        let thread = loop {
            if tree.has_class(node, "thread") {
                break Some(node);
            }
            match tree.parent(node) {
                Some(parent) => node = parent,
                None => break None,
            }
        };
        tree.detach(thread.unwrap_or(self.root));
    }
}

/// Parse the numeric post id off an article's `p{id}` element id.
pub fn post_id_of(tree: &Tree, node: NodeId) -> Option<u64> {
    tree.attr(node, "id")?.strip_prefix('p')?.parse().ok()
}

/// Paragraphs holding nothing but smiles get an offset class once the
/// rendered text has settled. Runs deferred; repeat runs are no-ops.
pub fn smile_line_offset(tree: &mut Tree, node: NodeId) {
    if !tree.text_content(node).chars().any(|c| !c.is_whitespace()) {
        tree.add_class(node, "smiles-offset");
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NodeRect {
    pub left: f64,
    pub bottom: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

/// Whether the node is on screen or the user has already scrolled
/// past it.
pub fn scrolled_past(rect: &NodeRect, viewport: &ViewportSize) -> bool {
    rect.bottom < viewport.height && rect.left > 0.0 && rect.left < viewport.width
}
