// Post insertion: reconcile one inserted post with the store, the
// tree and the scroll state. Message delivery order equals display
// order within a thread, so the live path always appends; ordered
// placement happens only on the out-of-band resync path
// (PostView::reposition).

use std::collections::HashMap;

use log::trace;
use tavern_dom::Tree;
use tavern_model::{PageContext, Post, Store};
use tavern_msg::PostData;
use tavern_view::tasks::Task;
use tavern_view::PostView;

use crate::platform::{Connection, Platform};
use crate::{Session, SyncError};

pub(crate) fn insert_post<P: Platform, C: Connection>(
    session: &mut Session<P, C>,
    data: PostData,
) -> Result<(), SyncError> {
    let Session {
        page,
        store,
        tree,
        views,
        tasks,
        options,
        platform,
        container,
        ..
    } = session;

    // scroll position must be read against the pre-insertion layout
    let at_bottom = platform.at_bottom();

    // op and board are stamped from page context; payloads may omit them
    let op = page.thread.or(data.op).unwrap_or(data.id);
    let post = Post::from_data(&data, op, &page.board);

    let mut view = PostView::render(tree, page, &post, true);
    view.after_render(tree, &post, options, tasks, platform.now())?;
    store.insert(post);

    // a missing container is a normal race between navigation and
    // in-flight messages: keep the entity, skip the tree
    let Some(container) = *container else {
        trace!("no thread container, dropping view for post {}", data.id);
        return Ok(());
    };
    if tree.is_detached(container) {
        trace!(
            "thread container is detached, dropping view for post {}",
            data.id
        );
        return Ok(());
    }

    // a duplicate insert replaces the old node along with the entity
    if let Some(old) = views.remove(&data.id) {
        tree.detach(old.root);
    }
    tree.append_child(container, view.root);

    platform.observe_post(view.root);
    propagate_links(store, views, tree, page, data.id, op)?;

    // smiles-offset classification waits for rendered text to settle
    if let Some(message) = tree.find_by_class(view.root, "post-message") {
        for paragraph in tree.find_all_by_tag(message, "p") {
            tasks.push(Task::SmileOffset(paragraph));
        }
    }

    for react in &data.reacts {
        view.render_reaction(tree, react, tasks)?;
    }

    if platform.visible() && at_bottom && !platform.hover_active() {
        platform.scroll_to_bottom();
    }

    views.insert(data.id, view);
    Ok(())
}

/// Attach client behaviour to a post the server already rendered into
/// the page. Rendering is deterministic, so building the markup here
/// is equivalent to adopting the server's.
pub(crate) fn hydrate_post<P: Platform, C: Connection>(
    session: &mut Session<P, C>,
    data: &PostData,
) -> Result<(), SyncError> {
    let Session {
        page,
        store,
        tree,
        views,
        tasks,
        options,
        platform,
        container,
        ..
    } = session;

    let op = page.thread.or(data.op).unwrap_or(data.id);
    let mut post = Post::from_data(data, op, &page.board);
    post.seen_once = true;

    let Some(container) = *container else {
        trace!("no thread container, nothing to hydrate for post {}", data.id);
        store.insert(post);
        return Ok(());
    };

    let mut view = PostView::render(tree, page, &post, false);
    tree.append_child(container, view.root);
    view.after_render(tree, &post, options, tasks, platform.now())?;

    for react in &data.reacts {
        view.render_reaction(tree, react, tasks)?;
    }

    store.insert(post);
    views.insert(data.id, view);
    propagate_links(store, views, tree, page, data.id, op)?;
    Ok(())
}

/// Surface one post's outbound links as backlinks on their targets,
/// repainting targets with a live view. Targets the client never
/// loaded are skipped.
fn propagate_links(
    store: &mut Store,
    views: &HashMap<u64, PostView>,
    tree: &mut Tree,
    page: &PageContext,
    id: u64,
    op: u64,
) -> Result<(), SyncError> {
    let links = match store.get(id) {
        Some(post) => post.links.clone(),
        None => return Ok(()),
    };
    for (target_id, _) in links {
        if let Some(target) = store.get_mut(target_id) {
            if target.add_backlink(id, op) {
                if let Some(target_view) = views.get(&target_id) {
                    target_view.render_backlinks(tree, target, page)?;
                }
            }
        } else {
            trace!("link target {} not loaded, backlink dropped", target_id);
        }
    }
    Ok(())
}
