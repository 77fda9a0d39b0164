// Post markup templates. Rendering is deterministic for identical
// inputs: a hydrated page and a fresh client render of the same model
// produce the same tree.

use pulldown_cmark::{Event, HeadingLevel, Tag};
use tavern_dom::{NodeId, Tree};
use tavern_markdown::{body_events, EVERYONE_HREF};
use tavern_model::{PageContext, Post};

pub const ANONYMOUS: &str = "Anonymous";

pub fn render_post(tree: &mut Tree, page: &PageContext, post: &Post) -> NodeId {
    let article = tree.create_element("article");
    tree.set_attr(article, "id", &format!("p{}", post.id));
    tree.add_class(article, "post");
    if post.id == post.op {
        tree.add_class(article, "post--op");
    }
    if page.is_index_for(post.op) {
        tree.add_class(article, "post--index");
    }
    if post.deleted {
        tree.add_class(article, "deleted");
    }
    if post.closed {
        tree.add_class(article, "closed");
    }

    let header = tree.create_element("header");
    tree.add_class(header, "post-header");
    tree.append_child(article, header);

    if page.is_all() {
        let board = tree.create_element("span");
        tree.add_class(board, "post-board");
        tree.set_inner_text(board, &format!("/{}/", post.board));
        tree.append_child(header, board);
    }

    let name = tree.create_element("b");
    tree.add_class(name, "post-name");
    tree.set_inner_text(name, post.name.as_deref().unwrap_or(ANONYMOUS));
    tree.append_child(header, name);

    let time = tree.create_element("time");
    tree.append_child(header, time);

    let message = tree.create_element("div");
    tree.add_class(message, "post-message");
    tree.append_child(article, message);
    render_body(tree, message, &post.body);

    let backlinks = tree.create_element("span");
    tree.add_class(backlinks, "post-backlinks");
    tree.append_child(article, backlinks);

    let reacts = tree.create_element("div");
    tree.add_class(reacts, "post-reacts");
    tree.append_child(article, reacts);
    let divider = tree.create_element("span");
    tree.add_class(divider, "post-reacts__divider");
    tree.append_child(reacts, divider);

    article
}

/// Build body markup from the markdown event stream. Unhandled
/// container tags are transparent: their children land on the nearest
/// handled ancestor.
pub fn render_body(tree: &mut Tree, parent: NodeId, text: &str) {
    let mut stack: Vec<NodeId> = Vec::new();
    for event in body_events(text) {
        let current = stack.last().copied().unwrap_or(parent);
        match event {
            Event::Start(tag) => match start_tag(tree, &tag) {
                Some((appended, target)) => {
                    tree.append_child(current, appended);
                    stack.push(target);
                }
                None => stack.push(current),
            },
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let node = tree.create_text(&text);
                tree.append_child(current, node);
            }
            Event::Code(code) => {
                let node = tree.create_element("code");
                tree.set_inner_text(node, &code);
                tree.append_child(current, node);
            }
            Event::SoftBreak => {
                let node = tree.create_text(" ");
                tree.append_child(current, node);
            }
            Event::HardBreak => {
                let node = tree.create_element("br");
                tree.append_child(current, node);
            }
            Event::Rule => {
                let node = tree.create_element("hr");
                tree.append_child(current, node);
            }
            // raw HTML in a post body renders as literal text
            Event::Html(html) => {
                let node = tree.create_text(&html);
                tree.append_child(current, node);
            }
            Event::FootnoteReference(_) | Event::TaskListMarker(_) => {}
        }
    }
}

/// Returns (node to append, node receiving the tag's content), or None
/// for tags rendered transparently.
fn start_tag(tree: &mut Tree, tag: &Tag) -> Option<(NodeId, NodeId)> {
    let single = |tree: &mut Tree, name: &str| {
        let node = tree.create_element(name);
        Some((node, node))
    };
    match tag {
        Tag::Paragraph => single(tree, "p"),
        Tag::Heading(level, _, _) => single(tree, heading_tag(*level)),
        Tag::BlockQuote => single(tree, "blockquote"),
        Tag::CodeBlock(_) => {
            let pre = tree.create_element("pre");
            let code = tree.create_element("code");
            tree.append_child(pre, code);
            Some((pre, code))
        }
        Tag::List(Some(_)) => single(tree, "ol"),
        Tag::List(None) => single(tree, "ul"),
        Tag::Item => single(tree, "li"),
        Tag::Emphasis => single(tree, "em"),
        Tag::Strong => single(tree, "strong"),
        Tag::Strikethrough => single(tree, "del"),
        Tag::Link(_, url, title) => {
            let anchor = tree.create_element("a");
            tree.set_attr(anchor, "href", url);
            if !title.is_empty() {
                tree.set_attr(anchor, "title", title);
            }
            if url.starts_with("#p") {
                tree.add_class(anchor, "post-link");
            } else if &**url == EVERYONE_HREF {
                tree.add_class(anchor, "everyone");
            }
            Some((anchor, anchor))
        }
        Tag::Image(_, url, _) => {
            let image = tree.create_element("img");
            tree.set_attr(image, "src", url);
            Some((image, image))
        }
        // tables and footnote definitions render transparently
        _ => None,
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn post(id: u64, body: &str) -> Post {
        Post {
            id,
            op: 1,
            board: "b".to_string(),
            time: 1683000000.0,
            name: None,
            body: body.to_string(),
            links: Vec::new(),
            backlinks: HashMap::new(),
            deleted: false,
            closed: false,
            seen_once: false,
        }
    }

    #[test]
    fn test_render_post_skeleton() {
        let mut tree = Tree::new();
        let page = PageContext::thread_page("b", 1);
        let root = render_post(&mut tree, &page, &post(7, "hello"));

        assert_eq!(tree.attr(root, "id"), Some("p7"));
        assert!(tree.has_class(root, "post"));
        assert!(tree.find_by_class(root, "post-header").is_some());
        assert!(tree.find_by_class(root, "post-message").is_some());
        assert!(tree.find_by_class(root, "post-backlinks").is_some());
        assert!(tree.find_by_class(root, "post-reacts").is_some());
        assert!(tree.find_by_tag(root, "time").is_some());
    }

    #[test]
    fn test_op_and_index_classes() {
        let mut tree = Tree::new();
        let own_thread = PageContext::thread_page("b", 1);
        let op_root = render_post(&mut tree, &own_thread, &post(1, ""));
        assert!(tree.has_class(op_root, "post--op"));
        assert!(!tree.has_class(op_root, "post--index"));

        let board = PageContext::board_page("b");
        let index_root = render_post(&mut tree, &board, &post(2, ""));
        assert!(tree.has_class(index_root, "post--index"));
    }

    #[test]
    fn test_board_label_only_on_all_page() {
        let mut tree = Tree::new();
        let all = PageContext::board_page("all");
        let root = render_post(&mut tree, &all, &post(3, ""));
        let label = tree.find_by_class(root, "post-board").unwrap();
        assert_eq!(tree.text_content(label), "/b/");

        let thread = PageContext::thread_page("b", 1);
        let plain = render_post(&mut tree, &thread, &post(4, ""));
        assert!(tree.find_by_class(plain, "post-board").is_none());
    }

    #[test]
    fn test_body_post_ref_becomes_post_link() {
        let mut tree = Tree::new();
        let page = PageContext::thread_page("b", 1);
        let root = render_post(&mut tree, &page, &post(7, "see >>12 ok"));

        let anchor = tree.find_by_class(root, "post-link").unwrap();
        assert_eq!(tree.attr(anchor, "href"), Some("#p12"));
        assert_eq!(tree.text_content(anchor), ">>12");
    }

    #[test]
    fn test_body_everyone_mention() {
        let mut tree = Tree::new();
        let page = PageContext::thread_page("b", 1);
        let root = render_post(&mut tree, &page, &post(7, "ping @everyone now"));

        let anchor = tree.find_by_class(root, "everyone").unwrap();
        assert_eq!(tree.text_content(anchor), "@everyone");
    }

    #[test]
    fn test_anonymous_name_fallback() {
        let mut tree = Tree::new();
        let page = PageContext::thread_page("b", 1);
        let root = render_post(&mut tree, &page, &post(7, ""));

        let name = tree.find_by_class(root, "post-name").unwrap();
        assert_eq!(tree.text_content(name), ANONYMOUS);
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut first = Tree::new();
        let mut second = Tree::new();
        let page = PageContext::thread_page("b", 1);
        let model = post(9, "some *emphasis* and >>3");

        let a = render_post(&mut first, &page, &model);
        let b = render_post(&mut second, &page, &model);

        assert_eq!(first.to_html(a), second.to_html(b));
    }
}
