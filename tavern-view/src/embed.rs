// Media embed expansion. Anchors pointing at known providers get
// tagged so the theme layer can expand them in place. This runs as a
// deferred task after insertion; posts are visible and interactive
// before it resolves.

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use tavern_dom::{NodeId, Tree};

lazy_static! {
    static ref PROVIDERS: [(&'static str, Regex); 3] = [
        (
            "youtube",
            Regex::new(r"^https?://(?:www\.)?(?:youtube\.com/watch\?|youtu\.be/)").unwrap(),
        ),
        (
            "vimeo",
            Regex::new(r"^https?://(?:www\.)?vimeo\.com/\d+").unwrap(),
        ),
        (
            "coub",
            Regex::new(r"^https?://(?:www\.)?coub\.com/view/").unwrap(),
        ),
    ];
}

pub fn render_embeds(tree: &mut Tree, root: NodeId) {
    let anchors: Vec<(NodeId, String)> = tree
        .find_all_by_tag(root, "a")
        .into_iter()
        .filter_map(|anchor| {
            tree.attr(anchor, "href")
                .map(|href| (anchor, href.to_string()))
        })
        .collect();

    for (anchor, href) in anchors {
        for (provider, regex) in PROVIDERS.iter() {
            if regex.is_match(&href) {
                trace!("tagging {} embed on {:?}", provider, anchor);
                tree.add_class(anchor, "embed");
                tree.set_data(anchor, "provider", provider);
                break;
            }
        }
    }
}
