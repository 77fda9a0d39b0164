// Static page output: wraps serialized tree HTML in a full document
// shell and writes it to disk. Used by the replay client; the browser
// build gets its documents from the server instead.

use axohtml::{dom::DOMTree, html, text, unsafe_text};
use serde_json::to_string_pretty;
use std::{io, path::PathBuf};
use tavern_msg::Message;
use tokio::fs::write;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to write to file: {0}")]
    WriteFile(#[source] io::Error),
    #[error("Failed to serialize JSON to string: {0}")]
    JsonToString(#[source] serde_json::Error),
}

pub struct Config {
    pub base_dir: PathBuf,
}

pub fn render_page(title: &str, body_html: &str) -> DOMTree<String> {
    html!(
        <html>
            <head>
                <title>{ text!("{}", title) }</title>
            </head>
            <body>
                <main id="threads">
                    { unsafe_text!(body_html) }
                </main>
            </body>
        </html>
    )
}

pub async fn write_page_html(
    config: &Config,
    name: &str,
    title: &str,
    body_html: &str,
) -> Result<(), Error> {
    let Config { base_dir } = config;
    let page_path = base_dir.join(name).with_extension("html");
    let page_html = render_page(title, body_html);
    let page_bytes = page_html.to_string();

    write(page_path, page_bytes)
        .await
        .map_err(Error::WriteFile)?;

    Ok(())
}

pub async fn write_frame_json(
    config: &Config,
    name: &str,
    frames: &[Message],
) -> Result<(), Error> {
    let Config { base_dir } = config;
    let json_path = base_dir.join(name).with_extension("json");
    let frames_json = to_string_pretty(frames).map_err(Error::JsonToString)?;

    write(json_path, frames_json)
        .await
        .map_err(Error::WriteFile)?;

    Ok(())
}
