// Replay client: feeds a newline-delimited JSON frame log through a
// headless session and writes the resulting page, the same pipeline
// the browser build runs against a live connection.

use std::path::PathBuf;

use clap::Parser;
use progress_bar::*;
use tavern_model::PageContext;
use tavern_msg::decode_frame;
use tavern_pages::{write_frame_json, write_page_html, Config};
use tavern_sync::{Dispatcher, Headless, RecordedConnection, Session, SyncError};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
enum ClientError {
    #[error("Failed to read frame log, cause: {0}")]
    ReadFrames(#[source] std::io::Error),
    #[error("Failed to create output dir, cause: {0}")]
    CreateOutDir(#[source] std::io::Error),
    #[error("Failed to decode frame, cause: {0}")]
    Decode(#[from] tavern_msg::MsgError),
    #[error("Sync error, cause: {0}")]
    Sync(#[from] SyncError),
    #[error("Failed to write page, cause: {0}")]
    Pages(#[from] tavern_pages::Error),
}

#[derive(Debug, Parser)]
struct Args {
    /// Path to the newline-delimited JSON frame log
    frames: PathBuf,
    /// Board the session is on
    #[arg(long, default_value = "b")]
    board: String,
    /// Thread id for a thread page; omit for a board page
    #[arg(long)]
    thread: Option<u64>,
    /// Output directory for the rendered page
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.frames).map_err(ClientError::ReadFrames)?;
    let frames = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| decode_frame(line.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;

    let page = match args.thread {
        Some(op) => PageContext::thread_page(&args.board, op),
        None => PageContext::board_page(&args.board),
    };
    let mut session = Session::new(page, Headless::default(), RecordedConnection::default());
    session.init_container(args.thread);
    let mut dispatcher = Dispatcher::init();

    std::fs::create_dir_all(&args.out_dir).map_err(ClientError::CreateOutDir)?;
    let config = Config {
        base_dir: args.out_dir.clone(),
    };
    write_frame_json(&config, "frames", &frames).await?;

    init_progress_bar(frames.len());
    set_progress_bar_action("Replaying", Color::Blue, Style::Bold);
    for frame in frames {
        dispatcher.dispatch(&mut session, frame)?;
        inc_progress_bar();
    }
    finalize_progress_bar();

    session.run_deferred();

    let title = match args.thread {
        Some(op) => format!("/{}/ - thread {}", args.board, op),
        None => format!("/{}/", args.board),
    };
    let body = session.tree.to_html(session.root);
    write_page_html(&config, "index", &title, &body).await?;

    println!("Replayed {} posts. Done!", session.store.len());
    Ok(())
}
