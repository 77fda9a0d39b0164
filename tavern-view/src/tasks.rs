// Deferred client-only work, keyed by the node it will mutate. Tasks
// run on the next scheduler tick, after the dispatching handler has
// returned; nothing in the insertion path blocks on them. A task whose
// node has been detached in the meantime must become a no-op.

use std::collections::VecDeque;

use log::trace;
use tavern_dom::{NodeId, Tree};

use crate::{embed, smile_line_offset, CLASS_REACT_MAXIMIZED, CLASS_REACT_MINIMIZED};

#[derive(Clone, Copy, Debug)]
pub enum Task {
    SmileOffset(NodeId),
    ClearReactAnim(NodeId),
    RenderEmbeds(NodeId),
}

impl Task {
    pub fn node(&self) -> NodeId {
        match *self {
            Task::SmileOffset(node) | Task::ClearReactAnim(node) | Task::RenderEmbeds(node) => {
                node
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Drain the queue in FIFO order on the calling thread.
pub fn run_pending(tree: &mut Tree, tasks: &mut TaskQueue) {
    while let Some(task) = tasks.pop() {
        if tree.is_detached(task.node()) {
            trace!("dropping {:?}, node is detached", task);
            continue;
        }
        match task {
            Task::SmileOffset(node) => smile_line_offset(tree, node),
            Task::ClearReactAnim(node) => {
                tree.remove_class(node, CLASS_REACT_MINIMIZED);
                tree.remove_class(node, CLASS_REACT_MAXIMIZED);
            }
            Task::RenderEmbeds(node) => embed::render_embeds(tree, node),
        }
    }
}
