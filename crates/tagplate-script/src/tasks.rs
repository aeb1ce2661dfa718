//! Promises started while a script runs.
//!
//! A promise starts as soon as it is created: its future is polled once on
//! the spot, so everything up to its first suspension happens in program
//! order. The rest is handed to the run that created it. [`drive`] polls
//! those promises alongside the script and does not finish until every one
//! of them has settled, awaited or not.

use std::cell::RefCell;
use std::future::{poll_fn, Future};
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_util::future::LocalBoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::task::noop_waker_ref;
use futures_util::{FutureExt, StreamExt};

use crate::value::Promise;

type Task = LocalBoxFuture<'static, ()>;

/// Tasks spawned by the run being polled but not yet picked up by it.
#[derive(Clone, Default)]
struct Queue(Rc<RefCell<Vec<Task>>>);

impl Queue {
    fn push(&self, task: Task) {
        self.0.borrow_mut().push(task);
    }

    fn take(&self) -> Vec<Task> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Queue>> = const { RefCell::new(None) };
}

/// Marks a queue as current for the duration of one poll.
struct Enter {
    previous: Option<Queue>,
}

impl Enter {
    fn new(queue: &Queue) -> Self {
        let previous = CURRENT.with(|current| current.replace(Some(queue.clone())));
        Enter { previous }
    }
}

impl Drop for Enter {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Start a promise: poll it once now, then leave the rest to the current
/// run. Outside a run the remainder only progresses when awaited.
pub(crate) fn start(promise: &Promise) {
    let mut cx = Context::from_waker(noop_waker_ref());
    if promise.clone().poll_unpin(&mut cx).is_ready() {
        return;
    }

    let task = promise
        .clone()
        .map(|result| {
            if let Err(err) = result {
                log::debug!("promise rejected: {err}");
            }
        })
        .boxed_local();
    CURRENT.with(|current| {
        if let Some(queue) = current.borrow().as_ref() {
            queue.push(task);
        }
    });
}

/// Poll `main` together with every promise it starts. Resolves to the
/// output of `main` once it and all of its promises have settled.
pub async fn drive<F: Future>(main: F) -> F::Output {
    let queue = Queue::default();
    let mut running = FuturesUnordered::new();
    let mut main = pin!(main);
    let mut output = None;

    poll_fn(|cx| {
        let _enter = Enter::new(&queue);
        if output.is_none() {
            if let Poll::Ready(value) = main.as_mut().poll(cx) {
                output = Some(value);
            }
        }
        if poll_running(&queue, &mut running, cx).is_pending() {
            return Poll::Pending;
        }
        match output.take() {
            Some(value) => Poll::Ready(value),
            None => Poll::Pending,
        }
    })
    .await
}

fn poll_running(queue: &Queue, running: &mut FuturesUnordered<Task>, cx: &mut Context<'_>) -> Poll<()> {
    loop {
        running.extend(queue.take());
        let polled = running.poll_next_unpin(cx);
        if !queue.is_empty() {
            continue;
        }
        match polled {
            Poll::Ready(Some(())) => continue,
            Poll::Ready(None) => return Poll::Ready(()),
            Poll::Pending => return Poll::Pending,
        }
    }
}
