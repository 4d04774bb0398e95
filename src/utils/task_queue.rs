//! Single-worker task queue.
//!
//! Tasks run one at a time, in submission order, on a dedicated thread.
//! This is what serializes tree rebuilds and database rebuilds.

use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::{error, trace};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Flush(Sender<()>),
}

pub struct TaskQueue {
    name: String,
    sender: Mutex<Option<Sender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueue {
    pub fn new(name: &str) -> Self {
        let (tx, rx) = mpsc::channel::<Message>();
        let thread_name = name.to_string();
        let worker = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                for message in rx {
                    match message {
                        Message::Run(job) => {
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                error!(queue = %thread_name, "task panicked");
                            }
                        }
                        Message::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                trace!(queue = %thread_name, "task queue stopped");
            })
            .ok();
        if worker.is_none() {
            error!(queue = %name, "cannot spawn worker thread");
        }

        Self {
            name: name.to_string(),
            sender: Mutex::new(worker.as_ref().map(|_| tx)),
            worker: Mutex::new(worker),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue `job`. Dropped silently after shutdown.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(Message::Run(Box::new(job)));
        }
    }

    /// Block until every task posted before this call has finished.
    ///
    /// Must not be called from a task running on this queue.
    pub fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        let sent = match self.sender.lock().as_ref() {
            Some(sender) => sender.send(Message::Flush(tx)).is_ok(),
            None => false,
        };
        if sent {
            let _ = rx.recv();
        }
    }

    /// Stop accepting tasks and wait for the worker to drain.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_tasks_in_order() {
        let queue = TaskQueue::new("test-queue");
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let log = Arc::clone(&log);
            queue.post(move || log.lock().push(i));
        }
        queue.flush();
        assert_eq!(*log.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_task_does_not_stop_the_queue() {
        let queue = TaskQueue::new("test-panic");
        let counter = Arc::new(AtomicUsize::new(0));
        queue.post(|| panic!("boom"));
        let c = Arc::clone(&counter);
        queue.post(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        queue.flush();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn post_after_shutdown_is_ignored() {
        let queue = TaskQueue::new("test-shutdown");
        queue.shutdown();
        queue.post(|| panic!("must not run"));
        queue.flush();
    }
}
