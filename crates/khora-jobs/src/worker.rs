// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The thread pool decodes run on.

use crate::error::EngineError;
use crossbeam_channel::Sender;
use khora_core::loading::Task;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// A fixed set of threads pulling decode tasks from a shared queue.
///
/// Unlike the dispatcher, tasks run concurrently and in no particular order.
pub struct DecodeWorkers {
    sender: Mutex<Option<Sender<Task>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl DecodeWorkers {
    /// Starts `threads` workers named `{prefix}-{index}`.
    pub fn spawn(threads: usize, prefix: &str) -> Result<Self, EngineError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();
        let mut handles = Vec::with_capacity(threads);

        for index in 0..threads {
            let name = format!("{prefix}-{index}");
            let receiver = receiver.clone();
            let thread_name = name.clone();
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    for task in receiver.iter() {
                        run_task(&thread_name, task);
                    }
                })
                .map_err(|source| EngineError::Spawn { name, source })?;
            handles.push(handle);
        }

        log::info!("Started {threads} decode worker(s).");
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
        })
    }

    /// Queues a task for the next idle worker.
    pub fn submit(&self, task: Task) -> Result<(), EngineError> {
        let sender = lock(&self.sender);
        let sender = sender.as_ref().ok_or(EngineError::ShutDown("decode workers"))?;
        sender
            .send(task)
            .map_err(|_| EngineError::ShutDown("decode workers"))
    }

    /// Returns the number of running workers.
    pub fn thread_count(&self) -> usize {
        lock(&self.handles).len()
    }

    /// Stops accepting tasks, finishes the queued ones, and joins every worker.
    pub fn shutdown(&self) {
        if lock(&self.sender).take().is_none() {
            return;
        }

        let handles = std::mem::take(&mut *lock(&self.handles));
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("A decode worker terminated abnormally.");
            }
        }
        log::info!("Decode workers stopped.");
    }
}

impl Drop for DecodeWorkers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs `task`, logging instead of unwinding if it panics.
pub(crate) fn run_task(context: &str, task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        log::error!("Task on '{context}' panicked: {}", panic_message(payload.as_ref()));
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_shutdown_finishes_queued_tasks() {
        let workers = DecodeWorkers::spawn(3, "test-worker").unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let done = done.clone();
            workers
                .submit(Box::new(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }
        assert_eq!(workers.thread_count(), 3);
        workers.shutdown();

        assert_eq!(done.load(Ordering::SeqCst), 50);
        assert_eq!(workers.thread_count(), 0);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let workers = DecodeWorkers::spawn(1, "test-closed").unwrap();
        workers.shutdown();

        let result = workers.submit(Box::new(|| {}));
        assert!(matches!(result, Err(EngineError::ShutDown(_))));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = panic::catch_unwind(|| panic!("decoder exploded")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "decoder exploded");

        let payload = panic::catch_unwind(|| panic!("{} items", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "3 items");
    }
}
