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

//! Concrete [`Dispatcher`] implementations.

use crate::error::EngineError;
use crate::worker::run_task;
use crossbeam_channel::Sender;
use khora_core::loading::{Dispatcher, Task};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};

/// Default name of the delivery thread.
pub const DEFAULT_DISPATCHER_THREAD: &str = "khora-dispatch";

/// A dispatcher backed by one dedicated background thread.
///
/// Tasks run in posting order. A panicking task is logged and does not stop
/// the thread. Dropping the dispatcher runs the remaining queued tasks and
/// joins the thread.
pub struct ThreadDispatcher {
    name: String,
    sender: Mutex<Option<Sender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadDispatcher {
    /// Starts the delivery thread under the given name.
    pub fn spawn(name: impl Into<String>) -> Result<Self, EngineError> {
        let name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();

        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                log::info!("Dispatcher thread '{thread_name}' started.");
                for task in receiver.iter() {
                    run_task(&thread_name, task);
                }
                log::info!("Dispatcher thread '{thread_name}' stopped.");
            })
            .map_err(|source| EngineError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// The name of the delivery thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when called from the delivery thread.
    pub fn is_dispatch_thread(&self) -> bool {
        lock(&self.handle)
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        lock(&self.sender).is_none()
    }

    /// Stops accepting tasks, runs the queued ones, and joins the thread.
    ///
    /// Called from a task on the delivery thread, it only stops accepting
    /// tasks; the thread exits once the queue is drained.
    pub fn shutdown(&self) {
        let Some(sender) = lock(&self.sender).take() else {
            return;
        };
        drop(sender);

        if self.is_dispatch_thread() {
            return;
        }
        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                log::error!("Dispatcher thread '{}' terminated abnormally.", self.name);
            }
        }
    }
}

impl Dispatcher for ThreadDispatcher {
    fn post(&self, task: Task) {
        match lock(&self.sender).as_ref() {
            Some(sender) => {
                if let Err(e) = sender.send(task) {
                    log::error!("Failed to post to dispatcher '{}': {e}", self.name);
                }
            }
            None => log::error!(
                "Dispatcher '{}' is shut down, dropping posted task.",
                self.name
            ),
        }
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A dispatcher whose queue is pumped explicitly by its owner.
///
/// Posting never runs anything. Tasks run, in posting order, on whichever
/// thread calls [`run_pending`](Self::run_pending). Useful to drive delivery
/// deterministically, or from an existing loop.
#[derive(Debug)]
pub struct ManualDispatcher {
    sender: flume::Sender<Task>,
    receiver: flume::Receiver<Task>,
    pumping: Mutex<()>,
}

impl ManualDispatcher {
    /// Creates a dispatcher with an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            pumping: Mutex::new(()),
        }
    }

    /// Returns the number of queued tasks.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Runs queued tasks until the queue is empty, including tasks posted by
    /// the tasks being run. Returns how many ran.
    ///
    /// Returns 0 without running anything if another call is already pumping,
    /// so tasks never run concurrently.
    pub fn run_pending(&self) -> usize {
        let _pumping = match self.pumping.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return 0,
        };

        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            run_task("manual", task);
            ran += 1;
        }
        ran
    }
}

impl Default for ManualDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for ManualDispatcher {
    fn post(&self, task: Task) {
        // The receiver lives in `self`, so this cannot disconnect.
        if let Err(e) = self.sender.send(task) {
            log::error!("Failed to queue task: {e}");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
