use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    mpsc, Arc, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
};
use std::thread;

use serde::Serialize;
use tracing::{debug, error};

#[cfg(target_os = "linux")]
fn gettid() -> i32 {
    // SAFETY: direct syscall; returns thread id (TID) on Linux
    unsafe { libc::syscall(libc::SYS_gettid) as i32 }
}
#[cfg(not(target_os = "linux"))]
fn gettid() -> i32 {
    std::process::id() as i32
}

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

struct WorkerInfo {
    tid: AtomicI32,
    busy: AtomicBool,
    name: String,
}

struct ThreadPoolInner {
    name: String,
    sender: Mutex<mpsc::Sender<Message>>,
    workers: Mutex<Vec<Option<thread::JoinHandle<()>>>>,
    infos: Vec<Arc<WorkerInfo>>,
    active_workers: Arc<AtomicUsize>,
}

/// Fixed-size pool of named worker threads fed through a channel.
///
/// Cloning is cheap; the threads are joined when the last clone drops.
#[derive(Clone)]
pub struct ThreadPool {
    inner: Arc<ThreadPoolInner>,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub pid: i32,
    pub state: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct PoolSnapshot {
    pub name: String,
    pub total: usize,
    pub active: usize,
    pub workers: Vec<WorkerSnapshot>,
}

impl Drop for ThreadPoolInner {
    fn drop(&mut self) {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);

        {
            let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            for _ in 0..workers.len() {
                let _ = sender.send(Message::Shutdown);
            }
        }

        for handle in workers.iter_mut().filter_map(Option::take) {
            let _ = handle.join();
        }
        debug!(pool = %self.name, "thread pool shut down");
    }
}

impl ThreadPool {
    pub fn new(name: &str, size: usize) -> Self {
        assert!(size > 0, "ThreadPool '{}' must have at least one worker", name);

        let (tx, rx) = mpsc::channel::<Message>();
        let receiver = Arc::new(Mutex::new(rx));
        let active_workers = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(size);
        let mut infos = Vec::with_capacity(size);

        for idx in 0..size {
            let thread_name = format!("{}-worker-{}", name, idx);
            let info = Arc::new(WorkerInfo {
                tid: AtomicI32::new(0),
                busy: AtomicBool::new(false),
                name: thread_name.clone(),
            });
            infos.push(Arc::clone(&info));

            let rx = Arc::clone(&receiver);
            let active = Arc::clone(&active_workers);

            let handle = thread::Builder::new()
                .name(thread_name)
                .spawn(move || worker_loop(&rx, &info, &active))
                .expect("Failed to spawn worker thread");

            workers.push(Some(handle));
        }

        debug!(pool = name, size, "thread pool started");

        ThreadPool {
            inner: Arc::new(ThreadPoolInner {
                name: name.to_string(),
                sender: Mutex::new(tx),
                workers: Mutex::new(workers),
                infos,
                active_workers,
            }),
        }
    }

    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = sender.send(Message::Run(Box::new(job))) {
            error!(pool = %self.inner.name, error = %err, "worker channel closed, job dropped");
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn total_workers(&self) -> usize {
        self.inner.infos.len()
    }

    pub fn active_workers(&self) -> usize {
        self.inner.active_workers.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            name: self.name().to_string(),
            total: self.total_workers(),
            active: self.active_workers(),
            workers: self
                .inner
                .infos
                .iter()
                .map(|info| WorkerSnapshot {
                    name: info.name.clone(),
                    pid: info.tid.load(Ordering::SeqCst),
                    state: if info.busy.load(Ordering::SeqCst) { "busy" } else { "idle" },
                })
                .collect(),
        }
    }
}

fn worker_loop(rx: &Mutex<mpsc::Receiver<Message>>, info: &WorkerInfo, active: &AtomicUsize) {
    info.tid.store(gettid(), Ordering::SeqCst);

    loop {
        let message = {
            let guard = rx.lock().unwrap_or_else(PoisonError::into_inner);
            guard.recv()
        };

        match message {
            Ok(Message::Run(job)) => {
                info.busy.store(true, Ordering::SeqCst);
                active.fetch_add(1, Ordering::SeqCst);

                // a panicking job must not take the worker down with it
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(worker = %info.name, "job panicked");
                }

                active.fetch_sub(1, Ordering::SeqCst);
                info.busy.store(false, Ordering::SeqCst);
            }
            Ok(Message::Shutdown) | Err(_) => {
                info.busy.store(false, Ordering::SeqCst);
                break;
            }
        }
    }
}
