//! Runtime abstraction layer for fetch futures
//!
//! Caches never poll their own downloads. They hand the download future to an
//! [`AsyncSpawner`] and pick the outcome up later from a channel on the frame
//! loop, so the same cache code runs on a frame-driven executor (single
//! logical thread, polled once per frame) or on a Tokio runtime.

use futures::future::BoxFuture;

/// A trait for spawning fire-and-forget fetch tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future; its output is delivered through whatever channel it captured.
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>);
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    pub mod frame {
        use super::*;
        use crate::prelude::Mutex;
        use futures::stream::{FuturesUnordered, StreamExt};
        use std::task::{Context, Poll};

        /// Cooperative executor driven by the host's frame callback.
        ///
        /// Spawned futures make progress only inside [`FrameExecutor::run_until_stalled`],
        /// which the frame loop calls once per frame. Nothing here ever blocks.
        #[derive(Default)]
        pub struct FrameExecutor {
            incoming: Mutex<Vec<BoxFuture<'static, ()>>>,
            tasks: Mutex<FuturesUnordered<BoxFuture<'static, ()>>>,
        }

        impl FrameExecutor {
            pub fn new() -> Self {
                Self::default()
            }

            /// Polls every task that can make progress until all of them are
            /// waiting on I/O. Returns how many tasks finished.
            pub fn run_until_stalled(&self) -> usize {
                let Ok(mut tasks) = self.tasks.lock() else {
                    return 0;
                };
                let waker = futures::task::noop_waker();
                let mut cx = Context::from_waker(&waker);
                let mut finished = 0;

                loop {
                    let absorbed = self.absorb_incoming(&mut tasks);
                    match tasks.poll_next_unpin(&mut cx) {
                        Poll::Ready(Some(())) => finished += 1,
                        Poll::Ready(None) | Poll::Pending if absorbed == 0 => break,
                        _ => {}
                    }
                }

                finished
            }

            /// Number of spawned tasks that have not finished yet
            pub fn pending(&self) -> usize {
                let queued = self.incoming.lock().map(|q| q.len()).unwrap_or(0);
                let running = self.tasks.lock().map(|t| t.len()).unwrap_or(0);
                queued + running
            }

            fn absorb_incoming(&self, tasks: &mut FuturesUnordered<BoxFuture<'static, ()>>) -> usize {
                let Ok(mut incoming) = self.incoming.lock() else {
                    return 0;
                };
                let count = incoming.len();
                for future in incoming.drain(..) {
                    tasks.push(future);
                }
                count
            }
        }

        impl AsyncSpawner for FrameExecutor {
            fn spawn_boxed(&self, future: BoxFuture<'static, ()>) {
                if let Ok(mut incoming) = self.incoming.lock() {
                    incoming.push(future);
                }
            }
        }
    }

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::Handle;

        /// Tokio-based async spawner. Fetches run on the runtime's worker
        /// threads; their completions still reach the caches only through the
        /// frame loop's channel drain.
        pub struct TokioSpawner {
            handle: Handle,
        }

        impl TokioSpawner {
            pub fn new(handle: Handle) -> Self {
                Self { handle }
            }

            /// Spawner bound to the runtime the caller is running in.
            ///
            /// Panics outside of a Tokio runtime, like `Handle::current`.
            pub fn current() -> Self {
                Self::new(Handle::current())
            }
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxFuture<'static, ()>) {
                // The JoinHandle is dropped on purpose: disposal, not abort, cancels a fetch.
                drop(self.handle.spawn(future));
            }
        }
    }
}

pub use spawners::frame::FrameExecutor;
#[cfg(feature = "tokio-runtime")]
pub use spawners::tokio_impl::TokioSpawner;
