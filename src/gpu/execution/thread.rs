use std::thread::JoinHandle;

use flume::{Receiver, Sender};

use crate::gpu::cmd::{CommandList, Executable};
use crate::gpu::error::{GpuError, ReplayFault};
use crate::gpu::Backend;
use crate::ir::{CommandExecutor, ReplayStats};

enum WorkItem<B: Backend, E> {
    Execute {
        list: CommandList<B, Executable>,
        done: Sender<Completion<B>>,
    },
    Run(Box<dyn FnOnce(&mut E) + Send>),
    Terminate,
}

/// A list handed back by the execution thread once it has been replayed.
pub struct Completion<B: Backend> {
    pub list: CommandList<B, Executable>,
    pub result: Result<ReplayStats, ReplayFault>,
}

/// Pending result of [`ExecutionThread::submit`].
pub struct Submission<B: Backend> {
    done: Receiver<Completion<B>>,
}

impl<B: Backend> Submission<B> {
    /// Blocks until the list has been replayed.
    pub fn wait(self) -> Result<Completion<B>, GpuError> {
        self.done
            .recv()
            .map_err(|_| GpuError::Backend("execution thread dropped a submission".to_string()))
    }
}

/// Dedicated thread owning the executor of a backend whose native context
/// must only be used from one thread.
///
/// Lists are recorded anywhere and moved here for replay; work items run
/// strictly in submission order. Dropping the handle drains queued work and
/// joins the thread.
pub struct ExecutionThread<B: Backend, E> {
    name: String,
    queue: Sender<WorkItem<B, E>>,
    handle: Option<JoinHandle<E>>,
}

impl<B, E> ExecutionThread<B, E>
where
    B: Backend,
    E: CommandExecutor<B> + Send + 'static,
{
    pub fn spawn(name: &str, executor: E) -> Result<Self, GpuError> {
        let (queue, work) = flume::unbounded();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || work_loop(executor, work))
            .map_err(|e| GpuError::Backend(format!("failed to spawn {}: {}", name, e)))?;

        log::debug!("execution thread '{}' started", name);
        Ok(Self {
            name: name.to_string(),
            queue,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `list` for replay.
    pub fn submit(&self, list: CommandList<B, Executable>) -> Result<Submission<B>, GpuError> {
        let (done, receiver) = flume::bounded(1);
        self.queue
            .send(WorkItem::Execute { list, done })
            .map_err(|_| self.stopped())?;
        Ok(Submission { done: receiver })
    }

    /// Runs `f` against the executor on the execution thread and waits for
    /// its result.
    pub fn run<R, F>(&self, f: F) -> Result<R, GpuError>
    where
        R: Send + 'static,
        F: FnOnce(&mut E) -> R + Send + 'static,
    {
        let (reply, result) = flume::bounded(1);
        self.queue
            .send(WorkItem::Run(Box::new(move |executor: &mut E| {
                let _ = reply.send(f(executor));
            })))
            .map_err(|_| self.stopped())?;
        result.recv().map_err(|_| self.stopped())
    }

    /// Returns once everything queued before the call has executed.
    pub fn wait_idle(&self) -> Result<(), GpuError> {
        self.run(|_| ())
    }

    /// Stops the thread after queued work and hands back the executor.
    pub fn shutdown(mut self) -> Result<E, GpuError> {
        let handle = self.handle.take().ok_or_else(|| self.stopped())?;
        let _ = self.queue.send(WorkItem::Terminate);
        handle
            .join()
            .map_err(|_| GpuError::Backend(format!("{} panicked", self.name)))
    }

    fn stopped(&self) -> GpuError {
        GpuError::Backend(format!("{} has stopped", self.name))
    }
}

impl<B: Backend, E> Drop for ExecutionThread<B, E> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.queue.send(WorkItem::Terminate);
            if handle.join().is_err() {
                log::error!("execution thread '{}' panicked", self.name);
            }
        }
    }
}

fn work_loop<B, E>(mut executor: E, work: Receiver<WorkItem<B, E>>) -> E
where
    B: Backend,
    E: CommandExecutor<B>,
{
    while let Ok(item) = work.recv() {
        match item {
            WorkItem::Execute { list, done } => {
                let result = list.execute(&mut executor);
                // Nobody waiting: the list drops here and frees its blocks.
                let _ = done.send(Completion { list, result });
            }
            WorkItem::Run(f) => f(&mut executor),
            WorkItem::Terminate => break,
        }
    }
    executor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::Headless;
    use crate::ir::{RecordedCall, RecordingExecutor};
    use crate::utils::StagingMemoryPool;

    #[test]
    fn lists_execute_in_submission_order() {
        let pool = StagingMemoryPool::default().into_shared();
        let thread =
            ExecutionThread::spawn("test-exec", RecordingExecutor::<Headless>::new()).unwrap();

        let mut pending = Vec::new();
        for i in 0..3u32 {
            let mut list = CommandList::<Headless>::new(pool.clone(), 128).begin();
            list.dispatch(i, 1, 1);
            pending.push(thread.submit(list.end()).unwrap());
        }
        for p in pending {
            let done = p.wait().unwrap();
            assert_eq!(done.result.unwrap().entries, 3);
            done.list.reset();
        }

        let executor = thread.shutdown().unwrap();
        let dispatches: Vec<u32> = executor
            .calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Dispatch(x, _, _) => Some(*x),
                _ => None,
            })
            .collect();
        assert_eq!(dispatches, vec![0, 1, 2]);
        assert_eq!(pool.lock().rented_count(), 0);
    }

    #[test]
    fn run_reaches_the_executor() {
        let thread =
            ExecutionThread::spawn("test-run", RecordingExecutor::<Headless>::new()).unwrap();
        let on_thread = thread
            .run(|_| std::thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(on_thread.as_deref(), Some("test-run"));
        assert_eq!(thread.run(|ex| ex.calls.len()).unwrap(), 0);
    }
}
