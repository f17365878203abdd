use crate::{Error, Result};
use std::thread::{self, JoinHandle};

/// A unit of work that can be handed to a [`WorkerGroup`].
///
/// Implemented for every `FnOnce() -> T` closure, so most callers never name
/// it. Implement it directly for work that carries its own state.
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    fn execute(self) -> Self::Output;
}

impl<F, T> Task for F
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn execute(self) -> T {
        self()
    }
}

/// A set of named worker threads, one per submitted task.
///
/// [`join_all`](Self::join_all) is the barrier: it blocks until every worker
/// has finished and returns their outputs in submission order.
///
/// # Examples
/// ```
/// use contention::{GuardedCounter, WorkerGroup};
/// use std::sync::Arc;
///
/// let counter = Arc::new(GuardedCounter::new());
/// let mut workers = WorkerGroup::new("incr");
/// for _ in 0..4 {
///     let counter = counter.clone();
///     workers.spawn(move || (0..100).for_each(|_| counter.increment())).unwrap();
/// }
/// workers.join_all().unwrap();
/// assert_eq!(counter.get(), 400);
/// ```
pub struct WorkerGroup<T> {
    prefix: String,
    handles: Vec<(String, JoinHandle<T>)>,
}

impl<T: Send + 'static> WorkerGroup<T> {
    /// Creates an empty group; workers are named `{prefix}-{index}`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            handles: Vec::new(),
        }
    }

    /// Starts `task` on a new thread.
    pub fn spawn<W>(&mut self, task: W) -> Result<()>
    where
        W: Task<Output = T>,
    {
        let name = format!("{}-{}", self.prefix, self.handles.len());
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || task.execute())
            .map_err(|err| Error::Spawn {
                name: name.clone(),
                reason: err.to_string(),
            })?;
        tracing::debug!(worker = %name, "worker spawned");
        self.handles.push((name, handle));
        Ok(())
    }

    /// Starts one worker per task.
    pub fn spawn_all<I>(&mut self, tasks: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Task<Output = T>,
    {
        for task in tasks {
            self.spawn(task)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker and collects their outputs in spawn order.
    ///
    /// All workers are joined even if one of them panicked; the first panic is
    /// then reported as `Err(Error::WorkerPanicked { .. })`.
    pub fn join_all(self) -> Result<Vec<T>> {
        let mut outputs = Vec::with_capacity(self.handles.len());
        let mut first_panic = None;
        for (name, handle) in self.handles {
            match handle.join() {
                Ok(output) => outputs.push(output),
                Err(_) => {
                    tracing::warn!(worker = %name, "worker panicked");
                    first_panic.get_or_insert(name);
                }
            }
        }
        match first_panic {
            Some(name) => Err(Error::WorkerPanicked { name }),
            None => Ok(outputs),
        }
    }
}

/// Runs every task on its own thread and waits for all of them.
pub fn run_all<I>(prefix: &str, tasks: I) -> Result<Vec<<I::Item as Task>::Output>>
where
    I: IntoIterator,
    I::Item: Task,
{
    let mut group = WorkerGroup::new(prefix);
    group.spawn_all(tasks)?;
    group.join_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuardedCounter;
    use std::sync::Arc;

    struct Named(&'static str);

    impl Task for Named {
        type Output = String;

        fn execute(self) -> String {
            format!(
                "{} on {}",
                self.0,
                thread::current().name().unwrap_or_default()
            )
        }
    }

    #[test]
    fn test_outputs_in_spawn_order() {
        let outputs = run_all("sq", (0..8u64).map(|i| move || i * i)).unwrap();
        assert_eq!(outputs, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn test_task_impl_and_names() {
        let mut group = WorkerGroup::new("job");
        assert!(group.is_empty());
        group.spawn(Named("a")).unwrap();
        group.spawn(Named("b")).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(
            group.join_all().unwrap(),
            vec!["a on job-0".to_string(), "b on job-1".to_string()]
        );
    }

    #[test]
    fn test_panicked_worker_reported_after_all_joined() {
        let counter = Arc::new(GuardedCounter::new());
        let mut group = WorkerGroup::new("mixed");
        for i in 0..4 {
            let counter = counter.clone();
            group
                .spawn(move || {
                    if i == 1 {
                        panic!("worker failure");
                    }
                    counter.increment();
                })
                .unwrap();
        }
        assert_eq!(
            group.join_all(),
            Err(Error::WorkerPanicked {
                name: "mixed-1".to_string()
            })
        );
        assert_eq!(counter.get(), 3);
    }
}
