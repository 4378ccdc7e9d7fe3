use std::{
    cmp::Ordering as CmpOrdering,
    collections::HashMap,
    fmt::Debug,
    num::NonZeroUsize,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use common::{take_ordered, Collection, Data, Engine, Error, Key, Result};
use dashmap::DashMap;
use futures::future::try_join_all;
use itertools::Itertools;
use log::{debug, info};
use tokio::{fs, runtime::Runtime, sync::Mutex, time};
use uuid::Uuid;

use crate::{shuffle, Queue};

const POLL_INTERVAL: Duration = Duration::from_millis(2);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Concurrent workers, and runtime threads.
    pub workers: usize,
    /// Reduce buckets of every keyed stage.
    pub n_reduce: usize,
    /// A task running longer than this is presumed lost and re-queued.
    pub task_timeout: Duration,
    /// Attempts per task before the stage fails.
    pub max_attempts: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
            n_reduce: 10,
            task_timeout: Duration::from_secs(5),
            max_attempts: 4,
        }
    }
}

/// An in-process cluster: a pool of workers draining a queue of partition
/// tasks on a dedicated tokio runtime.
///
/// Lost tasks (panicked or timed out) are re-executed; an error returned by
/// the task itself fails the stage at once.
pub struct LocalCluster {
    config: ClusterConfig,
    runtime: Runtime,
}

type TaskFn<I, O> = Arc<dyn Fn(&I) -> Result<O> + Send + Sync>;

#[derive(Debug, Clone)]
struct Task {
    id: String,
    index: usize,
    attempt: usize,
}

impl Task {
    fn new(index: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            index,
            attempt: 1,
        }
    }

    fn retry(self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            index: self.index,
            attempt: self.attempt + 1,
        }
    }
}

struct Stage<I, O> {
    name: String,
    inputs: Vec<I>,
    f: TaskFn<I, O>,
    pending: Queue<Task>,
    results: DashMap<usize, O>,
    failed: AtomicBool,
    failure: Mutex<Option<Error>>,
}

impl<I, O> Stage<I, O> {
    fn is_over(&self) -> bool {
        self.failed.load(Ordering::Acquire) || self.results.len() == self.inputs.len()
    }

    async fn fail(&self, err: Error) {
        let mut failure = self.failure.lock().await;
        if failure.is_none() {
            info!("stage {} failed: {}", self.name, err);
            *failure = Some(err);
        }
        self.failed.store(true, Ordering::Release);
    }

    async fn retry(&self, task: Task, max_attempts: usize) {
        if task.attempt >= max_attempts {
            let err = Error::engine(format!(
                "stage {} task {} lost after {} attempts",
                self.name, task.index, task.attempt
            ));
            self.fail(err).await;
            return;
        }
        let task = task.retry();
        info!("retry task: {:?}", task);
        if !self.pending.push(task) {
            self.fail(Error::engine("task queue overflow")).await;
        }
    }
}

async fn worker<I, O>(stage: Arc<Stage<I, O>>, config: ClusterConfig)
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    while !stage.is_over() {
        let task = match stage.pending.pop() {
            Some(task) => task,
            None => {
                time::sleep(POLL_INTERVAL).await;
                continue;
            }
        };
        debug!("stage {} task: {:?}", stage.name, task);

        let handle = {
            let stage = Arc::clone(&stage);
            let index = task.index;
            tokio::task::spawn_blocking(move || (stage.f)(&stage.inputs[index]))
        };

        match time::timeout(config.task_timeout, handle).await {
            Ok(Ok(Ok(output))) => {
                stage.results.entry(task.index).or_insert(output);
                debug!("task done: {:?}", task);
            }
            Ok(Ok(Err(err))) => stage.fail(err).await,
            Ok(Err(join_err)) => {
                info!("task crashed: {:?}: {}", task, join_err);
                stage.retry(task, config.max_attempts).await;
            }
            Err(_) => {
                info!("task timeout: {:?}", task);
                stage.retry(task, config.max_attempts).await;
            }
        }
    }
}

impl LocalCluster {
    pub fn start(config: ClusterConfig) -> Result<Self> {
        if config.workers == 0 || config.n_reduce == 0 || config.max_attempts == 0 {
            return Err(Error::config(format!(
                "workers, n_reduce and max_attempts must be positive: {:?}",
                config
            )));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.workers)
            .thread_name("cluster-worker")
            .enable_all()
            .build()?;
        info!("cluster started: {:?}", config);
        Ok(Self { config, runtime })
    }

    /// Stops the runtime. Tasks abandoned after a timeout get a short grace
    /// period and are then left behind.
    pub fn shutdown(self) {
        self.runtime.shutdown_timeout(SHUTDOWN_GRACE);
        info!("cluster shut down");
    }

    fn run_stage<I, O>(&self, name: &str, inputs: Vec<I>, f: TaskFn<I, O>) -> Result<Vec<O>>
    where
        I: Send + Sync + 'static,
        O: Send + Sync + 'static,
    {
        let n_tasks = inputs.len();
        if n_tasks == 0 {
            return Ok(Vec::new());
        }
        info!("stage {}: {} tasks", name, n_tasks);

        let stage = Arc::new(Stage {
            name: name.to_owned(),
            inputs,
            f,
            pending: Queue::new(n_tasks),
            results: DashMap::new(),
            failed: AtomicBool::new(false),
            failure: Mutex::new(None),
        });
        for index in 0..n_tasks {
            stage.pending.push(Task::new(index));
        }

        let workers = self.config.workers.min(n_tasks);
        self.runtime.block_on(async {
            let handles = (0..workers)
                .map(|_| tokio::spawn(worker(Arc::clone(&stage), self.config.clone())))
                .collect_vec();
            try_join_all(handles).await
        })
        .map_err(|e| Error::engine(format!("stage {} worker crashed: {}", name, e)))?;

        if let Some(err) = stage.failure.try_lock().ok().and_then(|mut f| f.take()) {
            return Err(err);
        }
        (0..n_tasks)
            .map(|index| {
                stage
                    .results
                    .remove(&index)
                    .map(|(_, output)| output)
                    .ok_or_else(|| Error::engine(format!("stage {} task {} has no output", name, index)))
            })
            .collect()
    }

    /// Map-side combine, hash shuffle into `n_reduce` buckets, reduce-side
    /// merge.
    fn combine_by_key<K, V, A, C, MV, MC>(
        &self,
        name: &str,
        input: Collection<(K, V)>,
        create: C,
        merge_value: MV,
        merge_combiners: MC,
    ) -> Result<Collection<(K, A)>>
    where
        K: Key,
        V: Data,
        A: Data,
        C: Fn(V) -> A + Send + Sync + 'static,
        MV: Fn(A, V) -> A + Send + Sync + 'static,
        MC: Fn(A, A) -> A + Send + Sync + 'static,
    {
        let n_reduce = self.config.n_reduce;

        let map: TaskFn<Vec<(K, V)>, Vec<Vec<(K, A)>>> =
            Arc::new(move |partition: &Vec<(K, V)>| -> Result<Vec<Vec<(K, A)>>> {
                let mut combined: HashMap<K, A> = HashMap::new();
                for (k, v) in partition.iter().cloned() {
                    let a = match combined.remove(&k) {
                        Some(a) => merge_value(a, v),
                        None => create(v),
                    };
                    combined.insert(k, a);
                }
                Ok(shuffle::partition_by_key(combined, n_reduce))
            });
        let map_outputs = self.run_stage(&format!("{}/map", name), input.into_partitions(), map)?;

        let reduce: TaskFn<Vec<(K, A)>, Vec<(K, A)>> =
            Arc::new(move |bucket: &Vec<(K, A)>| -> Result<Vec<(K, A)>> {
                let mut merged: HashMap<K, A> = HashMap::new();
                for (k, a) in bucket.iter().cloned() {
                    let a = match merged.remove(&k) {
                        Some(prev) => merge_combiners(prev, a),
                        None => a,
                    };
                    merged.insert(k, a);
                }
                Ok(merged.into_iter().collect_vec())
            });
        let buckets = shuffle::transpose(map_outputs, n_reduce);
        let outputs = self.run_stage(&format!("{}/reduce", name), buckets, reduce)?;
        Ok(Collection::from_partitions(outputs))
    }
}

impl Debug for LocalCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCluster")
            .field("config", &self.config)
            .finish()
    }
}

impl Engine for LocalCluster {
    fn default_parallelism(&self) -> usize {
        self.config.workers
    }

    fn text_file(&self, path: &Path, min_partitions: usize) -> Result<Collection<String>> {
        let content = self.runtime.block_on(fs::read_to_string(path))?;
        let lines = content.lines().map(str::to_owned).collect();
        Ok(Collection::partition(
            lines,
            min_partitions.max(self.default_parallelism()),
        ))
    }

    fn flat_map<T, U, F>(&self, input: Collection<T>, f: F) -> Result<Collection<U>>
    where
        T: Data,
        U: Data,
        F: Fn(T) -> Result<Vec<U>> + Send + Sync + 'static,
    {
        let task: TaskFn<Vec<T>, Vec<U>> =
            Arc::new(move |partition: &Vec<T>| -> Result<Vec<U>> {
                let mut out = Vec::with_capacity(partition.len());
                for item in partition {
                    out.extend(f(item.clone())?);
                }
                Ok(out)
            });
        let outputs = self.run_stage("flat_map", input.into_partitions(), task)?;
        Ok(Collection::from_partitions(outputs))
    }

    fn map_partitions_with_index<T, U, F>(&self, input: Collection<T>, f: F) -> Result<Collection<U>>
    where
        T: Data,
        U: Data,
        F: Fn(usize, Vec<T>) -> Result<Vec<U>> + Send + Sync + 'static,
    {
        let indexed = input.into_partitions().into_iter().enumerate().collect_vec();
        let task: TaskFn<(usize, Vec<T>), Vec<U>> =
            Arc::new(move |(index, partition): &(usize, Vec<T>)| -> Result<Vec<U>> {
                f(*index, partition.clone())
            });
        let outputs = self.run_stage("map_partitions_with_index", indexed, task)?;
        Ok(Collection::from_partitions(outputs))
    }

    fn group_by_key<K, V>(&self, input: Collection<(K, V)>) -> Result<Collection<(K, Vec<V>)>>
    where
        K: Key,
        V: Data,
    {
        self.combine_by_key(
            "group_by_key",
            input,
            |v| vec![v],
            |mut vs: Vec<V>, v| {
                vs.push(v);
                vs
            },
            |mut vs: Vec<V>, more| {
                vs.extend(more);
                vs
            },
        )
    }

    fn aggregate_by_key<K, V, Z, S, C>(
        &self,
        input: Collection<(K, V)>,
        zero: Z,
        seq: S,
        comb: C,
    ) -> Result<Collection<(K, Z)>>
    where
        K: Key,
        V: Data,
        Z: Data,
        S: Fn(Z, V) -> Z + Send + Sync + 'static,
        C: Fn(Z, Z) -> Z + Send + Sync + 'static,
    {
        let seq = Arc::new(seq);
        let first = Arc::clone(&seq);
        self.combine_by_key(
            "aggregate_by_key",
            input,
            move |v| (*first)(zero.clone(), v),
            move |z, v| (*seq)(z, v),
            comb,
        )
    }

    fn reduce_by_key<K, V, F>(&self, input: Collection<(K, V)>, f: F) -> Result<Collection<(K, V)>>
    where
        K: Key,
        V: Data,
        F: Fn(V, V) -> V + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let local = Arc::clone(&f);
        self.combine_by_key(
            "reduce_by_key",
            input,
            |v| v,
            move |a, v| (*local)(a, v),
            move |a, b| (*f)(a, b),
        )
    }

    fn ordered_top_k<T, F>(&self, input: Collection<T>, count: usize, cmp: F) -> Result<Vec<T>>
    where
        T: Data,
        F: Fn(&T, &T) -> CmpOrdering + Send + Sync + 'static,
    {
        if count == 0 {
            return Ok(Vec::new());
        }
        let cmp = Arc::new(cmp);
        let local = Arc::clone(&cmp);
        let task: TaskFn<Vec<T>, Vec<T>> =
            Arc::new(move |partition: &Vec<T>| -> Result<Vec<T>> {
                Ok(take_ordered(partition.clone(), count, &*local))
            });
        let candidates = self.run_stage("ordered_top_k", input.into_partitions(), task)?;
        Ok(take_ordered(
            candidates.into_iter().flatten().collect(),
            count,
            &*cmp,
        ))
    }
}
