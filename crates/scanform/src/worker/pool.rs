use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::{Pipeline, ProgressReporter};
use crate::worker::job::ProcessingJob;

/// Fixed set of threads running pipeline jobs.
///
/// The queue is unbounded so that starting a document never blocks the
/// caller; each job carries its own reply channel. Workers exit only
/// after the queue has drained.
pub struct WorkerPool {
    job_sender: Option<Sender<ProcessingJob>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(
        pipeline: Arc<Pipeline>,
        progress: Arc<dyn ProgressReporter>,
        worker_count: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }
        let (job_sender, job_receiver) = unbounded::<ProcessingJob>();

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let worker_pipeline = Arc::clone(&pipeline);
            let worker_progress = Arc::clone(&progress);

            let handle = thread::Builder::new()
                .name(format!("scanform-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, job_rx, worker_pipeline, worker_progress);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender: Some(job_sender),
            workers,
        })
    }

    pub fn submit(&self, job: ProcessingJob) -> Result<(), WorkerError> {
        self.job_sender
            .as_ref()
            .ok_or(WorkerError::ChannelClosed)?
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Lets workers drain the queue, then joins them.
    pub fn wait(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        // Dropping the sender lets workers exit once the queue is empty
        drop(self.job_sender.take());

        for (i, worker) in self.workers.drain(..).enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.join_all();
        }
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<ProcessingJob>,
    pipeline: Arc<Pipeline>,
    progress: Arc<dyn ProgressReporter>,
) {
    debug!("Worker {} started", worker_id);

    // Ends once the sender is dropped and the queue is empty.
    for job in job_receiver.iter() {
        let ProcessingJob {
            context,
            reply,
            guard,
        } = job;
        debug!(
            "Worker {} processing document: {}",
            worker_id,
            context.document_id()
        );

        let (outcome, _ctx) = pipeline.run(context, progress.as_ref());

        // Release the id before replying so a waiter can restart it
        drop(guard);

        if reply.send(outcome).is_err() {
            debug!("Worker {}: result receiver dropped", worker_id);
        }
    }

    debug!("Worker {} stopped", worker_id);
}
