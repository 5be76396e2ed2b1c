//! Background prediction lookups.
//!
//! The UI thread never calls the predictor directly. It submits a request
//! and later drains completions from a channel, so a slow lookup never holds
//! up key handling. Completions carry the request id; whether a completion is
//! still wanted is decided by the receiver, not here.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::predictor::Predictor;

/// A lookup for the words following `context`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub id: u64,
    pub context: String,
}

/// The ranked words for request `id`, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionResult {
    pub id: u64,
    pub words: Vec<String>,
}

/// Owns the lookup thread and both ends of its channels.
pub struct PredictionWorker {
    requests: Option<Sender<PredictionRequest>>,
    results: Receiver<PredictionResult>,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

impl PredictionWorker {
    /// Start the lookup thread. Each request is answered with up to `top_k` words.
    pub fn spawn(predictor: Arc<Predictor>, top_k: usize) -> io::Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<PredictionRequest>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let handle = thread::Builder::new()
            .name("prediction".to_string())
            .spawn(move || run(&predictor, top_k, &request_rx, &result_tx))?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            handle: Some(handle),
            stopped: false,
        })
    }

    /// Queue a request. Returns false if the worker has gone away.
    pub fn submit(&self, request: PredictionRequest) -> bool {
        match &self.requests {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        }
    }

    /// A finished lookup, if one is waiting.
    ///
    /// If the thread has died this is reported once, and later requests are
    /// refused.
    pub fn try_recv(&mut self) -> Option<PredictionResult> {
        if self.stopped {
            return None;
        }
        match self.results.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::error!("prediction worker stopped unexpectedly");
                self.stopped = true;
                self.requests.take();
                None
            }
        }
    }

    /// The completion channel, for callers that want to block on it.
    pub fn results(&self) -> &Receiver<PredictionResult> {
        &self.results
    }
}

impl Drop for PredictionWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("prediction worker panicked");
        }
    }
}

fn run(
    predictor: &Predictor,
    top_k: usize,
    requests: &Receiver<PredictionRequest>,
    results: &Sender<PredictionResult>,
) {
    tracing::debug!("prediction worker started");
    while let Ok(mut request) = requests.recv() {
        // Only the newest request can still matter
        if let Some(newer) = requests.try_iter().last() {
            tracing::trace!(skipped = request.id, "superseded prediction request");
            request = newer;
        }
        let words = predictor.suggest(&request.context, top_k);
        tracing::debug!(id = request.id, found = words.len(), "prediction lookup done");
        if results.send(PredictionResult { id: request.id, words }).is_err() {
            break;
        }
    }
    tracing::debug!("prediction worker stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::predictor::scenario_predictor;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_dead_worker_reported_once() {
        let (request_tx, _request_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        drop(result_tx);
        let mut worker = PredictionWorker {
            requests: Some(request_tx),
            results: result_rx,
            handle: None,
            stopped: false,
        };

        assert_eq!(worker.try_recv(), None);
        assert!(worker.stopped);
        assert_eq!(worker.try_recv(), None);
        assert!(!worker.submit(PredictionRequest {
            id: 1,
            context: "the".to_string(),
        }));
    }

    #[test]
    fn test_lookup_round_trip() {
        let worker = PredictionWorker::spawn(Arc::new(scenario_predictor()), 1).unwrap();
        assert!(worker.submit(PredictionRequest {
            id: 7,
            context: "the cat".to_string(),
        }));
        let result = worker.results().recv_timeout(WAIT).unwrap();
        assert_eq!(
            result,
            PredictionResult {
                id: 7,
                words: vec!["sat".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_result_is_still_delivered() {
        let worker = PredictionWorker::spawn(Arc::new(scenario_predictor()), 1).unwrap();
        worker.submit(PredictionRequest {
            id: 1,
            context: "the dog".to_string(),
        });
        let result = worker.results().recv_timeout(WAIT).unwrap();
        assert_eq!(result.id, 1);
        assert!(result.words.is_empty());
    }

    #[test]
    fn test_newest_request_is_always_answered() {
        let worker = PredictionWorker::spawn(Arc::new(scenario_predictor()), 1).unwrap();
        for id in 1..=5 {
            worker.submit(PredictionRequest {
                id,
                context: "the".to_string(),
            });
        }
        let mut last = None;
        while let Ok(result) = worker.results().recv_timeout(WAIT) {
            let done = result.id == 5;
            last = Some(result);
            if done {
                break;
            }
        }
        assert_eq!(last.map(|r| r.id), Some(5));
    }

    #[test]
    fn test_try_recv_when_idle() {
        let mut worker = PredictionWorker::spawn(Arc::new(Predictor::empty()), 1).unwrap();
        assert_eq!(worker.try_recv(), None);
    }
}
