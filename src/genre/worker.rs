use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::debug;

use crate::audio::FeatureVector;

use super::{GenreClassifier, GenrePrediction};

struct Request {
    features: FeatureVector,
    session: u64,
}

struct Response {
    prediction: GenrePrediction,
    session: u64,
}

/// Runs a [`GenreClassifier`] on its own thread with a bounded wait.
///
/// Requests and responses travel over capacity-1 channels; the caller waits
/// at most its configured timeout for a result and otherwise falls back to
/// synchronous heuristics. Responses tagged with a session other than the
/// caller's current one are dropped, so a track change can never surface a
/// prediction computed against the previous track.
pub struct ClassificationWorker {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    timeout: Duration,
    handle: Option<JoinHandle<()>>,
}

impl ClassificationWorker {
    pub fn spawn(mut classifier: GenreClassifier, timeout: Duration) -> Self {
        let (request_tx, request_rx) = bounded::<Request>(1);
        let (response_tx, response_rx) = bounded::<Response>(1);

        let handle = thread::spawn(move || {
            while let Ok(request) = request_rx.recv() {
                let prediction = classifier.classify(&request.features);
                let response = Response {
                    prediction,
                    session: request.session,
                };
                match response_tx.try_send(response) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!("dropping classification result, consumer stopped waiting")
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
        });

        Self {
            requests: Some(request_tx),
            responses: response_rx,
            timeout,
            handle: Some(handle),
        }
    }

    /// Classifies on the worker thread, waiting at most the configured
    /// timeout. `None` means the caller should classify synchronously.
    pub fn classify(&self, features: &FeatureVector, session: u64) -> Option<GenrePrediction> {
        let requests = self.requests.as_ref()?;

        // Unclaimed results from earlier requests would lag every later
        // answer by one cycle.
        while let Ok(stale) = self.responses.try_recv() {
            debug!("dropping unclaimed classification (session {})", stale.session);
        }

        match requests.try_send(Request {
            features: features.clone(),
            session,
        }) {
            // A full queue means the worker is still on the previous
            // request; its response is still worth waiting for.
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => return None,
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.responses.recv_timeout(remaining) {
                Ok(response) if response.session == session => return Some(response.prediction),
                Ok(stale) => {
                    debug!("dropping stale classification (session {})", stale.session)
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for ClassificationWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
