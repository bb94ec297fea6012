//! Background load queue and the single decode worker.
//!
//! Requests flow through an unbounded FIFO channel drained by **at most
//! one** worker thread at a time. The worker is not a long-lived service:
//! it drains the queue, then exits, and the next enqueue starts a fresh
//! one. An [`AtomicBool`] is the single authority on whether a worker
//! currently holds the drain slot.
//!
//! The enqueue/exit handshake tolerates one benign race — a redundant
//! spawn attempt in the instant between a worker releasing the slot and
//! exiting — but can never strand a request:
//!
//! - Producers **send first, then claim**: the request is in the queue
//!   before the flag is examined, so whichever thread holds the slot is
//!   obliged to see it.
//! - The worker **releases first, then re-checks**: after clearing the
//!   flag it looks at the queue once more and re-claims the slot if
//!   anything arrived during the gap.
//! - Release, claim, and the checks between them run at `SeqCst`, with
//!   a fence between each side's write and its cross-check, so of a
//!   racing exit and enqueue, at least one side sees the other. Weaker
//!   orderings would admit the outcome where both read stale state:
//!   the worker exits on an empty read while the producer declines to
//!   spawn on a claimed read, stranding the request.

use crate::cache::{ImageCache, image_byte_size};
use crate::fingerprint::{Bound, Fingerprint, Modifiers};
use crate::imaging::{BackendError, ImageBackend, load_scaled};
use crate::surface::{LoadListener, SurfaceHandle};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering, fence};
use std::thread;

/// A queued decode job. Owned by the channel until the worker claims it,
/// dropped once processed or skipped.
pub(crate) struct LoadRequest {
    pub source: PathBuf,
    pub fingerprint: Fingerprint,
    pub bound: Bound,
    pub modifiers: Modifiers,
    pub surface: Arc<SurfaceHandle>,
    pub listener: Option<Arc<dyn LoadListener>>,
}

/// State shared between the manager and its worker threads.
///
/// The worker holds an `Arc<Shared>` for its whole activation, so a
/// manager dropped mid-queue does not tear the state down under the
/// worker; the drain finishes, the worker exits, and the last `Arc`
/// clone frees everything.
pub(crate) struct Shared<B> {
    pub backend: B,
    pub cache: ImageCache,
    pub blur_sigma: f32,
    tx: Sender<LoadRequest>,
    rx: Receiver<LoadRequest>,
    worker_active: AtomicBool,
}

impl<B: ImageBackend + 'static> Shared<B> {
    pub fn new(backend: B, cache: ImageCache, blur_sigma: f32) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            backend,
            cache,
            blur_sigma,
            tx,
            rx,
            worker_active: AtomicBool::new(false),
        }
    }

    /// Queue a request and make sure a worker is running to serve it.
    pub fn enqueue(self: &Arc<Self>, request: LoadRequest) {
        if self.tx.send(request).is_err() {
            warn!("image load queue disconnected; dropping request");
            return;
        }
        self.spawn_worker_if_idle();
    }

    /// Claim the drain slot and spawn a worker thread if nobody holds it.
    fn spawn_worker_if_idle(self: &Arc<Self>) {
        // Pairs with the fence in `drain`: the send that preceded this
        // claim must be visible to a worker re-checking the queue on its
        // way out.
        fence(Ordering::SeqCst);
        if self
            .worker_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("image-loader".into())
            .spawn(move || shared.drain());
        if let Err(err) = spawned {
            self.worker_active.store(false, Ordering::Release);
            warn!("failed to spawn image loader thread: {err}");
        }
    }

    /// Worker body: drain the queue, release the slot, exit.
    fn drain(self: Arc<Self>) {
        loop {
            while let Ok(request) = self.rx.try_recv() {
                self.serve(request);
            }
            self.worker_active.store(false, Ordering::SeqCst);
            // Pairs with the fence in `spawn_worker_if_idle`: the release
            // above must be visible before the emptiness check below.
            fence(Ordering::SeqCst);
            // A request sent after the final try_recv but before that
            // store saw the slot as taken and did not spawn; it is ours
            // to pick up if we can win the slot back.
            if self.rx.is_empty() {
                return;
            }
            if self
                .worker_active
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
        }
    }

    /// Serve one request, containing any panic that escapes the backend
    /// or a caller-supplied surface/listener. The activation keeps
    /// draining, and the slot is never left claimed by a dead thread.
    fn serve(&self, request: LoadRequest) {
        let source = request.source.clone();
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| self.process(request))) {
            let msg = panic
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("non-string panic payload");
            warn!("panic while serving {}: {}", source.display(), msg);
        }
    }

    /// Run one request: staleness check, decode, cache, deliver.
    ///
    /// Failures are contained here; one bad request never aborts the
    /// drain loop.
    pub(crate) fn process(&self, request: LoadRequest) {
        if !request.surface.is_current(&request.fingerprint) {
            debug!("skipping stale request for {}", request.source.display());
            return;
        }

        match load_scaled(
            &self.backend,
            &request.source,
            request.bound,
            request.modifiers,
            self.blur_sigma,
        ) {
            Ok(image) => {
                let image = Arc::new(image);
                let size = image_byte_size(&image);
                self.cache.put(request.fingerprint.clone(), image, size);
            }
            Err(BackendError::OutOfMemory) => {
                warn!(
                    "out of memory decoding {}; shrinking cache",
                    request.source.display()
                );
                self.cache.free_space();
            }
            Err(err) => {
                warn!("failed to load {}: {}", request.source.display(), err);
            }
        }

        // The cache, not the freshly decoded buffer, is what gets
        // delivered: re-fetch by fingerprint and show whatever it holds,
        // even when this particular decode failed.
        if let Some(image) = self.cache.get(&request.fingerprint) {
            request.surface.show(image);
        }
        if let Some(listener) = &request.listener {
            listener.after_load(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::imaging::Dimensions;
    use crate::imaging::backend::tests::{MockBackend, test_image};
    use crate::test_helpers::{listener_pair, surface_pair};
    use std::path::Path;
    use std::time::Duration;

    const BUDGET: usize = 1000;

    fn shared_with(backend: MockBackend) -> Arc<Shared<MockBackend>> {
        Arc::new(Shared::new(backend, ImageCache::new(BUDGET), 12.0))
    }

    /// Request whose fingerprint is also set as the surface's current one.
    fn current_request(
        source: &str,
        surface: &Arc<SurfaceHandle>,
        listener: Option<Arc<dyn LoadListener>>,
    ) -> LoadRequest {
        let source = PathBuf::from(source);
        let print = fingerprint(&source, Bound::Pixels(500), Modifiers::none());
        surface.set_current(print.clone());
        LoadRequest {
            source,
            fingerprint: print,
            bound: Bound::Pixels(500),
            modifiers: Modifiers::none(),
            surface: Arc::clone(surface),
            listener,
        }
    }

    fn dims() -> Dimensions {
        Dimensions {
            width: 800,
            height: 600,
        }
    }

    // =========================================================================
    // process: the worker loop body
    // =========================================================================

    #[test]
    fn process_caches_and_delivers_on_success() {
        let shared = shared_with(MockBackend::with_dimensions(vec![dims()]));
        let (surface, recording) = surface_pair();
        let (listener, events) = listener_pair();

        let request = current_request("photos/one.jpg", &surface, Some(listener));
        let print = request.fingerprint.clone();
        shared.process(request);

        let cached = shared.cache.get(&print).expect("decoded image is cached");
        let shown = recording.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert!(Arc::ptr_eq(&shown[0], &cached));
        assert_eq!(events.try_recv().unwrap(), ("after", false));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn stale_request_is_skipped_without_decoding() {
        let shared = shared_with(MockBackend::new());
        let (surface, recording) = surface_pair();
        let (listener, events) = listener_pair();

        let request = current_request("photos/old.jpg", &surface, Some(listener));
        // The surface has moved on to a different image.
        surface.set_current(fingerprint(
            Path::new("photos/new.jpg"),
            Bound::Pixels(500),
            Modifiers::none(),
        ));
        shared.process(request);

        assert!(shared.backend.get_operations().is_empty());
        assert!(shared.cache.is_empty());
        assert!(recording.shown.lock().unwrap().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn decode_failure_still_reports_completion() {
        let backend = MockBackend::with_dimensions(vec![dims()]);
        backend
            .decode_failures
            .lock()
            .unwrap()
            .push(BackendError::Decode("truncated scan".to_string()));
        let shared = shared_with(backend);
        let (surface, recording) = surface_pair();
        let (listener, events) = listener_pair();

        shared.process(current_request("photos/bad.jpg", &surface, Some(listener)));

        assert!(shared.cache.is_empty());
        assert!(recording.shown.lock().unwrap().is_empty());
        assert_eq!(events.try_recv().unwrap(), ("after", false));
    }

    #[test]
    fn failed_decode_still_delivers_an_existing_cache_entry() {
        let backend = MockBackend::with_dimensions(vec![dims()]);
        backend
            .decode_failures
            .lock()
            .unwrap()
            .push(BackendError::Decode("truncated scan".to_string()));
        let shared = shared_with(backend);
        let (surface, recording) = surface_pair();

        let request = current_request("photos/flaky.jpg", &surface, None);
        // An earlier load already populated this fingerprint.
        let resident = Arc::new(test_image());
        shared
            .cache
            .put(request.fingerprint.clone(), Arc::clone(&resident), 48);

        shared.process(request);

        let shown = recording.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert!(Arc::ptr_eq(&shown[0], &resident));
    }

    #[test]
    fn out_of_memory_shrinks_the_cache() {
        let backend = MockBackend::with_dimensions(vec![dims()]);
        backend
            .decode_failures
            .lock()
            .unwrap()
            .push(BackendError::OutOfMemory);
        let shared = shared_with(backend);
        let (surface, recording) = surface_pair();
        let (listener, events) = listener_pair();

        for i in 0..9 {
            let filler = fingerprint(
                Path::new(&format!("filler-{i}.jpg")),
                Bound::Unbounded,
                Modifiers::none(),
            );
            shared.cache.put(filler, Arc::new(test_image()), 100);
        }
        assert_eq!(shared.cache.total_bytes(), 900);

        shared.process(current_request("photos/huge.jpg", &surface, Some(listener)));

        assert!(shared.cache.total_bytes() <= BUDGET / 2);
        assert!(recording.shown.lock().unwrap().is_empty());
        assert_eq!(events.try_recv().unwrap(), ("after", false));
    }

    // =========================================================================
    // enqueue: worker lifecycle
    // =========================================================================

    #[test]
    fn enqueue_runs_the_request_on_a_worker_thread() {
        let shared = shared_with(MockBackend::with_dimensions(vec![dims()]));
        let (surface, recording) = surface_pair();
        let (listener, events) = listener_pair();

        let request = current_request("photos/bg.jpg", &surface, Some(listener));
        let print = request.fingerprint.clone();
        shared.enqueue(request);

        assert_eq!(
            events.recv_timeout(Duration::from_secs(5)).unwrap(),
            ("after", false)
        );
        assert!(shared.cache.get(&print).is_some());
        assert_eq!(recording.shown.lock().unwrap().len(), 1);
    }

    #[test]
    fn worker_restarts_after_draining_the_queue() {
        let shared = shared_with(MockBackend::with_dimensions(vec![dims(), dims()]));
        let (surface, _recording) = surface_pair();

        let (listener, events) = listener_pair();
        shared.enqueue(current_request("photos/first.jpg", &surface, Some(listener)));
        events.recv_timeout(Duration::from_secs(5)).unwrap();

        // The first activation has drained; a fresh enqueue must be
        // served by a new one.
        let (listener, events) = listener_pair();
        shared.enqueue(current_request(
            "photos/second.jpg",
            &surface,
            Some(listener),
        ));
        assert_eq!(
            events.recv_timeout(Duration::from_secs(5)).unwrap(),
            ("after", false)
        );
    }

    #[test]
    fn queued_requests_complete_in_enqueue_order() {
        struct TaggedListener {
            tag: usize,
            events: crossbeam_channel::Sender<usize>,
        }

        impl LoadListener for TaggedListener {
            fn before_load(&self, _cached: bool) {}

            fn after_load(&self, _cached: bool) {
                let _ = self.events.send(self.tag);
            }
        }

        let shared = shared_with(MockBackend::with_dimensions(vec![dims(), dims(), dims()]));
        let (tx, rx) = crossbeam_channel::unbounded();

        for tag in 0..3 {
            let (surface, _recording) = surface_pair();
            shared.enqueue(current_request(
                &format!("photos/seq-{tag}.jpg"),
                &surface,
                Some(Arc::new(TaggedListener {
                    tag,
                    events: tx.clone(),
                })),
            ));
        }

        let order: Vec<usize> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn panicking_listener_does_not_wedge_the_worker() {
        struct PanickingListener;

        impl LoadListener for PanickingListener {
            fn before_load(&self, _cached: bool) {}

            fn after_load(&self, _cached: bool) {
                panic!("listener exploded");
            }
        }

        let shared = shared_with(MockBackend::with_dimensions(vec![dims(), dims()]));

        let (first_surface, _) = surface_pair();
        shared.enqueue(current_request(
            "photos/cursed.jpg",
            &first_surface,
            Some(Arc::new(PanickingListener)),
        ));

        // Whether served by the same activation or a fresh one, loading
        // must still work after the panic.
        let (surface, recording) = surface_pair();
        let (listener, events) = listener_pair();
        shared.enqueue(current_request("photos/fine.jpg", &surface, Some(listener)));

        assert_eq!(
            events.recv_timeout(Duration::from_secs(5)).unwrap(),
            ("after", false)
        );
        assert_eq!(recording.shown.lock().unwrap().len(), 1);
    }

    #[test]
    fn rapid_enqueues_never_strand_a_request() {
        struct DoneListener {
            done: crossbeam_channel::Sender<()>,
        }

        impl LoadListener for DoneListener {
            fn before_load(&self, _cached: bool) {}

            fn after_load(&self, _cached: bool) {
                let _ = self.done.send(());
            }
        }

        const THREADS: usize = 4;
        const PER_THREAD: usize = 50;

        // Unscripted identify fails instantly, so the worker drains and
        // exits as fast as requests trickle in, hammering the window
        // between a worker releasing the slot and a producer claiming it.
        let shared = shared_with(MockBackend::new());
        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        let producers: Vec<_> = (0..THREADS)
            .map(|thread| {
                let shared = Arc::clone(&shared);
                let done_tx = done_tx.clone();
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let (surface, _) = surface_pair();
                        shared.enqueue(current_request(
                            &format!("photos/stress-{thread}-{i}.jpg"),
                            &surface,
                            Some(Arc::new(DoneListener {
                                done: done_tx.clone(),
                            })),
                        ));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        // Every request completes; a stranded one would time out here.
        for _ in 0..THREADS * PER_THREAD {
            done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        }
    }
}
