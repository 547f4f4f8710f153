//! Caller-facing completion and progress primitive

use crate::error::{ArmError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Minimum progress delta that raises a progress notification
pub const DEFAULT_PROGRESS_THRESHOLD: f32 = 0.01;

type CompletedCallback<T> = Box<dyn FnOnce(&OperationHandle<T>) + Send>;
type ProgressCallback = Box<dyn FnMut(f32) + Send>;

struct OperationState<T> {
    done: bool,
    error: Option<ArmError>,
    result: Option<T>,
    progress: f32,
    threshold: f32,
    on_completed: Vec<CompletedCallback<T>>,
    on_progress: Vec<ProgressCallback>,
    wakers: Vec<Waker>,
}

/// Single-use handle to an asynchronous result.
///
/// Completion is terminal: the first `complete` or `fail` wins and every
/// later attempt is ignored. Subscribing after completion invokes the
/// callback immediately.
pub struct OperationHandle<T> {
    inner: Arc<Mutex<OperationState<T>>>,
}

impl<T> Clone for OperationHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> OperationHandle<T> {
    pub(crate) fn new() -> Self {
        Self::with_threshold(DEFAULT_PROGRESS_THRESHOLD)
    }

    pub(crate) fn with_threshold(threshold: f32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OperationState {
                done: false,
                error: None,
                result: None,
                progress: 0.0,
                threshold,
                on_completed: Vec::new(),
                on_progress: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Handle that is already completed with `value`
    pub fn completed(value: T) -> Self {
        let handle = Self::new();
        handle.complete(value);
        handle
    }

    /// Handle that is already failed with `error`
    pub fn failed(error: ArmError) -> Self {
        let handle = Self::new();
        handle.fail(error);
        handle
    }

    pub fn is_done(&self) -> bool {
        self.inner.lock().done
    }

    pub fn has_error(&self) -> bool {
        self.inner.lock().error.is_some()
    }

    pub fn error(&self) -> Option<ArmError> {
        self.inner.lock().error.clone()
    }

    pub fn result(&self) -> Option<T> {
        self.inner.lock().result.clone()
    }

    pub fn progress(&self) -> f32 {
        self.inner.lock().progress
    }

    /// Register a completion callback; runs now if already done
    pub fn on_completed<F>(&self, callback: F)
    where
        F: FnOnce(&OperationHandle<T>) + Send + 'static,
    {
        {
            let mut state = self.inner.lock();
            if !state.done {
                state.on_completed.push(Box::new(callback));
                return;
            }
        }
        callback(self);
    }

    /// Register a progress listener
    pub fn on_progress_changed<F>(&self, callback: F)
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.inner.lock().on_progress.push(Box::new(callback));
    }

    /// Future resolving to the result or the failure
    pub fn wait(&self) -> OperationFuture<T> {
        OperationFuture {
            handle: self.clone(),
        }
    }

    /// Store `value` and notify only when it moved past the threshold
    pub(crate) fn set_progress(&self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        let listeners = {
            let mut state = self.inner.lock();
            if (state.progress - value).abs() <= state.threshold {
                return;
            }
            state.progress = value;
            std::mem::take(&mut state.on_progress)
        };
        self.notify_progress(listeners, value);
    }

    fn notify_progress(&self, mut listeners: Vec<ProgressCallback>, value: f32) {
        if listeners.is_empty() {
            return;
        }
        for listener in listeners.iter_mut() {
            listener(value);
        }
        let mut state = self.inner.lock();
        listeners.append(&mut state.on_progress);
        state.on_progress = listeners;
    }

    /// Store the result, pin progress to 1.0 and notify subscribers
    pub(crate) fn complete(&self, value: T) {
        let listeners = {
            let mut state = self.inner.lock();
            if state.done {
                tracing::debug!("Operation already finished, ignoring completion");
                return;
            }
            state.result = Some(value);
            if state.progress < 1.0 {
                state.progress = 1.0;
                std::mem::take(&mut state.on_progress)
            } else {
                Vec::new()
            }
        };
        self.notify_progress(listeners, 1.0);
        self.finish();
    }

    pub(crate) fn fail(&self, error: ArmError) {
        {
            let mut state = self.inner.lock();
            if state.done {
                tracing::debug!("Operation already finished, ignoring failure: {}", error);
                return;
            }
            state.error = Some(error);
        }
        self.finish();
    }

    fn finish(&self) {
        let (callbacks, wakers) = {
            let mut state = self.inner.lock();
            state.done = true;
            (
                std::mem::take(&mut state.on_completed),
                std::mem::take(&mut state.wakers),
            )
        };
        for callback in callbacks {
            callback(self);
        }
        for waker in wakers {
            waker.wake();
        }
    }
}

impl<T> fmt::Debug for OperationHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("OperationHandle")
            .field("done", &state.done)
            .field("progress", &state.progress)
            .field("error", &state.error)
            .finish()
    }
}

/// Future returned by [`OperationHandle::wait`]
pub struct OperationFuture<T> {
    handle: OperationHandle<T>,
}

impl<T: Clone + Send + 'static> Future for OperationFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.handle.inner.lock();
        if !state.done {
            let waker = cx.waker();
            if !state.wakers.iter().any(|stored| stored.will_wake(waker)) {
                state.wakers.push(waker.clone());
            }
            return Poll::Pending;
        }
        if let Some(error) = &state.error {
            return Poll::Ready(Err(error.clone()));
        }
        match &state.result {
            Some(value) => Poll::Ready(Ok(value.clone())),
            None => Poll::Ready(Err(ArmError::Backend(
                "operation finished without a result".to_string(),
            ))),
        }
    }
}
