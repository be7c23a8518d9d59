use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::window;

/// Something that can run a callback on a later tick and cancel it before it fires.
pub trait FrameSource {
    fn request(&self, callback: Box<dyn FnOnce()>) -> Option<i32>;
    fn cancel(&self, handle: i32);
}

/// `requestAnimationFrame` on the current window.
#[derive(Clone, Copy, Default)]
pub struct AnimationFrames;

impl FrameSource for AnimationFrames {
    fn request(&self, callback: Box<dyn FnOnce()>) -> Option<i32> {
        let window = window()?;
        let closure = Closure::once_into_js(move || callback());
        window.request_animation_frame(closure.unchecked_ref()).ok()
    }

    fn cancel(&self, handle: i32) {
        if let Some(window) = window() {
            let _ = window.cancel_animation_frame(handle);
        }
    }
}

/// Runs `task` at most once per frame no matter how often `schedule` is called.
///
/// Only one pass can be pending at a time: while a frame is requested, further
/// calls are dropped. The slot frees up right before the task runs, so a change
/// made by the task itself can schedule the next pass.
pub struct CoalescingScheduler<S: FrameSource> {
    source: S,
    task: Rc<dyn Fn()>,
    scheduled: Rc<Cell<bool>>,
    handle: Rc<Cell<Option<i32>>>,
}

impl<S: FrameSource> CoalescingScheduler<S> {
    pub fn new(source: S, task: impl Fn() + 'static) -> Self {
        Self {
            source,
            task: Rc::new(task),
            scheduled: Rc::new(Cell::new(false)),
            handle: Rc::new(Cell::new(None)),
        }
    }

    /// Returns true when a new pass was requested.
    pub fn schedule(&self) -> bool {
        if self.scheduled.get() {
            return false;
        }
        self.scheduled.set(true);

        let scheduled = self.scheduled.clone();
        let handle = self.handle.clone();
        let task = self.task.clone();
        let requested = self.source.request(Box::new(move || {
            scheduled.set(false);
            handle.set(None);
            task();
        }));

        match requested {
            Some(id) => {
                // A source that runs synchronously has already cleared the slot.
                if self.scheduled.get() {
                    self.handle.set(Some(id));
                }
                true
            }
            None => {
                self.scheduled.set(false);
                false
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.scheduled.get()
    }

    pub fn cancel(&self) {
        if let Some(id) = self.handle.take() {
            self.source.cancel(id);
        }
        self.scheduled.set(false);
    }
}

#[cfg(test)]
pub mod testing {
    use super::FrameSource;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Frames that only advance when the test says so.
    #[derive(Clone, Default)]
    pub struct ManualFrames {
        queue: Rc<RefCell<Vec<(i32, Box<dyn FnOnce()>)>>>,
        next_id: Rc<Cell<i32>>,
        pub cancelled: Rc<RefCell<Vec<i32>>>,
    }

    impl ManualFrames {
        pub fn queued(&self) -> usize {
            self.queue.borrow().len()
        }

        /// Runs every callback queued so far. Callbacks queued while running wait
        /// for the next call.
        pub fn tick(&self) -> usize {
            let due: Vec<_> = self.queue.borrow_mut().drain(..).collect();
            let count = due.len();
            for (_, callback) in due {
                callback();
            }
            count
        }
    }

    impl FrameSource for ManualFrames {
        fn request(&self, callback: Box<dyn FnOnce()>) -> Option<i32> {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            self.queue.borrow_mut().push((id, callback));
            Some(id)
        }

        fn cancel(&self, handle: i32) {
            self.queue.borrow_mut().retain(|(id, _)| *id != handle);
            self.cancelled.borrow_mut().push(handle);
        }
    }
}
