//! `requestAnimationFrame` loop used to keep the captured surface fresh while streaming.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

type FrameCallback = Closure<dyn FnMut()>;

/// A cancellable animation-frame loop.
///
/// The callback closure stays allocated after [`FrameLoop::stop`] so that stopping
/// from inside a frame never frees the closure that is running.
#[derive(Default)]
pub struct FrameLoop {
    running: Rc<Cell<bool>>,
    handle: Rc<Cell<Option<i32>>>,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

fn request_frame(callback: &FrameCallback) -> Option<i32> {
    let window = web_sys::window()?;
    window
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .ok()
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Call `on_frame` once per animation frame until [`FrameLoop::stop`].
    pub fn start(&self, mut on_frame: impl FnMut() + 'static) {
        if self.running.replace(true) {
            return;
        }
        let running = self.running.clone();
        let handle = self.handle.clone();
        let slot = self.callback.clone();
        let closure = Closure::wrap(Box::new(move || {
            if !running.get() {
                return;
            }
            on_frame();
            if running.get() {
                if let Some(callback) = slot.borrow().as_ref() {
                    handle.set(request_frame(callback));
                }
            }
        }) as Box<dyn FnMut()>);
        self.handle.set(request_frame(&closure));
        *self.callback.borrow_mut() = Some(closure);
        log::debug!("Frame loop started");
    }

    pub fn stop(&self) {
        if !self.running.replace(false) {
            return;
        }
        if let Some(id) = self.handle.take() {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(id);
            }
        }
        log::debug!("Frame loop stopped");
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
        self.callback.borrow_mut().take();
    }
}
