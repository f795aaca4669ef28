use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;

use crate::backoff::{BackoffCounter, TileSource};
use crate::layers::{FeatureLayer, LayerName};
use crate::popup::PopupState;
use crate::session::SessionCode;

// Module state holding everything the event handlers mutate. All access goes
// through the single browser event-loop thread; the reentrant lock exists so
// nested `with` calls from within a callback do not deadlock.
pub struct ModuleState {
    // Session code from the page URL, sent once as the credential frame
    pub session_code: Option<SessionCode>,

    // The two vector layers replaced wholesale on every push message
    pub route_layer: FeatureLayer,
    pub trace_layer: FeatureLayer,

    // Per-base-layer tile retry counters. Kept separate so a coordinate key
    // collision across the two national grids never shares backoff state.
    pub backoff_no: BackoffCounter,
    pub backoff_se: BackoffCounter,

    // Selection/popup state machine
    pub popup: PopupState,
}

// Create a global static instance of the module state
lazy_static! {
    static ref MODULE_STATE: ReentrantMutex<RefCell<ModuleState>> =
        ReentrantMutex::new(RefCell::new(ModuleState::new()));
}

impl ModuleState {
    pub fn new() -> Self {
        ModuleState {
            session_code: None,
            route_layer: FeatureLayer::new(LayerName::Route),
            trace_layer: FeatureLayer::new(LayerName::Trace),
            backoff_no: BackoffCounter::new(),
            backoff_se: BackoffCounter::new(),
            popup: PopupState::Closed,
        }
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&ModuleState) -> R,
    {
        let guard = MODULE_STATE.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }

    pub fn backoff_mut(&mut self, source: TileSource) -> &mut BackoffCounter {
        match source {
            TileSource::TopoNo => &mut self.backoff_no,
            TileSource::TopoSe => &mut self.backoff_se,
        }
    }
}

impl Default for ModuleState {
    fn default() -> Self {
        ModuleState::new()
    }
}
