use crate::event::Event;
use crate::reducer::apply_in_place;
use crate::state::SessionState;

/// Working copy used while one action is being executed.
///
/// Every emitted event is folded into the copy immediately, so later steps of
/// a multi-step procedure observe the effects of earlier ones. The copy is
/// discarded afterwards; the session applies the returned events to its
/// authoritative state once they have been numbered.
#[derive(Clone, Debug)]
pub struct Staging {
    state: SessionState,
    events: Vec<Event>,
}

impl Staging {
    pub fn new(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn emit(&mut self, event: Event) {
        apply_in_place(&mut self.state, &event);
        self.events.push(event);
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}
