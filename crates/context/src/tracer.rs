//! Call tracers.
//!
//! A tracer observes the top-level message, every nested call a bytecode engine reports and
//! every aspect hook run. Tracers never influence execution.
use parking_lot::Mutex;
use primitives::{Address, Bytes, U256};
use std::{sync::Arc, time::Instant};

/// Tracer shared between the caller that installed it and the running transaction.
pub type SharedTracer = Arc<Mutex<dyn Tracer + Send>>;

/// Observer of execution.
pub trait Tracer: core::fmt::Debug {
    /// A call frame starts.
    fn capture_enter(&mut self, frame: CallFrame) {
        let _ = frame;
    }

    /// The innermost call frame ends.
    fn capture_exit(&mut self, output: &Bytes, gas_used: u64, error: Option<&str>) {
        let _ = (output, gas_used, error);
    }

    /// An aspect hook ran.
    fn capture_hook(&mut self, join_point: &str, aspect: Address, gas_used: u64) {
        let _ = (join_point, aspect, gas_used);
    }

    /// Stops tracing; later callbacks are ignored.
    fn stop(&mut self, reason: &str) {
        let _ = reason;
    }

    /// Returns true once the tracer was stopped.
    fn is_stopped(&self) -> bool {
        false
    }
}

/// Tracer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Kind of a call frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallKind {
    /// Message call.
    #[default]
    Call,
    /// Contract creation.
    Create,
}

/// One traced call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallFrame {
    /// Kind of call.
    pub kind: CallKind,
    /// Caller.
    pub from: Address,
    /// Callee, `None` for creations until the address is known.
    pub to: Option<Address>,
    /// Call data or init code.
    pub input: Bytes,
    /// Transferred value.
    pub value: U256,
    /// Gas made available to the frame.
    pub gas: u64,
    /// Gas used by the frame.
    pub gas_used: u64,
    /// Return data.
    pub output: Bytes,
    /// Error or revert reason.
    pub error: Option<String>,
    /// Nested frames.
    pub calls: Vec<CallFrame>,
}

/// A traced aspect hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookFrame {
    /// Join point name.
    pub join_point: String,
    /// Aspect that ran.
    pub aspect: Address,
    /// Gas consumed.
    pub gas_used: u64,
}

/// Tracer building a call tree.
#[derive(Clone, Debug, Default)]
pub struct CallTracer {
    stack: Vec<CallFrame>,
    /// Completed top-level frame.
    pub root: Option<CallFrame>,
    /// Aspect hooks in execution order.
    pub hooks: Vec<HookFrame>,
    /// Stop reason, if stopped.
    pub stopped: Option<String>,
}

impl Tracer for CallTracer {
    fn capture_enter(&mut self, frame: CallFrame) {
        if self.stopped.is_none() {
            self.stack.push(frame);
        }
    }

    fn capture_exit(&mut self, output: &Bytes, gas_used: u64, error: Option<&str>) {
        if self.stopped.is_some() {
            return;
        }
        let Some(mut frame) = self.stack.pop() else {
            return;
        };
        frame.output = output.clone();
        frame.gas_used = gas_used;
        frame.error = error.map(str::to_owned);
        match self.stack.last_mut() {
            Some(parent) => parent.calls.push(frame),
            None => self.root = Some(frame),
        }
    }

    fn capture_hook(&mut self, join_point: &str, aspect: Address, gas_used: u64) {
        if self.stopped.is_none() {
            self.hooks.push(HookFrame {
                join_point: join_point.to_owned(),
                aspect,
                gas_used,
            });
        }
    }

    fn stop(&mut self, reason: &str) {
        self.stopped.get_or_insert_with(|| reason.to_owned());
    }

    fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }
}

/// Wraps a tracer and stops it once a deadline passes.
#[derive(Debug)]
pub struct DeadlineTracer<T> {
    inner: T,
    deadline: Instant,
}

/// Reason handed to [`Tracer::stop`] when the deadline passes.
pub const DEADLINE_EXCEEDED: &str = "execution timeout";

impl<T: Tracer> DeadlineTracer<T> {
    /// Wraps `inner`.
    pub fn new(inner: T, deadline: Instant) -> Self {
        Self { inner, deadline }
    }

    /// Returns the wrapped tracer.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Stops the inner tracer if the deadline passed. Returns true if stopped.
    pub fn check_deadline(&mut self) -> bool {
        if !self.inner.is_stopped() && Instant::now() >= self.deadline {
            self.inner.stop(DEADLINE_EXCEEDED);
        }
        self.inner.is_stopped()
    }
}

impl<T: Tracer> Tracer for DeadlineTracer<T> {
    fn capture_enter(&mut self, frame: CallFrame) {
        if !self.check_deadline() {
            self.inner.capture_enter(frame);
        }
    }

    fn capture_exit(&mut self, output: &Bytes, gas_used: u64, error: Option<&str>) {
        if !self.check_deadline() {
            self.inner.capture_exit(output, gas_used, error);
        }
    }

    fn capture_hook(&mut self, join_point: &str, aspect: Address, gas_used: u64) {
        if !self.check_deadline() {
            self.inner.capture_hook(join_point, aspect, gas_used);
        }
    }

    fn stop(&mut self, reason: &str) {
        self.inner.stop(reason);
    }

    fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn call_tracer_nests_frames() {
        let mut tracer = CallTracer::default();
        tracer.capture_enter(CallFrame {
            gas: 100,
            ..Default::default()
        });
        tracer.capture_enter(CallFrame {
            gas: 50,
            ..Default::default()
        });
        tracer.capture_exit(&Bytes::new(), 10, Some("revert"));
        tracer.capture_exit(&Bytes::new(), 30, None);

        let root = tracer.root.unwrap();
        assert_eq!(root.gas_used, 30);
        assert_eq!(root.calls.len(), 1);
        assert_eq!(root.calls[0].error.as_deref(), Some("revert"));
    }

    #[test]
    fn passed_deadline_stops_inner() {
        let mut tracer = DeadlineTracer::new(
            CallTracer::default(),
            Instant::now() - Duration::from_millis(1),
        );
        tracer.capture_enter(CallFrame::default());
        let inner = tracer.into_inner();
        assert_eq!(inner.stopped.as_deref(), Some(DEADLINE_EXCEEDED));
        assert!(inner.root.is_none());
    }
}
