//! Step observer trait for monitoring relaxation progress.

/// Trait for observing solver steps.
///
/// Implement this to watch convergence (debugging, live visualization,
/// profiling). All methods have default no-op implementations.
pub trait StepObserver {
    /// Called once the force buffer for the step is fully assembled.
    fn on_forces_assembled(&mut self) {}

    /// Called after positions have been integrated.
    fn on_integrate(&mut self) {}

    /// Called when a step is fully complete.
    fn on_step_complete(&mut self) {}
}

/// A no-op observer that does nothing. Use as default when no observation needed.
pub struct NoOpStepObserver;

impl StepObserver for NoOpStepObserver {}
