use std::sync::Arc;

use super::bus::{EventBus, GLOBAL, Parts};
use super::config::Config;
use super::sink::{ErrorSink, LogSink};
use crate::delivery::{Executor, MainLoop, MainThreadSupport, TokioExecutor};
use crate::error::EventBusError;
use crate::subscribers::SubscriberInfoIndex;

/// Builder for constructing an [`EventBus`] with optional collaborators.
pub struct EventBusBuilder {
    cfg: Config,
    indexes: Vec<Arc<dyn SubscriberInfoIndex>>,
    main: Option<Arc<dyn MainThreadSupport>>,
    executor: Option<Arc<dyn Executor>>,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl EventBusBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            indexes: Vec::new(),
            main: None,
            executor: None,
            sink: None,
        }
    }

    /// Adds a subscriber index; indexes are consulted in the order they were added.
    #[must_use]
    pub fn with_index<I: SubscriberInfoIndex + 'static>(mut self, index: I) -> Self {
        self.indexes.push(Arc::new(index));
        self
    }

    /// Sets the main context used by `Main` and `MainOrdered` subscribers.
    ///
    /// Without one, both modes deliver inline on the posting thread.
    #[must_use]
    pub fn with_main_thread(mut self, main: Arc<dyn MainThreadSupport>) -> Self {
        self.main = Some(main);
        self
    }

    /// Uses a [`MainLoop`] thread as the main context.
    #[must_use]
    pub fn with_main_loop(self, main: Arc<MainLoop>) -> Self {
        self.with_main_thread(main)
    }

    /// Replaces the executor of background and async deliveries.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replaces the default [`LogSink`].
    #[must_use]
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the bus.
    ///
    /// Without an explicit executor, a [`TokioExecutor`] is created here: it
    /// binds to the tokio runtime current at this point, if any.
    pub fn build(self) -> EventBus {
        let executor = self.executor.unwrap_or_else(|| {
            Arc::new(TokioExecutor::new(
                self.cfg.async_thread_limit(),
                self.cfg.async_keep_alive,
            ))
        });
        EventBus::from_parts(Parts {
            indexes: self.indexes,
            main: self.main,
            executor,
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink)),
            cfg: self.cfg,
        })
    }

    /// Builds the bus and installs it as [`EventBus::global`].
    ///
    /// # Errors
    /// [`EventBusError::GlobalAlreadyInstalled`] if a global bus exists already,
    /// including one created implicitly by an earlier `EventBus::global()`.
    pub fn install_global(self) -> Result<&'static EventBus, EventBusError> {
        let mut installed = false;
        let bus = GLOBAL.get_or_init(|| {
            installed = true;
            self.build()
        });
        if installed {
            Ok(bus)
        } else {
            Err(EventBusError::GlobalAlreadyInstalled)
        }
    }
}
