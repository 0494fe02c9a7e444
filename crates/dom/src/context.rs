//! One isolated scripting/document pairing.
//!
//! A `ScriptContext` owns the dispatcher, the timer queue and both ends of
//! the inbound command channel. Script engines push command batches through
//! [`ScriptContext::command_sender`]; the owning thread applies them with
//! [`ScriptContext::update`], in arrival order, one command at a time.
//! Observers subscribe to the tree-changed broadcast.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use js::{
    BridgeCommand, ConsoleLogger, DOMMirror, DOMSubscriber, DOMUpdate, HostBindings, HostLogger,
    JSValue, JsEngine, TimerScheduler,
};
use tokio::sync::broadcast;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::bindings::{build_bindings, HostContext, SharedTimers};
use crate::config::BridgeConfig;
use crate::dispatcher::MutationDispatcher;
use crate::error::DomError;
use crate::factory::ElementFactory;
use crate::render::{NoopRenderBridge, RenderBridge};

pub struct ScriptContext {
    config: BridgeConfig,
    dispatcher: Arc<Mutex<MutationDispatcher>>,
    timers: SharedTimers,
    commands_tx: mpsc::Sender<Vec<BridgeCommand>>,
    commands_rx: mpsc::Receiver<Vec<BridgeCommand>>,
    logger: Arc<dyn HostLogger>,
    torn_down: bool,
}

impl ScriptContext {
    /// Create a context with its own tree, registry, dispatcher and timers.
    pub fn new(config: BridgeConfig, factory: Arc<ElementFactory>, render: Box<dyn RenderBridge>) -> Self {
        let (updates, _) = broadcast::channel(config.update_channel_capacity);
        let (commands_tx, commands_rx) = mpsc::channel(config.command_queue_capacity);
        let dispatcher = MutationDispatcher::new(factory, render, updates);
        Self {
            config,
            dispatcher: Arc::new(Mutex::new(dispatcher)),
            timers: Arc::new(Mutex::new(TimerScheduler::new())),
            commands_tx,
            commands_rx,
            logger: Arc::new(ConsoleLogger::default()),
            torn_down: false,
        }
    }

    /// A headless context using the process-wide factory.
    pub fn headless(config: BridgeConfig) -> Self {
        Self::new(config, ElementFactory::global(), Box::new(NoopRenderBridge))
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Sender for command batches; clone freely.
    pub fn command_sender(&self) -> mpsc::Sender<Vec<BridgeCommand>> {
        self.commands_tx.clone()
    }

    /// Receiver for tree-changed batches published from now on.
    ///
    /// # Errors
    /// `Internal` if the dispatcher lock is poisoned.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<Vec<DOMUpdate>>, DomError> {
        Ok(self.dispatcher()?.subscribe())
    }

    /// Wrap `subscriber` in a mirror wired to this context's channels.
    ///
    /// # Errors
    /// `Internal` if the dispatcher lock is poisoned.
    pub fn mirror<T: DOMSubscriber>(&self, subscriber: T) -> Result<DOMMirror<T>, DomError> {
        Ok(DOMMirror::new(self.command_sender(), self.subscribe()?, subscriber))
    }

    /// Lock the dispatcher for direct calls and queries.
    ///
    /// # Errors
    /// `Internal` if a previous holder panicked.
    pub fn dispatcher(&self) -> Result<MutexGuard<'_, MutationDispatcher>, DomError> {
        self.dispatcher
            .lock()
            .map_err(|_| DomError::Internal(String::from("dispatcher mutex poisoned")))
    }

    /// Apply every queued command batch in arrival order. Returns one result
    /// per command.
    pub fn update(&mut self) -> Vec<Result<JSValue, DomError>> {
        let mut results = Vec::new();
        loop {
            match self.commands_rx.try_recv() {
                Ok(batch) => {
                    let Ok(mut dispatcher) = self.dispatcher.lock() else {
                        results.extend(batch.iter().map(|_| {
                            Err(DomError::Internal(String::from("dispatcher mutex poisoned")))
                        }));
                        continue;
                    };
                    for command in batch {
                        results.push(dispatcher.apply(command));
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        results
    }

    /// Decode and apply a single JSON command immediately.
    ///
    /// # Errors
    /// `Argument` for a malformed payload, otherwise whatever the command reports.
    pub fn apply_json(&self, payload: &str) -> Result<JSValue, DomError> {
        let command = BridgeCommand::from_json(payload)
            .map_err(|error| DomError::Argument(format!("malformed command: {error}")))?;
        self.dispatcher()?.apply(command)
    }

    /// State handed to host functions.
    pub fn host_context(&self) -> HostContext {
        HostContext::new(Arc::clone(&self.logger), Arc::clone(&self.dispatcher), Arc::clone(&self.timers))
    }

    /// Host function tables for an engine adapter to install.
    pub fn bindings(&self) -> HostBindings<HostContext> {
        build_bindings()
    }

    /// Fire the timers due at `now`, at most `timer_budget_per_tick` of them,
    /// then drain the engine's job queue. Callbacks run without any context
    /// lock held. Returns how many callbacks ran.
    pub fn tick_timers<E: JsEngine>(&self, now: Instant, engine: &mut E) -> usize {
        let due = match self.timers.lock() {
            Ok(mut timers) => timers.take_due(now, self.config.timer_budget_per_tick),
            Err(_) => {
                log::warn!("timer queue poisoned; skipping tick");
                return 0;
            }
        };
        let fired = due.len();
        for timer in due {
            if let Err(error) = engine.call_function(timer.callback) {
                log::warn!("timer {} callback failed: {error:#}", timer.id.0);
            }
        }
        if fired > 0 {
            if let Err(error) = engine.run_jobs() {
                log::warn!("job queue failed after timers: {error:#}");
            }
        }
        fired
    }

    /// The earliest pending timer deadline.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.timers.lock().ok()?.next_deadline()
    }

    /// Dispose every node the script side never disposed and drop all
    /// timers. Returns the number of nodes swept; idempotent.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        self.torn_down = true;
        if let Ok(mut timers) = self.timers.lock() {
            timers.clear_all();
        }
        let swept = match self.dispatcher.lock() {
            Ok(mut dispatcher) => dispatcher.sweep(),
            Err(_) => {
                log::warn!("dispatcher poisoned; teardown sweep skipped");
                0
            }
        };
        if swept > 0 && self.config.report_leaks {
            log::warn!("context teardown released {swept} nodes that were never disposed");
        }
        swept
    }
}

impl Drop for ScriptContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
