//! Async driver for an [`ExamSession`].
//!
//! One task owns the session. Timer ticks and user commands arrive through a
//! single `select!`, so they are applied one at a time and never observe a
//! half-applied transition.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::integrity::{Interception, SurfaceAction};
use crate::model::Response;
use crate::session::{ExamSession, SessionEffect, SessionEvent};

/// User input forwarded to the session. Timestamps are taken by the driver.
#[derive(Debug)]
pub enum Command {
    Start,
    Select(Response),
    Toggle(String),
    Confirm,
    Advance,
    VisibilityChanged { hidden: bool },
    Intercept {
        action: SurfaceAction,
        reply: oneshot::Sender<Interception>,
    },
    Abandon,
}

/// Handle to a running session task.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    effects: mpsc::UnboundedReceiver<SessionEffect>,
    task: JoinHandle<ExamSession>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("exam session has ended"))
    }

    /// Ask whether a clipboard or context-menu action should be suppressed.
    pub async fn intercept(&self, action: SurfaceAction) -> Result<Interception> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Intercept { action, reply }).await?;
        answer.await.context("exam session dropped the interception reply")
    }

    /// Next effect produced by the session, or `None` once it has ended and
    /// every effect was drained.
    pub async fn next_effect(&mut self) -> Option<SessionEffect> {
        self.effects.recv().await
    }

    /// Effects already produced, without waiting.
    pub fn drain_effects(&mut self) -> Vec<SessionEffect> {
        let mut out = Vec::new();
        while let Ok(effect) = self.effects.try_recv() {
            out.push(effect);
        }
        out
    }

    /// Wait for the session to end and take it back.
    pub async fn join(self) -> Result<ExamSession> {
        drop(self.commands);
        self.task.await.context("exam session task failed")
    }
}

/// Run `session` on a new task, sampling timers every `tick`.
///
/// A deadline is observed at most one `tick` late. `tick` must be non-zero.
pub fn spawn(
    session: ExamSession,
    clock: Arc<dyn Clock>,
    tick: Duration,
) -> Result<SessionHandle> {
    if tick.is_zero() {
        anyhow::bail!("session tick interval must be greater than zero");
    }
    let (command_tx, command_rx) = mpsc::channel(32);
    let (effect_tx, effect_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, clock, tick, command_rx, effect_tx));
    Ok(SessionHandle {
        commands: command_tx,
        effects: effect_rx,
        task,
    })
}

async fn run(
    mut session: ExamSession,
    clock: Arc<dyn Clock>,
    tick: Duration,
    mut commands: mpsc::Receiver<Command>,
    effects: mpsc::UnboundedSender<SessionEffect>,
) -> ExamSession {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let emit = |produced: Vec<SessionEffect>| {
        for effect in produced {
            // The handle may be gone; the session still runs to completion.
            let _ = effects.send(effect);
        }
    };

    while !session.is_finished() {
        tokio::select! {
            _ = interval.tick() => {
                emit(session.dispatch(SessionEvent::Tick { now: clock.now() }));
            }
            command = commands.recv() => {
                let now = clock.now();
                let event = match command {
                    None => {
                        tracing::debug!("command channel closed, abandoning session");
                        SessionEvent::Abandon
                    }
                    Some(Command::Intercept { action, reply }) => {
                        let _ = reply.send(session.intercept(action));
                        continue;
                    }
                    Some(Command::Start) => SessionEvent::Start { now },
                    Some(Command::Select(response)) => SessionEvent::Select { response, now },
                    Some(Command::Toggle(option)) => SessionEvent::Toggle { option, now },
                    Some(Command::Confirm) => SessionEvent::Confirm { now },
                    Some(Command::Advance) => SessionEvent::Advance { now },
                    Some(Command::VisibilityChanged { hidden }) => {
                        SessionEvent::VisibilityChanged { hidden }
                    }
                    Some(Command::Abandon) => SessionEvent::Abandon,
                };
                emit(session.dispatch(event));
            }
        }
    }
    session
}
