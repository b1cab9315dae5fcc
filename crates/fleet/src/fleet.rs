//! Fleet orchestration: one worker thread per tank plus the world sweeper.

use protocol::{Command, Event, ProtocolError};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

use crate::ai::{Agent, AgentRegistry, Dispatcher, Inbox};
use crate::config::Config;
use crate::connection::Connection;
use crate::sweeper::Sweeper;
use crate::world::{SharedWorld, World};
use crate::FleetError;

/// A running team of agents.
#[derive(Debug)]
pub struct Fleet {
    running: Arc<AtomicBool>,
    workers: Vec<(String, JoinHandle<Result<(), FleetError>>)>,
    sweeper: Sweeper,
    world: SharedWorld,
}

impl Fleet {
    /// Connect every agent, spawn its tank and start its worker.
    pub fn launch(config: &Config) -> Result<Self, FleetError> {
        config.validate()?;

        let world = SharedWorld::new(World::new(&config.world));
        let sweeper = Sweeper::spawn(world.clone(), config.world.sweep_interval())?;
        let (registry, inboxes) = AgentRegistry::new(config.team.size);
        let dispatcher = Dispatcher::new(&config.team.name, &config.policy, world.clone(), registry);

        let mut fleet = Self {
            running: Arc::new(AtomicBool::new(true)),
            workers: Vec::with_capacity(config.team.size),
            sweeper,
            world,
        };

        for (index, inbox) in inboxes.into_iter().enumerate() {
            if let Err(e) = fleet.start_agent(config, index, inbox, dispatcher.clone()) {
                fleet.stop();
                return Err(e);
            }
        }

        info!(
            "Fleet {:?} running {} tanks against {}:{}",
            config.team.name, config.team.size, config.server.host, config.server.port
        );
        Ok(fleet)
    }

    fn start_agent(
        &mut self,
        config: &Config,
        index: usize,
        inbox: Inbox,
        dispatcher: Dispatcher,
    ) -> Result<(), FleetError> {
        let name = format!("{}:{}", config.team.name, index);
        let mut connection = Connection::connect(&config.server.host, config.server.port)?;
        connection.send(&Command::CreateTank { name: name.clone() })?;
        info!("Requested tank {}", name);

        let worker = Worker {
            agent: Agent::new(index, name.clone(), config.policy),
            connection,
            inbox,
            dispatcher,
            world: self.world.clone(),
            running: self.running.clone(),
        };

        let thread_name = format!("agent-{index}");
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|source| FleetError::ThreadSpawn {
                name: thread_name,
                source,
            })?;
        self.workers.push((name, handle));
        Ok(())
    }

    /// Ask every worker to exit after its current message.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// A handle that can stop the fleet from another thread, such as a
    /// signal handler, while [`Fleet::wait`] blocks.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Wait for every worker to finish. Returns the first worker error.
    pub fn wait(mut self) -> Result<(), FleetError> {
        let mut first_error = None;
        for (name, handle) in self.workers.drain(..) {
            let outcome = match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(FleetError::WorkerPanicked(name.clone())),
            };
            if let Err(e) = outcome {
                error!("Agent {} stopped: {}", name, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        self.sweeper.stop();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Stops a running fleet.
///
/// Workers block on their connection, so each one exits once its next
/// message arrives.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request a stop. Returns false if one was already requested.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

/// Receive, decide and act for one agent.
#[derive(Debug)]
pub struct Worker<S = TcpStream> {
    agent: Agent,
    connection: Connection<S>,
    inbox: Inbox,
    dispatcher: Dispatcher,
    world: SharedWorld,
    running: Arc<AtomicBool>,
}

impl<S: Read + Write> Worker<S> {
    pub fn new(
        agent: Agent,
        connection: Connection<S>,
        inbox: Inbox,
        dispatcher: Dispatcher,
        world: SharedWorld,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            agent,
            connection,
            inbox,
            dispatcher,
            world,
            running,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Process messages until stopped or the connection fails.
    pub fn run(mut self) -> Result<(), FleetError> {
        info!("Agent {} started", self.agent.name());
        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.step() {
                error!("Agent {} failed: {}", self.agent.name(), e);
                return Err(e);
            }
        }
        info!("Agent {} stopped", self.agent.name());
        Ok(())
    }

    /// Handle exactly one inbound message and run one tick.
    pub fn step(&mut self) -> Result<(), FleetError> {
        let message = self.connection.receive()?;
        match Event::parse(&message) {
            Ok(event) => self.dispatcher.dispatch(self.agent.index(), &event, Instant::now()),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => warn!("Agent {} skipped a message: {}", self.agent.name(), e),
        }

        for directive in self.inbox.try_iter() {
            self.agent.apply(directive);
        }

        let commands = {
            let world = self.world.lock();
            self.agent.tick(&world, Instant::now(), wall_clock())
        };
        for command in &commands {
            match self.connection.send(command) {
                Ok(()) => {}
                Err(e @ ProtocolError::PayloadTooLarge { .. }) => {
                    warn!("Agent {} dropped {:?}: {}", self.agent.name(), command, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        debug!("Agent {} sent {} commands", self.agent.name(), commands.len());
        Ok(())
    }
}

/// Seconds since the Unix epoch.
fn wall_clock() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
