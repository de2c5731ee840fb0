//! Scripted cluster directory and remote shell for engine tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use aam_core::{
    CommandOutput, ConnectionError, Directory, DirectoryError, ExecutionError, Node, NodeRole,
    Profile, RemoteSession, RemoteShell,
};
use aam_protocol::{ENABLED_CHECK_COMMAND, STATUS_QUERY_COMMAND};

/// Something the shell saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(String),
    Exec { host: String, command: String },
    Close(String),
}

/// How one host answers
#[derive(Debug, Clone, Default)]
pub struct HostScript {
    /// Fail `connect` for this host
    pub refuse: bool,
    /// `aa-enabled` stdout
    pub enabled_stdout: String,
    /// `aa-enabled` stderr
    pub enabled_stderr: String,
    /// `apparmor_status --json` stdout
    pub status_stdout: String,
    /// `apparmor_status --json` stderr
    pub status_stderr: String,
    /// Transport failure on the first command containing this text
    pub fail_on: Option<String>,
}

impl HostScript {
    /// Host with AppArmor active
    pub fn enabled() -> Self {
        Self {
            enabled_stdout: "Yes\n".to_string(),
            ..Self::default()
        }
    }

    /// Host where `aa-enabled` answers no
    pub fn disabled() -> Self {
        Self {
            enabled_stdout: "No - disabled at boot.\n".to_string(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, stdout: &str) -> Self {
        self.status_stdout = stdout.to_string();
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }
}

/// Remote shell answering from per-host scripts and recording every call
#[derive(Clone, Default)]
pub struct ScriptedShell {
    hosts: HashMap<String, HostScript>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, address: &str, script: HostScript) -> Self {
        self.hosts.insert(address.to_string(), script);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Commands run on a host, in order
    pub fn commands(&self, host: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Exec { host: h, command } if h == host => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Commands other than the enabled probe
    pub fn mutating_commands(&self, host: &str) -> Vec<String> {
        self.commands(host)
            .into_iter()
            .filter(|c| !c.ends_with(ENABLED_CHECK_COMMAND))
            .collect()
    }

    pub fn count(&self, wanted: fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| wanted(e)).count()
    }
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    type Session = ScriptedSession;

    async fn connect(&self, host: &str, _port: u16) -> Result<ScriptedSession, ConnectionError> {
        let script = match self.hosts.get(host) {
            Some(script) if !script.refuse => script.clone(),
            _ => {
                return Err(ConnectionError::Refused {
                    host: host.to_string(),
                    reason: "connection refused".to_string(),
                })
            }
        };

        self.events
            .lock()
            .unwrap()
            .push(Event::Connect(host.to_string()));

        Ok(ScriptedSession {
            host: host.to_string(),
            script,
            events: Arc::clone(&self.events),
            closed: false,
        })
    }
}

pub struct ScriptedSession {
    host: String,
    script: HostScript,
    events: Arc<Mutex<Vec<Event>>>,
    closed: bool,
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn execute_one(
        &mut self,
        command: &str,
        elevate: bool,
    ) -> Result<CommandOutput, ExecutionError> {
        let full = if elevate {
            format!("sudo {}", command)
        } else {
            command.to_string()
        };

        if let Some(needle) = &self.script.fail_on {
            if command.contains(needle.as_str()) {
                return Err(ExecutionError::ChannelOpen {
                    host: self.host.clone(),
                    reason: "channel refused".to_string(),
                });
            }
        }

        self.events.lock().unwrap().push(Event::Exec {
            host: self.host.clone(),
            command: full,
        });

        let output = match command {
            ENABLED_CHECK_COMMAND => CommandOutput::new(
                self.script.enabled_stdout.clone(),
                self.script.enabled_stderr.clone(),
                Some(0),
            ),
            STATUS_QUERY_COMMAND => CommandOutput::new(
                self.script.status_stdout.clone(),
                self.script.status_stderr.clone(),
                Some(0),
            ),
            _ => CommandOutput::new("", "", Some(0)),
        };

        Ok(output)
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.events
                .lock()
                .unwrap()
                .push(Event::Close(self.host.clone()));
        }
    }
}

/// Shell that must never be used
pub struct UnreachableShell;

#[async_trait]
impl RemoteShell for UnreachableShell {
    type Session = ScriptedSession;

    async fn connect(&self, host: &str, _port: u16) -> Result<ScriptedSession, ConnectionError> {
        panic!("connect({}) must not be called", host);
    }
}

/// Directory serving fixed nodes and profiles
#[derive(Clone, Default)]
pub struct StaticDirectory {
    pub nodes: Vec<Node>,
    pub profiles: Vec<Profile>,
}

impl StaticDirectory {
    pub fn new(nodes: Vec<Node>, profiles: Vec<Profile>) -> Self {
        Self { nodes, profiles }
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn list_eligible_nodes(&self) -> Result<Vec<Node>, DirectoryError> {
        Ok(self.nodes.clone())
    }

    async fn list_declared_profiles(&self) -> Result<Vec<Profile>, DirectoryError> {
        Ok(self.profiles.clone())
    }

    async fn install_profile_crd(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Worker node reachable at `address`
pub fn worker(name: &str, address: &str) -> Node {
    Node::new(name, NodeRole::Worker).with_addresses(address, format!("{}-internal", address))
}

/// Control-plane node reachable at `address`
pub fn control_plane(name: &str, address: &str) -> Node {
    Node::new(name, NodeRole::ControlPlane).with_addresses(address, "")
}
